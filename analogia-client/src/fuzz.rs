#![cfg(test)]

use std::collections::HashMap;

use crate::{
    api::{Comment, CommentId},
    build_forest,
    forest::tests::comment,
    CommentNode,
};

// Comment number i has id i + 1 and replies to `parents[i]`, which may well be
// missing, itself, or part of a cycle
fn thread(parents: &[Option<u8>]) -> Vec<Comment> {
    parents
        .iter()
        .enumerate()
        .map(|(i, p)| comment(i as i64 + 1, p.map(i64::from)))
        .collect()
}

fn position_in(comments: &[Comment]) -> HashMap<CommentId, usize> {
    comments.iter().enumerate().map(|(i, c)| (c.id, i)).collect()
}

fn check_siblings(nodes: &[CommentNode], position: &HashMap<CommentId, usize>) {
    let order = nodes
        .iter()
        .map(|n| position[&n.comment.id])
        .collect::<Vec<_>>();
    assert!(
        order.windows(2).all(|w| w[0] < w[1]),
        "siblings out of input order: {order:?}"
    );
}

fn check_node(node: &CommentNode, position: &HashMap<CommentId, usize>) {
    check_siblings(&node.children, position);
    for c in node.children.iter() {
        assert_eq!(c.comment.parent_id, Some(node.comment.id));
        assert_eq!(c.depth, node.depth + 1);
        check_node(c, position);
    }
}

#[test]
fn fuzz_forest_invariants() {
    bolero::check!()
        .with_type::<Vec<Option<u8>>>()
        .cloned()
        .for_each(|parents| {
            let comments = thread(&parents);
            let position = position_in(&comments);
            let forest = build_forest(&comments);

            // every comment exactly once
            let mut seen = forest.iter().map(|n| n.comment.id.0).collect::<Vec<_>>();
            seen.sort_unstable();
            assert_eq!(seen, (1..=comments.len() as i64).collect::<Vec<_>>());
            assert_eq!(forest.len(), comments.len());

            // top-level and orphan comments are roots
            for c in comments.iter() {
                let is_root = forest.roots().iter().any(|r| r.comment.id == c.id);
                match c.parent_id {
                    None => assert!(is_root, "{:?} should be top-level", c.id),
                    Some(p) if !position.contains_key(&p) => {
                        assert!(is_root, "orphan {:?} was not promoted", c.id)
                    }
                    Some(_) => (),
                }
            }

            check_siblings(forest.roots(), &position);
            for r in forest.roots() {
                assert_eq!(r.depth, 1);
                check_node(r, &position);
            }

            assert_eq!(build_forest(&comments), forest);
        })
}

#[test]
fn fuzz_forest_without_cycles() {
    // parents always point to an earlier comment, as happens with real threads
    bolero::check!()
        .with_type::<Vec<Option<u8>>>()
        .cloned()
        .for_each(|parents| {
            let parents = parents
                .into_iter()
                .enumerate()
                .map(|(i, p)| p.filter(|&p| usize::from(p) <= i && p > 0))
                .collect::<Vec<_>>();
            let comments = thread(&parents);
            let forest = build_forest(&comments);
            for n in forest.iter() {
                if n.depth == 1 {
                    assert_eq!(n.comment.parent_id, None);
                }
            }
        })
}
