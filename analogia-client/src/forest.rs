use std::collections::{HashMap, HashSet};

use crate::api::{Comment, CommentId};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommentNode {
    pub comment: Comment,

    /// Top-level comments are at depth 1
    pub depth: usize,

    /// Replies, in the order they were loaded
    pub children: Vec<CommentNode>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Forest {
    roots: Vec<CommentNode>,
    len: usize,
}

/// Arrange a flat list of comments of a single post into reply trees.
///
/// Siblings keep their relative order from `comments`. Comments whose parent is
/// not part of `comments` (or belongs to another post) are shown as top-level
/// comments instead of being hidden, and so are comments caught in a parent
/// cycle, so every comment of `comments` appears exactly once in the forest.
pub fn build_forest(comments: &[Comment]) -> Forest {
    let mut index_of = HashMap::with_capacity(comments.len());
    for (i, c) in comments.iter().enumerate() {
        index_of.entry(c.id).or_insert(i);
    }

    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut root_starts = Vec::new();
    for (i, c) in comments.iter().enumerate() {
        let parent = c
            .parent_id
            .and_then(|p| index_of.get(&p).copied())
            .filter(|&p| p != i && comments[p].post_id == c.post_id);
        match parent {
            Some(p) => children.entry(p).or_default().push(i),
            None => {
                if c.parent_id.is_some() {
                    tracing::debug!(comment=?c.id, parent=?c.parent_id, "showing orphan comment as top-level");
                }
                root_starts.push(i);
            }
        }
    }

    // Anything not reachable from a root at this point is part of a parent cycle
    let mut reached = HashSet::with_capacity(comments.len());
    for &r in root_starts.iter() {
        mark_reachable(r, &children, &mut reached);
    }
    if reached.len() < comments.len() {
        for i in 0..comments.len() {
            if !reached.contains(&i) {
                tracing::warn!(comment=?comments[i].id, "comment is part of a reply cycle");
                mark_reachable(i, &children, &mut reached);
                root_starts.push(i);
            }
        }
        root_starts.sort_unstable();
    }

    let mut built = HashSet::with_capacity(comments.len());
    let roots = root_starts
        .into_iter()
        .map(|r| build_node(comments, r, 1, &children, &mut built))
        .collect();
    Forest {
        roots,
        len: comments.len(),
    }
}

fn mark_reachable(from: usize, children: &HashMap<usize, Vec<usize>>, reached: &mut HashSet<usize>) {
    let mut stack = vec![from];
    while let Some(i) = stack.pop() {
        if reached.insert(i) {
            if let Some(c) = children.get(&i) {
                stack.extend(c.iter().copied());
            }
        }
    }
}

fn build_node(
    comments: &[Comment],
    i: usize,
    depth: usize,
    children: &HashMap<usize, Vec<usize>>,
    built: &mut HashSet<usize>,
) -> CommentNode {
    built.insert(i);
    let mut node = CommentNode {
        comment: comments[i].clone(),
        depth,
        children: Vec::new(),
    };
    for &c in children.get(&i).map(|c| &c[..]).unwrap_or(&[]) {
        if !built.contains(&c) {
            node.children
                .push(build_node(comments, c, depth + 1, children, built));
        }
    }
    node
}

impl Forest {
    pub fn roots(&self) -> &[CommentNode] {
        &self.roots
    }

    /// Number of comments in the whole forest
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn find(&self, id: CommentId) -> Option<&CommentNode> {
        self.iter().find(|n| n.comment.id == id)
    }

    pub fn depth_of(&self, id: CommentId) -> Option<usize> {
        self.find(id).map(|n| n.depth)
    }

    /// Depth-first, parents before their replies: the order comments are
    /// displayed in
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: self.roots.iter().rev().collect(),
        }
    }
}

pub struct Iter<'a> {
    stack: Vec<&'a CommentNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a CommentNode;

    fn next(&mut self) -> Option<&'a CommentNode> {
        let n = self.stack.pop()?;
        self.stack.extend(n.children.iter().rev());
        Some(n)
    }
}

impl<'a> IntoIterator for &'a Forest {
    type Item = &'a CommentNode;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}
