use std::{collections::HashSet, rc::Rc};

use parking_lot::Mutex;

use crate::{
    api::{
        self, Comment, CommentId, CommentStore, CommentUpdate, ContentError, Identity, NewComment,
        PageRequest, PostId, MAX_COMMENT_LEN,
    },
    build_forest, Config, Forest, IdentitySession,
};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ControllerError {
    #[error("{0}")]
    InvalidContent(#[from] ContentError),

    #[error("Please log in with an allow-listed email before commenting")]
    LoginRequired,

    #[error("Only the author of a comment can modify it")]
    NotOwner(CommentId),

    #[error("This comment is not loaded anymore")]
    UnknownComment(CommentId),

    #[error("Replies cannot be nested more than {max} levels deep")]
    TooDeep { max: usize },

    #[error("No reply box is open")]
    NoReplyTarget,

    /// Already phrased for display, the underlying error only gets logged
    #[error("{0}")]
    Store(String),
}

/// Everything needed to render a comment section
#[derive(Clone, Debug, PartialEq)]
pub struct CommentsView {
    pub forest: Forest,
    pub loading: bool,
    pub has_more: bool,
    pub error: Option<String>,
    pub compose: String,
    pub reply_target: Option<CommentId>,
    pub reply_text: String,
    pub identity: Option<Identity>,
    pub max_reply_depth: usize,
}

#[derive(Debug)]
struct State {
    // newest first, as served by the store
    comments: Vec<Comment>,
    loading: bool,
    has_more: bool,
    next_page: u32,
    // loaded comments deleted since the last fetch, each one shifts the store's
    // page boundaries back by one
    removed_since_fetch: u32,
    // so that pages answered before a delete went through do not bring it back
    deleted: HashSet<CommentId>,
    // bumped by reload() so that pages requested before it get dropped
    generation: u64,
    compose: String,
    reply_target: Option<CommentId>,
    reply_text: String,
    error: Option<String>,
    detached: bool,
}

#[derive(Clone, Copy, Debug)]
enum Op {
    Load,
    Post,
    Edit,
    Delete,
}

/// Owns the comment list of a single post and mediates between user actions and
/// the comment store.
///
/// All operations take `&self` and may be in flight concurrently: the state lock
/// is never held across an `.await`, and every update is applied by comment id.
pub struct CommentController<S: ?Sized> {
    post_id: PostId,
    config: Config,
    store: Rc<S>,
    identity: IdentitySession,
    state: Mutex<State>,
}

impl<S: ?Sized + CommentStore> CommentController<S> {
    pub fn new(
        post_id: PostId,
        store: Rc<S>,
        identity: IdentitySession,
        config: Config,
    ) -> CommentController<S> {
        CommentController {
            post_id,
            config: config.sanitized(),
            store,
            identity,
            state: Mutex::new(State {
                comments: Vec::new(),
                loading: false,
                has_more: true,
                next_page: 0,
                removed_since_fetch: 0,
                deleted: HashSet::new(),
                generation: 0,
                compose: String::new(),
                reply_target: None,
                reply_text: String::new(),
                error: None,
                detached: false,
            }),
        }
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn view(&self) -> CommentsView {
        let s = self.state.lock();
        CommentsView {
            forest: build_forest(&s.comments),
            loading: s.loading,
            has_more: s.has_more,
            error: s.error.clone(),
            compose: s.compose.clone(),
            reply_target: s.reply_target,
            reply_text: s.reply_text.clone(),
            identity: self.identity.read(),
            max_reply_depth: self.config.max_reply_depth,
        }
    }

    pub fn forest(&self) -> Forest {
        build_forest(&self.state.lock().comments)
    }

    /// The flat list of loaded comments, newest first
    pub fn comments(&self) -> Vec<Comment> {
        self.state.lock().comments.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn has_more(&self) -> bool {
        self.state.lock().has_more
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn clear_error(&self) {
        self.state.lock().error = None;
    }

    /// Mark the view as torn down: responses arriving later are dropped
    pub fn detach(&self) {
        self.state.lock().detached = true;
    }

    pub fn set_compose_text(&self, text: &str) {
        self.state.lock().compose = truncated(text);
    }

    pub fn set_reply_text(&self, text: &str) {
        self.state.lock().reply_text = truncated(text);
    }

    pub fn can_reply(&self, id: CommentId) -> bool {
        self.check_replyable(&self.state.lock(), id).is_ok()
    }

    pub fn can_delete(&self, id: CommentId) -> bool {
        let identity = match self.identity.read() {
            Some(i) => i,
            None => return false,
        };
        self.state
            .lock()
            .comments
            .iter()
            .any(|c| c.id == id && c.is_owned_by(&identity.email))
    }

    /// Open the reply box under `target`, or close it with `None`.
    ///
    /// Only one reply box is open at a time. Targeting the comment whose reply
    /// box is already open closes it.
    pub fn set_reply_target(&self, target: Option<CommentId>) -> Result<(), ControllerError> {
        let mut s = self.state.lock();
        let target = match target {
            Some(t) if s.reply_target != Some(t) => t,
            _ => {
                s.reply_target = None;
                s.reply_text.clear();
                return Ok(());
            }
        };
        if let Err(e) = self.check_replyable(&s, target) {
            s.error = Some(e.to_string());
            return Err(e);
        }
        s.reply_target = Some(target);
        s.reply_text.clear();
        Ok(())
    }

    /// Post the content of the compose box as a top-level comment
    pub async fn submit_compose(&self) -> Result<Comment, ControllerError> {
        let content = self.state.lock().compose.clone();
        self.submit_comment(&content, None).await
    }

    /// Post the content of the open reply box
    pub async fn submit_reply(&self) -> Result<Comment, ControllerError> {
        let (content, target) = {
            let s = self.state.lock();
            (s.reply_text.clone(), s.reply_target)
        };
        match target {
            Some(t) => self.submit_comment(&content, Some(t)).await,
            None => Err(self.fail(ControllerError::NoReplyTarget)),
        }
    }

    pub async fn submit_comment(
        &self,
        content: &str,
        parent_id: Option<CommentId>,
    ) -> Result<Comment, ControllerError> {
        let new = self
            .prepare_submission(content, parent_id)
            .map_err(|e| self.fail(e))?;
        tracing::debug!(post = %self.post_id, parent = ?parent_id, "submitting comment");

        let res = self.store.create_comment(new).await;

        let mut s = self.state.lock();
        let created = match res {
            Ok(c) => c,
            Err(e) => return Err(self.store_failure(&mut s, Op::Post, e)),
        };
        if s.detached {
            return Ok(created);
        }
        if !s.comments.iter().any(|c| c.id == created.id) {
            s.comments.insert(0, created.clone());
        }
        match parent_id {
            None => s.compose.clear(),
            Some(_) => {
                s.reply_target = None;
                s.reply_text.clear();
            }
        }
        s.error = None;
        Ok(created)
    }

    pub async fn update_comment(
        &self,
        id: CommentId,
        content: &str,
    ) -> Result<Comment, ControllerError> {
        api::validate_content(content).map_err(|e| self.fail(e.into()))?;
        self.check_owner(id).map_err(|e| self.fail(e))?;

        let update = CommentUpdate {
            content: String::from(content.trim()),
        };
        let res = self.store.update_comment(id, update).await;

        let mut s = self.state.lock();
        let updated = match res {
            Ok(c) => c,
            Err(e) => return Err(self.store_failure(&mut s, Op::Edit, e)),
        };
        if !s.detached {
            if let Some(c) = s.comments.iter_mut().find(|c| c.id == id) {
                c.content = updated.content.clone();
            }
            s.error = None;
        }
        Ok(updated)
    }

    /// Fetch the next page of comments.
    ///
    /// Does nothing if a page is already being fetched or if everything is loaded.
    pub async fn load_more(&self) -> Result<(), ControllerError> {
        let (req, removed, generation) = {
            let mut s = self.state.lock();
            if s.detached || s.loading || !s.has_more {
                return Ok(());
            }
            s.loading = true;
            // start from the page holding the first comment not loaded yet, the
            // overlap with what is already there gets deduplicated below
            let size = self.config.page_size;
            let removed = s.removed_since_fetch;
            let page = (s.next_page * size).saturating_sub(removed) / size;
            let req = PageRequest::newest_first(self.post_id, page, size);
            (req, removed, s.generation)
        };
        let page_index = req.page;
        tracing::debug!(post = %self.post_id, page = req.page, "fetching comments");

        let res = self.store.fetch_page(req).await;

        let mut s = self.state.lock();
        if s.detached || s.generation != generation {
            tracing::debug!(post = %self.post_id, "dropping stale comment page");
            return Ok(());
        }
        s.loading = false;
        let page = match res {
            Ok(page) => page,
            Err(e) => return Err(self.store_failure(&mut s, Op::Load, e)),
        };
        for c in page.comments {
            if c.post_id != self.post_id {
                tracing::warn!(comment = %c.id, post = %c.post_id, "store returned a comment of another post");
                continue;
            }
            if s.deleted.contains(&c.id) {
                continue;
            }
            if !s.comments.iter().any(|known| known.id == c.id) {
                s.comments.push(c);
            }
        }
        s.has_more = page.has_more;
        s.next_page = page_index + 1;
        s.removed_since_fetch = s.removed_since_fetch.saturating_sub(removed);
        s.error = None;
        Ok(())
    }

    /// Forget everything loaded so far and fetch the first page again
    pub async fn reload(&self) -> Result<(), ControllerError> {
        {
            let mut s = self.state.lock();
            s.generation += 1;
            s.comments.clear();
            s.loading = false;
            s.has_more = true;
            s.next_page = 0;
            s.removed_since_fetch = 0;
            if s.reply_target.is_some() {
                s.reply_target = None;
                s.reply_text.clear();
            }
        }
        self.load_more().await
    }

    /// Delete a comment of the logged-in user.
    ///
    /// Replies to the deleted comment are left alone: if the store keeps them,
    /// they get displayed as top-level comments.
    pub async fn delete_comment(&self, id: CommentId) -> Result<(), ControllerError> {
        self.check_owner(id).map_err(|e| self.fail(e))?;
        tracing::debug!(comment = %id, "deleting comment");

        let res = self.store.delete_comment(id).await;

        let mut s = self.state.lock();
        match res {
            Ok(()) => (),
            Err(api::Error::CommentNotFound(_)) => {
                tracing::warn!(comment = %id, "comment was already deleted");
            }
            Err(e) => return Err(self.store_failure(&mut s, Op::Delete, e)),
        }
        if !s.detached {
            s.deleted.insert(id);
            let before = s.comments.len();
            s.comments.retain(|c| c.id != id);
            if s.comments.len() < before {
                s.removed_since_fetch += 1;
            }
            if s.reply_target == Some(id) {
                s.reply_target = None;
                s.reply_text.clear();
            }
            s.error = None;
        }
        Ok(())
    }

    fn prepare_submission(
        &self,
        content: &str,
        parent_id: Option<CommentId>,
    ) -> Result<NewComment, ControllerError> {
        api::validate_content(content)?;
        let identity = self.identity.read().ok_or(ControllerError::LoginRequired)?;
        if let Some(parent) = parent_id {
            self.check_replyable(&self.state.lock(), parent)?;
        }
        Ok(NewComment {
            content: String::from(content.trim()),
            author_name: identity.username,
            author_email: identity.email,
            post_id: self.post_id,
            parent_id,
        })
    }

    fn check_replyable(&self, s: &State, id: CommentId) -> Result<(), ControllerError> {
        let parent = s
            .comments
            .iter()
            .find(|c| c.id == id)
            .ok_or(ControllerError::UnknownComment(id))?;
        if parent.post_id != self.post_id {
            return Err(ControllerError::UnknownComment(id));
        }
        let depth = build_forest(&s.comments)
            .depth_of(id)
            .ok_or(ControllerError::UnknownComment(id))?;
        if depth >= self.config.max_reply_depth {
            return Err(ControllerError::TooDeep {
                max: self.config.max_reply_depth,
            });
        }
        Ok(())
    }

    fn check_owner(&self, id: CommentId) -> Result<(), ControllerError> {
        let identity = self.identity.read().ok_or(ControllerError::LoginRequired)?;
        let s = self.state.lock();
        let c = s
            .comments
            .iter()
            .find(|c| c.id == id)
            .ok_or(ControllerError::UnknownComment(id))?;
        if !c.is_owned_by(&identity.email) {
            tracing::warn!(comment = %id, "refusing to modify a comment of someone else");
            return Err(ControllerError::NotOwner(id));
        }
        Ok(())
    }

    /// Record a local failure for display. Must not be called with the state locked.
    fn fail(&self, e: ControllerError) -> ControllerError {
        self.state.lock().error = Some(e.to_string());
        e
    }

    fn store_failure(&self, s: &mut State, op: Op, e: api::Error) -> ControllerError {
        tracing::error!(post = %self.post_id, ?op, "comment store request failed: {e}");
        let e = ControllerError::Store(user_message(op, &e));
        if !s.detached {
            s.error = Some(e.to_string());
        }
        e
    }
}

fn truncated(text: &str) -> String {
    text.chars().take(MAX_COMMENT_LEN).collect()
}

fn user_message(op: Op, e: &api::Error) -> String {
    let what = match op {
        Op::Load => "load comments",
        Op::Post => "post your comment",
        Op::Edit => "edit your comment",
        Op::Delete => "delete your comment",
    };
    match e {
        api::Error::PermissionDenied => format!("You are not allowed to {what}."),
        api::Error::EmailNotAllowed(_) => {
            String::from("Your email is not allowed to post comments.")
        }
        api::Error::CommentNotFound(_) => String::from("This comment does not exist anymore."),
        api::Error::InvalidContent(_) => format!("Could not {what}: the server rejected it."),
        api::Error::NameAlreadyUsed(_) | api::Error::InvalidName(_) => {
            format!("Could not {what}: your profile is invalid, please log in again.")
        }
        api::Error::Network(_) | api::Error::Unknown(_) => {
            format!("Could not {what}. Please try again later.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::Error, forest::tests::comment};
    use analogia_mock_server::MockServer;

    const POST: PostId = PostId(1);
    const ADA: &str = "ada@example.org";
    const BOB: &str = "bob@example.org";

    fn init_tracing() {
        if std::env::var("RUST_LOG").is_ok() {
            let _ = tracing_subscriber::fmt::try_init();
        }
    }

    fn setup() -> (Rc<MockServer>, IdentitySession, CommentController<MockServer>) {
        init_tracing();
        let server = Rc::new(MockServer::new());
        server.admin_allow_email(ADA, Some("ada"));
        server.admin_allow_email(BOB, Some("bob"));
        let identity = IdentitySession::in_memory();
        identity.set(String::from("ada"), String::from(ADA));
        let controller = CommentController::new(
            POST,
            server.clone(),
            identity.clone(),
            Config {
                page_size: 2,
                max_reply_depth: 3,
            },
        );
        (server, identity, controller)
    }

    fn ids(comments: &[Comment]) -> Vec<i64> {
        comments.iter().map(|c| c.id.0).collect()
    }

    #[tokio::test]
    async fn invalid_content_never_reaches_store() {
        let (server, _, c) = setup();
        for content in [String::new(), String::from("   "), "x".repeat(251)] {
            let res = c.submit_comment(&content, None).await;
            assert!(matches!(res, Err(ControllerError::InvalidContent(_))));
            assert!(c.error().is_some());
        }
        assert_eq!(server.test_calls().create_comment, 0);
    }

    #[tokio::test]
    async fn submit_requires_login() {
        let (server, identity, c) = setup();
        identity.clear();
        let res = c.submit_comment("hello", None).await;
        assert_eq!(res, Err(ControllerError::LoginRequired));
        assert_eq!(server.test_calls().create_comment, 0);
    }

    #[tokio::test]
    async fn submitted_comment_shows_up_first() {
        let (server, _, c) = setup();
        server.admin_insert_comment(POST, None, BOB, "older");
        c.load_more().await.unwrap();
        c.set_compose_text("  brand new  ");
        let created = c.submit_compose().await.unwrap();
        assert_eq!(created.content, "brand new");
        assert_eq!(created.author_name, "ada");
        assert_eq!(ids(&c.comments()), vec![2, 1]);
        assert_eq!(c.view().compose, "");
        assert_eq!(c.error(), None);
    }

    #[tokio::test]
    async fn compose_text_is_bounded() {
        let (_, _, c) = setup();
        c.set_compose_text(&"y".repeat(400));
        assert_eq!(c.view().compose.chars().count(), MAX_COMMENT_LEN);
        c.set_reply_text(&"é".repeat(300));
        assert_eq!(c.view().reply_text.chars().count(), MAX_COMMENT_LEN);
    }

    #[tokio::test]
    async fn pages_are_appended_in_order() {
        let (server, _, c) = setup();
        for i in 0..5 {
            server.admin_insert_comment(POST, None, BOB, &format!("c{i}"));
        }
        server.admin_insert_comment(PostId(2), None, BOB, "elsewhere");

        c.load_more().await.unwrap();
        assert_eq!(ids(&c.comments()), vec![5, 4]);
        assert!(c.has_more());
        c.load_more().await.unwrap();
        c.load_more().await.unwrap();
        assert_eq!(ids(&c.comments()), vec![5, 4, 3, 2, 1]);
        assert!(!c.has_more());

        // nothing left: no request at all
        c.load_more().await.unwrap();
        assert_eq!(server.test_calls().fetch_page, 3);
    }

    #[tokio::test]
    async fn concurrent_load_more_fetches_once() {
        let (server, _, c) = setup();
        server.admin_insert_comment(POST, None, BOB, "only");
        let (a, b) = futures::join!(c.load_more(), c.load_more());
        assert_eq!((a, b), (Ok(()), Ok(())));
        assert_eq!(server.test_calls().fetch_page, 1);
        assert_eq!(ids(&c.comments()), vec![1]);
    }

    #[tokio::test]
    async fn pages_shifted_by_new_comments_are_deduplicated() {
        let (server, _, c) = setup();
        for i in 0..3 {
            server.admin_insert_comment(POST, None, BOB, &format!("c{i}"));
        }
        c.load_more().await.unwrap();
        assert_eq!(ids(&c.comments()), vec![3, 2]);
        // someone else posts: the second page now starts with 2 again
        server.admin_insert_comment(POST, None, BOB, "late");
        c.load_more().await.unwrap();
        assert_eq!(ids(&c.comments()), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn failed_load_keeps_state_and_can_be_retried() {
        let (server, _, c) = setup();
        server.admin_insert_comment(POST, None, BOB, "first");
        server.fail_next(Error::Network(String::from("timeout")));
        let res = c.load_more().await;
        assert_eq!(
            res,
            Err(ControllerError::Store(String::from(
                "Could not load comments. Please try again later."
            )))
        );
        assert!(c.comments().is_empty());
        assert!(!c.is_loading());
        assert!(c.error().is_some());

        c.load_more().await.unwrap();
        assert_eq!(ids(&c.comments()), vec![1]);
        assert_eq!(c.error(), None);
    }

    #[tokio::test]
    async fn failed_submit_inserts_nothing() {
        let (server, _, c) = setup();
        c.set_compose_text("hello");
        server.fail_next(Error::Unknown(String::from("500")));
        assert!(matches!(
            c.submit_compose().await,
            Err(ControllerError::Store(_))
        ));
        assert!(c.comments().is_empty());
        // the text is kept so the user can try again
        assert_eq!(c.view().compose, "hello");
    }

    #[tokio::test]
    async fn only_owner_can_delete() {
        let (server, _, c) = setup();
        let mine = server.admin_insert_comment(POST, None, ADA, "mine");
        let theirs = server.admin_insert_comment(POST, None, BOB, "theirs");
        c.load_more().await.unwrap();

        assert!(!c.can_delete(theirs));
        assert_eq!(
            c.delete_comment(theirs).await,
            Err(ControllerError::NotOwner(theirs))
        );
        assert_eq!(server.test_calls().delete_comment, 0);

        assert!(c.can_delete(mine));
        c.delete_comment(mine).await.unwrap();
        assert_eq!(server.test_calls().delete_comment, 1);
        assert_eq!(ids(&c.comments()), vec![theirs.0]);
        assert!(server.test_comment(mine).is_none());
    }

    #[tokio::test]
    async fn delete_rejected_by_store() {
        let (server, _, c) = setup();
        let mine = server.admin_insert_comment(POST, None, ADA, "mine");
        c.load_more().await.unwrap();
        server.fail_next(Error::PermissionDenied);
        assert_eq!(
            c.delete_comment(mine).await,
            Err(ControllerError::Store(String::from(
                "You are not allowed to delete your comment."
            )))
        );
        assert_eq!(ids(&c.comments()), vec![mine.0]);
    }

    #[tokio::test]
    async fn deleting_parent_promotes_replies() {
        let (server, _, c) = setup();
        let parent = server.admin_insert_comment(POST, None, ADA, "parent");
        let reply = server.admin_insert_comment(POST, Some(parent), BOB, "reply");
        c.load_more().await.unwrap();
        assert_eq!(c.forest().roots().len(), 1);

        c.delete_comment(parent).await.unwrap();
        let forest = c.forest();
        assert_eq!(forest.roots().len(), 1);
        assert_eq!(forest.roots()[0].comment.id, reply);
    }

    #[tokio::test]
    async fn reply_depth_is_capped() {
        let (server, _, c) = setup();
        let c1 = server.admin_insert_comment(POST, None, BOB, "1");
        let c2 = server.admin_insert_comment(POST, Some(c1), BOB, "2");
        let c3 = server.admin_insert_comment(POST, Some(c2), BOB, "3");
        c.reload().await.unwrap();
        c.load_more().await.unwrap();
        assert_eq!(c.forest().depth_of(c3), Some(3));

        assert!(c.can_reply(c1));
        assert!(c.can_reply(c2));
        assert!(!c.can_reply(c3));
        assert_eq!(
            c.set_reply_target(Some(c3)),
            Err(ControllerError::TooDeep { max: 3 })
        );
        assert_eq!(c.view().reply_target, None);
        assert_eq!(
            c.submit_comment("too deep", Some(c3)).await,
            Err(ControllerError::TooDeep { max: 3 })
        );
        assert_eq!(server.test_calls().create_comment, 0);

        c.set_reply_target(Some(c2)).unwrap();
        c.set_reply_text("just deep enough");
        let reply = c.submit_reply().await.unwrap();
        assert_eq!(reply.parent_id, Some(c2));
        assert_eq!(c.forest().depth_of(reply.id), Some(3));
        assert_eq!(c.view().reply_target, None);
    }

    #[tokio::test]
    async fn single_reply_box() {
        let (server, _, c) = setup();
        let a = server.admin_insert_comment(POST, None, BOB, "a");
        let b = server.admin_insert_comment(POST, None, BOB, "b");
        c.load_more().await.unwrap();

        c.set_reply_target(Some(a)).unwrap();
        c.set_reply_text("draft");
        c.set_reply_target(Some(b)).unwrap();
        assert_eq!(c.view().reply_target, Some(b));
        assert_eq!(c.view().reply_text, "");

        // toggling the open one closes it
        c.set_reply_target(Some(b)).unwrap();
        assert_eq!(c.view().reply_target, None);

        assert_eq!(
            c.set_reply_target(Some(CommentId(99))),
            Err(ControllerError::UnknownComment(CommentId(99)))
        );
    }

    #[tokio::test]
    async fn update_replaces_content_only() {
        let (server, _, c) = setup();
        let parent = server.admin_insert_comment(POST, None, BOB, "parent");
        let mine = server.admin_insert_comment(POST, Some(parent), ADA, "typo");
        c.load_more().await.unwrap();

        c.update_comment(mine, "fixed").await.unwrap();
        let local = c.comments().into_iter().find(|x| x.id == mine).unwrap();
        assert_eq!(local.content, "fixed");
        assert_eq!(local.parent_id, Some(parent));
        assert_eq!(server.test_comment(mine).unwrap().content, "fixed");

        assert_eq!(
            c.update_comment(parent, "hijack").await,
            Err(ControllerError::NotOwner(parent))
        );
        assert!(matches!(
            c.update_comment(mine, "").await,
            Err(ControllerError::InvalidContent(_))
        ));
        assert_eq!(server.test_calls().update_comment, 1);
    }

    #[tokio::test]
    async fn delete_during_load_keeps_list_consistent() {
        let (server, _, c) = setup();
        server.admin_insert_comment(POST, None, BOB, "c1");
        server.admin_insert_comment(POST, None, BOB, "c2");
        let mine = server.admin_insert_comment(POST, None, ADA, "mine");
        server.admin_insert_comment(POST, None, BOB, "c4");
        c.load_more().await.unwrap();
        assert_eq!(ids(&c.comments()), vec![4, mine.0]);

        // someone posts, so the second page now starts with `mine` again, and is
        // answered before the delete lands
        server.admin_insert_comment(POST, None, BOB, "c5");
        let (del, load) = futures::join!(c.delete_comment(mine), c.load_more());
        del.unwrap();
        load.unwrap();
        assert!(server.test_comment(mine).is_none());
        assert_eq!(ids(&c.comments()), vec![4, 2]);

        c.load_more().await.unwrap();
        assert_eq!(ids(&c.comments()), vec![4, 2, 1]);
        assert!(!c.has_more());
    }

    #[tokio::test]
    async fn deleting_a_loaded_comment_does_not_skip_the_next_one() {
        let (server, _, c) = setup();
        for i in 0..4 {
            server.admin_insert_comment(POST, None, BOB, &format!("c{i}"));
        }
        let mine = server.admin_insert_comment(POST, None, ADA, "mine");
        c.load_more().await.unwrap();
        assert_eq!(ids(&c.comments()), vec![mine.0, 4]);

        c.delete_comment(mine).await.unwrap();
        while c.has_more() {
            c.load_more().await.unwrap();
        }
        assert_eq!(ids(&c.comments()), vec![4, 3, 2, 1]);
        assert_eq!(server.test_calls().fetch_page, 3);
    }

    /// Serves the same page whatever is asked
    struct FixedPage(Vec<Comment>);

    #[async_trait::async_trait(?Send)]
    impl CommentStore for FixedPage {
        async fn fetch_page(&self, _: PageRequest) -> Result<api::CommentPage, Error> {
            Ok(api::CommentPage {
                comments: self.0.clone(),
                has_more: false,
            })
        }

        async fn create_comment(&self, _: NewComment) -> Result<Comment, Error> {
            Err(Error::PermissionDenied)
        }

        async fn update_comment(&self, id: CommentId, _: CommentUpdate) -> Result<Comment, Error> {
            Err(Error::CommentNotFound(id))
        }

        async fn delete_comment(&self, id: CommentId) -> Result<(), Error> {
            Err(Error::CommentNotFound(id))
        }
    }

    #[tokio::test]
    async fn comments_of_other_posts_are_dropped() {
        init_tracing();
        let mut elsewhere = comment(2, None);
        elsewhere.post_id = PostId(2);
        let store = Rc::new(FixedPage(vec![comment(1, None), elsewhere, comment(3, Some(1))]));
        let c = CommentController::new(
            POST,
            store,
            IdentitySession::in_memory(),
            Config::default(),
        );
        c.load_more().await.unwrap();
        assert_eq!(ids(&c.comments()), vec![1, 3]);
        assert_eq!(c.forest().roots().len(), 1);
    }

    #[tokio::test]
    async fn responses_after_detach_are_ignored() {
        let (server, _, c) = setup();
        server.admin_insert_comment(POST, None, BOB, "x");
        let load = c.load_more();
        let detach = async { c.detach() };
        let (res, ()) = futures::join!(load, detach);
        res.unwrap();
        assert!(c.comments().is_empty());
        assert_eq!(server.test_calls().fetch_page, 1);

        // nothing more is requested once detached
        c.load_more().await.unwrap();
        assert_eq!(server.test_calls().fetch_page, 1);
    }

    #[tokio::test]
    async fn reload_drops_stale_pages() {
        let (server, _, c) = setup();
        for i in 0..3 {
            server.admin_insert_comment(POST, None, BOB, &format!("c{i}"));
        }
        c.load_more().await.unwrap();
        let (a, b) = futures::join!(c.load_more(), c.reload());
        a.unwrap();
        b.unwrap();
        // only the fresh first page is kept
        assert_eq!(ids(&c.comments()), vec![3, 2]);
        assert!(c.has_more());
    }
}
