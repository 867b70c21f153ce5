use std::collections::{BTreeMap, VecDeque};

use analogia_api::{
    self as api, Comment, CommentId, CommentPage, CommentStore, CommentUpdate, EmailVerification,
    Error, IdentityVerifier, NewComment, PageRequest, PostId, Time,
};
use async_trait::async_trait;
use chrono::TimeZone;
use parking_lot::Mutex;

/// In-memory stand-in for the comment backend and the member allow-list
pub struct MockServer(Mutex<State>);

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Calls {
    pub fetch_page: usize,
    pub create_comment: usize,
    pub update_comment: usize,
    pub delete_comment: usize,
    pub verify_email: usize,
    pub assign_username: usize,
}

#[derive(Debug)]
struct State {
    next_id: i64,
    clock: Time,
    comments: BTreeMap<CommentId, Comment>,
    // email -> username, if one was assigned
    members: BTreeMap<String, Option<String>>,
    failures: VecDeque<Error>,
    calls: Calls,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer(Mutex::new(State {
            next_id: 1,
            clock: chrono::Utc
                .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .single()
                .expect("valid mock server epoch"),
            comments: BTreeMap::new(),
            members: BTreeMap::new(),
            failures: VecDeque::new(),
            calls: Calls::default(),
        }))
    }

    pub fn admin_allow_email(&self, email: &str, username: Option<&str>) {
        self.0
            .lock()
            .members
            .insert(String::from(email), username.map(String::from));
    }

    /// Insert a comment bypassing every check, eg. to set up malformed threads
    pub fn admin_insert_comment(
        &self,
        post_id: PostId,
        parent_id: Option<CommentId>,
        author_email: &str,
        content: &str,
    ) -> CommentId {
        let mut s = self.0.lock();
        let c = s.next_comment(NewComment {
            content: String::from(content),
            author_name: String::from(author_email.split('@').next().unwrap_or(author_email)),
            author_email: String::from(author_email),
            post_id,
            parent_id,
        });
        let id = c.id;
        s.comments.insert(id, c);
        id
    }

    /// Make the next request, whatever it is, fail with `e`
    pub fn fail_next(&self, e: Error) {
        self.0.lock().failures.push_back(e);
    }

    pub fn test_calls(&self) -> Calls {
        self.0.lock().calls
    }

    pub fn test_comment(&self, id: CommentId) -> Option<Comment> {
        self.0.lock().comments.get(&id).cloned()
    }

    pub fn test_username_of(&self, email: &str) -> Option<String> {
        self.0.lock().members.get(email).cloned().flatten()
    }

    // Every request goes through the event loop once before being answered, so that
    // callers actually observe requests being in flight.
    async fn roundtrip(&self, count: impl FnOnce(&mut Calls)) -> Result<(), Error> {
        count(&mut self.0.lock().calls);
        self.respond().await
    }

    async fn respond(&self) -> Result<(), Error> {
        tokio::task::yield_now().await;
        match self.0.lock().failures.pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

impl State {
    fn next_comment(&mut self, c: NewComment) -> Comment {
        let id = CommentId(self.next_id);
        self.next_id += 1;
        self.clock += chrono::Duration::minutes(1);
        Comment {
            id,
            content: c.content,
            author_name: c.author_name,
            author_email: c.author_email,
            created_at: self.clock,
            post_id: c.post_id,
            parent_id: c.parent_id,
        }
    }

    fn page(&self, req: &PageRequest) -> CommentPage {
        let mut all = self
            .comments
            .values()
            .filter(|c| c.post_id == req.post_id)
            .collect::<Vec<_>>();
        all.sort_by_key(|c| (c.created_at, c.id));
        if req.direction == api::Direction::Desc {
            all.reverse();
        }
        let total = all.len() as u64;
        let comments = all
            .into_iter()
            .skip(req.page as usize * req.page_size as usize)
            .take(req.page_size as usize)
            .cloned()
            .collect();
        CommentPage::from_totals(comments, req.page, req.page_size, total)
    }
}

#[async_trait(?Send)]
impl CommentStore for MockServer {
    async fn fetch_page(&self, req: PageRequest) -> Result<CommentPage, Error> {
        // the page is read when the request arrives, writes landing while the
        // response travels back are not part of it
        let page = {
            let mut s = self.0.lock();
            s.calls.fetch_page += 1;
            s.page(&req)
        };
        self.respond().await?;
        Ok(page)
    }

    async fn create_comment(&self, c: NewComment) -> Result<Comment, Error> {
        self.roundtrip(|calls| calls.create_comment += 1).await?;
        api::validate_content(&c.content).map_err(|e| Error::InvalidContent(e.to_string()))?;
        let mut s = self.0.lock();
        if !s.members.contains_key(&c.author_email) {
            return Err(Error::EmailNotAllowed(c.author_email));
        }
        if let Some(parent) = c.parent_id {
            match s.comments.get(&parent) {
                Some(p) if p.post_id == c.post_id => (),
                _ => return Err(Error::CommentNotFound(parent)),
            }
        }
        let c = s.next_comment(c);
        s.comments.insert(c.id, c.clone());
        Ok(c)
    }

    async fn update_comment(&self, id: CommentId, u: CommentUpdate) -> Result<Comment, Error> {
        self.roundtrip(|calls| calls.update_comment += 1).await?;
        api::validate_content(&u.content).map_err(|e| Error::InvalidContent(e.to_string()))?;
        let mut s = self.0.lock();
        let c = s
            .comments
            .get_mut(&id)
            .ok_or(Error::CommentNotFound(id))?;
        c.content = u.content;
        Ok(c.clone())
    }

    async fn delete_comment(&self, id: CommentId) -> Result<(), Error> {
        self.roundtrip(|calls| calls.delete_comment += 1).await?;
        // no cascade: replies to a deleted comment stay in the store
        match self.0.lock().comments.remove(&id) {
            Some(_) => Ok(()),
            None => Err(Error::CommentNotFound(id)),
        }
    }
}

#[async_trait(?Send)]
impl IdentityVerifier for MockServer {
    async fn verify_email(&self, email: &str) -> Result<EmailVerification, Error> {
        self.roundtrip(|calls| calls.verify_email += 1).await?;
        Ok(match self.0.lock().members.get(email) {
            None => EmailVerification {
                allowed: false,
                username: None,
            },
            Some(username) => EmailVerification {
                allowed: true,
                username: username.clone(),
            },
        })
    }

    async fn assign_username(&self, email: &str, username: &str) -> Result<(), Error> {
        self.roundtrip(|calls| calls.assign_username += 1).await?;
        api::validate_username(username)?;
        let mut s = self.0.lock();
        if s.members.values().flatten().any(|n| n == username) {
            return Err(Error::NameAlreadyUsed(String::from(username)));
        }
        match s.members.get_mut(email) {
            None => Err(Error::EmailNotAllowed(String::from(email))),
            Some(slot) if slot.is_some() => Err(Error::PermissionDenied),
            Some(slot) => {
                *slot = Some(String::from(username));
                Ok(())
            }
        }
    }
}
