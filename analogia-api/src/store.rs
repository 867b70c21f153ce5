use async_trait::async_trait;

use crate::{
    Comment, CommentId, CommentPage, CommentUpdate, EmailVerification, Error, NewComment,
    PageRequest,
};

/// Remote persistence for comments.
///
/// Methods take `&self` so that several requests can be in flight at once.
/// Futures are not required to be `Send`, as browser futures are not.
#[async_trait(?Send)]
pub trait CommentStore {
    async fn fetch_page(&self, req: PageRequest) -> Result<CommentPage, Error>;
    async fn create_comment(&self, c: NewComment) -> Result<Comment, Error>;
    async fn update_comment(&self, id: CommentId, u: CommentUpdate) -> Result<Comment, Error>;
    async fn delete_comment(&self, id: CommentId) -> Result<(), Error>;
}

/// Allow-list of emails permitted to post
#[async_trait(?Send)]
pub trait IdentityVerifier {
    async fn verify_email(&self, email: &str) -> Result<EmailVerification, Error>;

    /// One-time assignment for allow-listed members without a username
    async fn assign_username(&self, email: &str, username: &str) -> Result<(), Error>;
}
