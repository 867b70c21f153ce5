use chrono::Utc;

pub type Time = chrono::DateTime<Utc>;

/// Maximum number of characters in a comment body
pub const MAX_COMMENT_LEN: usize = 250;

/// Maximum number of characters in a username
pub const MAX_USERNAME_LEN: usize = 50;

mod comment;
pub use comment::{
    validate_content, Comment, CommentId, CommentUpdate, ContentError, NewComment, PostId,
};

mod error;
pub use error::Error;

mod identity;
pub use identity::{EmailVerification, Identity, UsernameAssignment};

mod page;
pub use page::{CommentPage, Direction, PageRequest, SortField};

mod store;
pub use store::{CommentStore, IdentityVerifier};

pub fn validate_username(name: &str) -> Result<(), Error> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_USERNAME_LEN || name.contains('\0') {
        return Err(Error::InvalidName(String::from(name)));
    }
    Ok(())
}
