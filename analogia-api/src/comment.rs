use std::fmt;

use crate::{Time, MAX_COMMENT_LEN};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentId(pub i64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the analogy or news article a comment thread hangs off
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct PostId(pub i64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub author_name: String,
    pub author_email: String,
    pub created_at: Time,
    pub post_id: PostId,

    /// None for top-level comments
    #[serde(default)]
    pub parent_id: Option<CommentId>,
}

impl Comment {
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.author_email == email
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,
    pub author_name: String,
    pub author_email: String,
    pub post_id: PostId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
}

/// Only the content of a comment can be changed after creation
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentUpdate {
    pub content: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ContentError {
    #[error("Comment cannot be empty")]
    Empty,

    #[error("Comment is {len} characters long, the maximum is {max}")]
    TooLong { len: usize, max: usize },
}

pub fn validate_content(content: &str) -> Result<(), ContentError> {
    if content.trim().is_empty() {
        return Err(ContentError::Empty);
    }
    let len = content.chars().count();
    if len > MAX_COMMENT_LEN {
        return Err(ContentError::TooLong {
            len,
            max: MAX_COMMENT_LEN,
        });
    }
    Ok(())
}
