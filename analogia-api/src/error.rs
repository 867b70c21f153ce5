use anyhow::{anyhow, Context};
use serde_json::json;

use crate::CommentId;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Comment not found {0}")]
    CommentNotFound(CommentId),

    #[error("Email is not allow-listed {0:?}")]
    EmailNotAllowed(String),

    #[error("Name already used {0}")]
    NameAlreadyUsed(String),

    #[error("Invalid user name {0:?}")]
    InvalidName(String),

    #[error("Invalid comment content: {0}")]
    InvalidContent(String),
}

impl Error {
    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::Network(msg) => json!({
                "message": msg,
                "type": "network",
            }),
            Error::PermissionDenied => json!({
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::CommentNotFound(id) => json!({
                "message": "comment not found",
                "type": "comment-not-found",
                "id": id,
            }),
            Error::EmailNotAllowed(email) => json!({
                "message": "email is not allow-listed",
                "type": "email-not-allowed",
                "email": email,
            }),
            Error::NameAlreadyUsed(n) => json!({
                "message": "name already used",
                "type": "conflict-name",
                "name": n,
            }),
            Error::InvalidName(n) => json!({
                "message": "invalid user name",
                "type": "invalid-name",
                "name": n,
            }),
            Error::InvalidContent(msg) => json!({
                "message": msg,
                "type": "invalid-content",
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let string_field = |field: &str| {
            data.get(field)
                .and_then(|s| s.as_str())
                .map(String::from)
                .ok_or_else(|| anyhow!("error contents has no string field {field:?}"))
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(string_field("message").unwrap_or_default()),
                "network" => Error::Network(string_field("message").unwrap_or_default()),
                "permission-denied" => Error::PermissionDenied,
                "comment-not-found" => Error::CommentNotFound(CommentId(
                    data.get("id")
                        .and_then(|id| id.as_i64())
                        .ok_or_else(|| anyhow!("comment-not-found error without an id"))?,
                )),
                "email-not-allowed" => Error::EmailNotAllowed(string_field("email")?),
                "conflict-name" => Error::NameAlreadyUsed(string_field("name")?),
                "invalid-name" => Error::InvalidName(string_field("name")?),
                "invalid-content" => Error::InvalidContent(string_field("message")?),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }

    /// Build an error out of a non-success response, for backends that do not
    /// answer with a structured error body
    pub fn from_response(status: http::StatusCode, body: &[u8]) -> Error {
        if let Ok(e) = Error::parse(body) {
            return e;
        }
        use http::StatusCode;
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::PermissionDenied,
            s if s.is_server_error() => Error::Network(format!("server answered {s}")),
            s => Error::Unknown(format!(
                "unexpected response {s}: {}",
                String::from_utf8_lossy(body)
            )),
        }
    }
}
