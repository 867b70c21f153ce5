mod config;
pub use config::Config;

mod controller;
pub use controller::{CommentController, CommentsView, ControllerError};

mod forest;
pub use forest::{build_forest, CommentNode, Forest};

mod fuzz;

mod identity;
pub use identity::{IdentitySession, IdentityStorage, MemoryStorage};

pub mod login;

pub mod api {
    pub use analogia_api::*;
}
