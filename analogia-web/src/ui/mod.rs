mod app;
pub use app::{App, AppProps};

mod comment_item;
pub use comment_item::CommentItem;

mod comment_section;
pub use comment_section::CommentSection;

mod login;
pub use login::Login;
