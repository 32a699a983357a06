pub mod api;
pub mod models;
pub mod thread;

pub use models::*;
pub use thread::{build_threads, CommentThread};
