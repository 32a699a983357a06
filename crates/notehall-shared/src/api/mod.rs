mod auth;
mod comments;
mod feed;

pub use auth::*;
pub use comments::*;
pub use feed::*;
