mod comment;
mod user;

pub use comment::*;
pub use user::*;
