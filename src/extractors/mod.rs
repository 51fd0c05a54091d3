pub mod body;
pub mod session;

pub use body::{JsonBody, PathIds};
pub use session::{SessionCookie, SESSION_COOKIE};
