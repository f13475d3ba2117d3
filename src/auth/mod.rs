pub mod csrf;
pub mod middleware;
pub mod session;

pub use csrf::{generate_csrf_token, verify_csrf};
pub use middleware::{session_token, Requester, RequireAdmin};
pub use session::generate_session_token;
