pub mod auth;
pub mod request_log;

pub use auth::auth_middleware;
pub use request_log::request_log_middleware;
