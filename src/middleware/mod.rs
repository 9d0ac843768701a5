/// Middleware module
///
/// The authorization guard for protected routes and request logging.

mod jwt_middleware;
mod request_logger;

pub use jwt_middleware::{AuthenticatedUser, JwtMiddleware};
pub use request_logger::RequestLogger;
