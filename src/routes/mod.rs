mod auth;
mod health_check;
mod users;

pub use auth::{get_current_user, login, logout, refresh, REFRESH_TOKEN_COOKIE};
pub use health_check::health_check;
pub use users::{delete_user, register};
