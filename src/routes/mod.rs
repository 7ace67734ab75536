mod auth;
mod health_check;
mod users;

pub use auth::{login, refresh, register, revoke_token, whoami};
pub use health_check::health_check;
pub use users::list_users;
