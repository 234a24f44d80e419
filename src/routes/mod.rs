mod auth;
mod health_check;
mod users;

pub use auth::{login, logout, refresh, register};
pub use health_check::{health, health_check};
pub use users::get_current_user;
