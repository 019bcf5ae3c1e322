//! Authentication Module
//! Mission: Registration, bearer tokens and per-request identity resolution

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod user_store;

pub use jwt::JwtHandler;
pub use middleware::auth_middleware;
pub use models::{Identity, UserId};
pub use user_store::UserStore;
