mod handler;
mod model;

pub use handler::{login, logout, verify_token};
pub use model::{LoginRequest, LoginResponse};
