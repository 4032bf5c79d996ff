mod handler;
mod model;

pub use handler::{login, refresh_token};
pub use model::LoginResponse;
