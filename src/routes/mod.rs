pub mod account;
pub mod bank;
pub mod health;
pub mod session;
