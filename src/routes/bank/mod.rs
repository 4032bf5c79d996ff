mod handler;
mod model;

pub use handler::{bank_info, confirm_bank};
