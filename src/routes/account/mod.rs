mod handler;
mod model;

pub use handler::{
    complete_profile, create_elevated_user, create_shared_account, resend_verification_email,
    update_profile, verify_email,
};
