use std::sync::LazyLock;

use regex::Regex;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("EMAIL_REGEX is a valid regex pattern")
});

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[1-9]\d{1,14}$").expect("PHONE_REGEX is a valid regex pattern")
});

const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_MAX_LEN: usize = 20;
const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+{}[]:;\"'<>,.?/~\\|-";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password must be between 8 and 20 characters")]
    PasswordLength,
    #[error("password must contain at least one uppercase letter")]
    PasswordMissingUppercase,
    #[error("password must contain at least one lowercase letter")]
    PasswordMissingLowercase,
    #[error("password must contain at least one digit")]
    PasswordMissingDigit,
    #[error("password must contain at least one special character")]
    PasswordMissingSpecial,
    #[error("invalid phone number format")]
    InvalidPhoneNumber,
    #[error("bank query cannot be empty")]
    EmptyQuery,
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    if PHONE_REGEX.is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhoneNumber)
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(ValidationError::PasswordLength);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::PasswordMissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ValidationError::PasswordMissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::PasswordMissingDigit);
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(ValidationError::PasswordMissingSpecial);
    }
    Ok(())
}

/// Email and password checks shared by every account-creating operation.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    validate_email(email)?;
    validate_password(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_emails() {
        assert!(validate_email("e@x.com").is_ok());
        assert!(validate_email("first.last+tag@bank-co.example.org").is_ok());
    }

    #[test]
    fn rejects_malformed_emails() {
        for email in ["", "plain", "a@b", "a@b.c", "a b@x.com", "@x.com"] {
            assert_eq!(validate_email(email), Err(ValidationError::InvalidEmail), "{email}");
        }
    }

    #[test]
    fn password_policy() {
        assert!(validate_password("Passw0rd!").is_ok());
        assert_eq!(validate_password("Pa0!"), Err(ValidationError::PasswordLength));
        assert_eq!(
            validate_password("Passw0rd!Passw0rd!Pas"),
            Err(ValidationError::PasswordLength)
        );
        assert_eq!(
            validate_password("passw0rd!"),
            Err(ValidationError::PasswordMissingUppercase)
        );
        assert_eq!(
            validate_password("PASSW0RD!"),
            Err(ValidationError::PasswordMissingLowercase)
        );
        assert_eq!(
            validate_password("Password!"),
            Err(ValidationError::PasswordMissingDigit)
        );
        assert_eq!(
            validate_password("Passw0rdX"),
            Err(ValidationError::PasswordMissingSpecial)
        );
    }

    #[test]
    fn phone_numbers() {
        assert!(validate_phone_number("1234567890").is_ok());
        assert!(validate_phone_number("+15551234567").is_ok());
        assert_eq!(
            validate_phone_number("0123"),
            Err(ValidationError::InvalidPhoneNumber)
        );
        assert_eq!(
            validate_phone_number("555-1234"),
            Err(ValidationError::InvalidPhoneNumber)
        );
    }
}
