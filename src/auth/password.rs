use bcrypt::{DEFAULT_COST, hash, verify};

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(#[from] bcrypt::BcryptError);

/// One-way password digest with a verify counterpart.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, PasswordError>;

    /// Compares in constant time with respect to the digest contents.
    fn verify(&self, digest: &str, plain: &str) -> Result<bool, PasswordError>;
}

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        Ok(hash(plain.as_bytes(), self.cost)?)
    }

    fn verify(&self, digest: &str, plain: &str) -> Result<bool, PasswordError> {
        Ok(verify(plain.as_bytes(), digest)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_original_password() {
        let hasher = BcryptHasher::new(4);
        let digest = hasher.hash("Passw0rd!").unwrap();

        assert_ne!(digest, "Passw0rd!");
        assert!(hasher.verify(&digest, "Passw0rd!").unwrap());
        assert!(!hasher.verify(&digest, "Passw0rd?").unwrap());
    }
}
