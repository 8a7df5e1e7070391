use crate::error::{AppError, AppResult};

/// bcrypt with a fresh random salt per hash. Hashing runs on the blocking
/// pool since a realistic cost takes hundreds of milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: &str) -> AppResult<String> {
        let password = password.to_owned();
        let cost = self.cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))??;
        Ok(hash)
    }

    pub async fn verify(&self, password: &str, hash: &str) -> AppResult<bool> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))??;
        Ok(valid)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[tokio::test]
    async fn hash_verifies_against_plaintext() {
        let hasher = PasswordHasher::new(TEST_COST);
        let hash = hasher.hash("secret1").await.unwrap();
        assert_ne!(hash, "secret1");
        assert!(hasher.verify("secret1", &hash).await.unwrap());
        assert!(!hasher.verify("secret2", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn same_password_hashes_differently() {
        let hasher = PasswordHasher::new(TEST_COST);
        let h1 = hasher.hash("secret1").await.unwrap();
        let h2 = hasher.hash("secret1").await.unwrap();
        assert_ne!(h1, h2, "each hash should carry its own salt");
    }

    #[tokio::test]
    async fn garbage_hash_is_an_error_not_a_match() {
        let hasher = PasswordHasher::new(TEST_COST);
        assert!(hasher.verify("secret1", "not-a-bcrypt-hash").await.is_err());
    }
}
