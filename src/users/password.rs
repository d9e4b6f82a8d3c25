use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

/// Argon2id hasher with the crate's fixed work factor.
///
/// Hashing and verification are CPU bound, so both run on the blocking pool.
/// The salt is embedded in the PHC string, nothing else is stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialHasher;

impl CredentialHasher {
    pub fn new() -> Self {
        Self
    }

    pub async fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || hash_password(&plain)).await?
    }

    /// Never fails: a malformed hash or a panicked worker counts as a mismatch.
    pub async fn compare(&self, plain: &str, hash: &str) -> bool {
        let (plain, hash) = (plain.to_owned(), hash.to_owned());
        match tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await {
            Ok(Ok(matched)) => matched,
            Ok(Err(e)) => {
                warn!(error = %e, "password compare failed");
                false
            }
            Err(e) => {
                error!(error = %e, "password compare task failed");
                false
            }
        }
    }
}

fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
