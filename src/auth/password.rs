use anyhow::Context;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{rngs::OsRng, RngCore};
use tracing::{debug, error};

const SALT_BYTES: usize = 16;

/// Hashes a password with a fresh random salt. The PHC string returned
/// carries algorithm, parameters, salt and digest together.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let mut salt = [0u8; SALT_BYTES];
    OsRng.try_fill_bytes(&mut salt).map_err(|e| {
        error!(error = %e, "salt generation failed");
        anyhow::anyhow!("draw password salt: {e}")
    })?;
    let salt = SaltString::encode_b64(&salt).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Checks `plain` against a stored PHC string. Malformed stored values
/// verify as `false`.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// [`hash_password`] on the blocking pool, so the async worker keeps
/// serving timers (the request deadline among them) while argon2 runs.
pub async fn spawn_hash(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .context("join password hashing task")?
}

/// [`verify_password`] on the blocking pool.
pub async fn spawn_verify(plain: String, stored: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &stored))
        .await
        .context("join password verification task")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple").expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = hash_password("secret123").unwrap();
        let b = hash_password("secret123").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("secret123", &a));
        assert!(verify_password("secret123", &b));
    }

    #[test]
    fn malformed_hash_verifies_false() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
        assert!(!verify_password("anything", ""));
        assert!(!verify_password("anything", "abcd:zz-not-hex"));
    }

    #[test]
    fn hash_does_not_contain_plaintext() {
        let hash = hash_password("pw123456").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("pw123456"));
    }

    #[tokio::test]
    async fn spawned_hash_and_verify_agree() {
        let hash = spawn_hash("secret123".into()).await.unwrap();
        assert!(spawn_verify("secret123".into(), hash.clone()).await.unwrap());
        assert!(!spawn_verify("secret124".into(), hash).await.unwrap());
        assert!(!spawn_verify("x".into(), "garbage".into()).await.unwrap());
    }

    #[tokio::test]
    async fn deadline_fires_while_hashing() {
        let res = tokio::time::timeout(Duration::from_millis(1), spawn_hash("pw123456".into())).await;
        assert!(res.is_err(), "hash finished inside 1ms or blocked the timer");
    }
}
