//! Bearer token issuance.
//!
//! The secret is handed to the client once; only [`digest`] of it is stored.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Random bytes per token (256 bits of entropy).
pub const TOKEN_BYTES: usize = 32;

pub struct IssuedToken {
    /// Hex secret for the client. Never persisted.
    pub secret: String,
    /// Hex SHA-256 of `secret`, the value the store keeps.
    pub digest: String,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("secret", &"<redacted>")
            .field("digest", &self.digest)
            .finish()
    }
}

pub fn generate() -> anyhow::Result<IssuedToken> {
    let mut buf = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| anyhow::anyhow!("draw token bytes: {e}"))?;
    let secret = hex::encode(buf);
    let digest = digest(&secret);
    Ok(IssuedToken { secret, digest })
}

/// Deterministic one-way digest of a presented secret.
pub fn digest(secret: &str) -> String {
    let mut h = Sha256::new();
    h.update(secret.as_bytes());
    hex::encode(h.finalize())
}
