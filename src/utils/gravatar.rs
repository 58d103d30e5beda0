use sha2::{Digest, Sha256};

const GRAVATAR_BASE: &str = "https://www.gravatar.com/avatar";
const DEFAULT_SIZE: u32 = 300;

/// Gravatar URL for `email`, keyed by the SHA-256 of the trimmed, lower-cased address.
pub fn avatar_url(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{}/{}?s={}", GRAVATAR_BASE, hex::encode(digest), DEFAULT_SIZE)
}
