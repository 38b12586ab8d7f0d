use sha2::{Digest, Sha256};

/// Hex SHA-256 of a raw token. Only hashes are stored.
pub fn create_token_hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Generate a random 20-byte token, hex encoded.
pub fn generate_token() -> String {
    let bytes: [u8; 20] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
