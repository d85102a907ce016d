use rand::rngs::OsRng;
use rand::RngCore;

/// Tokens are 16 bytes of OS entropy, hex-encoded to a fixed 32 characters.
pub const TOKEN_LEN: usize = 32;

const PREFIX_LEN: usize = 8;

/// Mint a fresh bearer capability (share token or per-recipient auth token).
pub fn generate_token() -> String {
    let mut buf = [0u8; TOKEN_LEN / 2];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Short prefix safe for audit logs. Full tokens must never be logged.
pub fn redacted_prefix(token: &str) -> String {
    let end = token.len().min(PREFIX_LEN);
    format!("{}...", &token[..end])
}
