use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::constants::PASSWORD_HASH_ROUNDS;

type HmacSha256 = Hmac<Sha256>;

fn hmac_bytes(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

// =============================================================================
// Password Hashing
// =============================================================================

/// Generate a fresh random salt for a new password (hex string)
pub fn generate_salt() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Hash a password with a per-user salt and the server-side pepper
///
/// # Algorithm
/// `h0 = HMAC(pepper, salt + password)`, `hN = HMAC(pepper, hN-1)` for
/// `PASSWORD_HASH_ROUNDS` rounds, hex encoded.
///
/// The pepper lives only in the environment, so a leaked database alone
/// is not enough to brute-force passwords.
pub fn hash_password(password: &str, salt: &str, pepper: &str) -> String {
    hex::encode(final_round(password, salt, pepper).finalize().into_bytes())
}

/// Run every round but the last, returning the last round's MAC ready to
/// finalize or verify
fn final_round(password: &str, salt: &str, pepper: &str) -> HmacSha256 {
    let key = pepper.as_bytes();

    let mut seed = Vec::with_capacity(salt.len() + password.len());
    seed.extend_from_slice(salt.as_bytes());
    seed.extend_from_slice(password.as_bytes());

    let mut input = seed;
    for _ in 1..PASSWORD_HASH_ROUNDS {
        input = hmac_bytes(key, &input);
    }

    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(&input);
    mac
}

/// Check a candidate password against a stored hash in constant time
pub fn verify_password(password: &str, salt: &str, pepper: &str, expected_hash: &str) -> bool {
    let expected = match hex::decode(expected_hash) {
        Ok(bytes) => bytes,
        Err(_) => {
            tracing::warn!("Stored password hash is not valid hex");
            return false;
        }
    };

    final_round(password, salt, pepper)
        .verify_slice(&expected)
        .is_ok()
}

// =============================================================================
// Signed Tokens
// =============================================================================

/// Verify HMAC-SHA256 signature
///
/// # Arguments
/// * `data` - The data that was signed
/// * `signature` - The hex-encoded HMAC signature
/// * `secret` - The shared secret key (from environment)
pub fn verify_hmac(data: &str, signature: &str, secret: &str) -> bool {
    // Create HMAC instance with secret key
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            tracing::error!("Failed to create HMAC instance");
            return false;
        }
    };

    mac.update(data.as_bytes());

    let sig_bytes = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => {
            tracing::warn!("Invalid hex signature format");
            return false;
        }
    };

    mac.verify_slice(&sig_bytes).is_ok()
}

/// Which of the two token types a token was issued as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Reasons a bearer token is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    InvalidSignature,
    WrongKind,
    Expired,
}

/// Issue a signed token for `user_id`
///
/// Format: `<kind>.<user_id>.<expires_at>.<hex HMAC-SHA256 of the first three parts>`
pub fn issue_token(kind: TokenKind, user_id: &str, expires_at: i64, secret: &str) -> String {
    let payload = format!("{}.{}.{}", kind.as_str(), user_id, expires_at);
    let signature = hex::encode(hmac_bytes(secret.as_bytes(), payload.as_bytes()));
    format!("{}.{}", payload, signature)
}

/// Verify a token of the expected kind and return the user ID it was issued for
pub fn verify_token(
    token: &str,
    expected: TokenKind,
    now: i64,
    secret: &str,
) -> Result<String, TokenError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    let [kind, user_id, expires_at, signature] = parts.as_slice() else {
        return Err(TokenError::Malformed);
    };

    if user_id.is_empty() {
        return Err(TokenError::Malformed);
    }

    let payload = format!("{}.{}.{}", kind, user_id, expires_at);
    if !verify_hmac(&payload, signature, secret) {
        return Err(TokenError::InvalidSignature);
    }

    if *kind != expected.as_str() {
        return Err(TokenError::WrongKind);
    }

    let expires_at: i64 = expires_at.parse().map_err(|_| TokenError::Malformed)?;
    if now >= expires_at {
        return Err(TokenError::Expired);
    }

    Ok(user_id.to_string())
}
