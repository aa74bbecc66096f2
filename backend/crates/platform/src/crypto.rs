//! Cryptographic Utilities

use base64::{Engine, engine::general_purpose};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Generate a random 32-byte secret (development keys)
pub fn random_secret() -> [u8; 32] {
    let mut secret = [0u8; 32];
    rand::rng().fill_bytes(&mut secret);
    secret
}

/// Encode bytes as base64
pub fn to_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Decode base64 to bytes
pub fn from_base64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::STANDARD.decode(s)
}

/// Decode a base64 string into a 32-byte key
pub fn secret_from_base64(s: &str) -> Result<[u8; 32], TokenError> {
    let bytes = from_base64(s.trim()).map_err(|_| TokenError::Malformed)?;
    bytes.try_into().map_err(|_| TokenError::Malformed)
}

/// Error when a signed token cannot be verified
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,
    #[error("Token signature mismatch")]
    BadSignature,
}

fn mac_for(secret: &[u8; 32], payload: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    mac
}

/// Sign a payload: `<payload>.<base64url(hmac-sha256(payload))>`
///
/// The payload must not contain `.`.
pub fn sign_token(secret: &[u8; 32], payload: &str) -> String {
    let signature = mac_for(secret, payload).finalize().into_bytes();
    format!(
        "{}.{}",
        payload,
        general_purpose::URL_SAFE_NO_PAD.encode(signature)
    )
}

/// Verify a token produced by [`sign_token`] and return its payload
pub fn verify_token<'a>(secret: &[u8; 32], token: &'a str) -> Result<&'a str, TokenError> {
    let (payload, signature_b64) = token.split_once('.').ok_or(TokenError::Malformed)?;
    if payload.is_empty() || signature_b64.contains('.') {
        return Err(TokenError::Malformed);
    }

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| TokenError::Malformed)?;

    // verify_slice compares in constant time
    mac_for(secret, payload)
        .verify_slice(&signature)
        .map_err(|_| TokenError::BadSignature)?;

    Ok(payload)
}
