//! Referral Code Value Objects
//!
//! - [`ReferralCode`]: the code a profile owns, 6 characters of `[0-9A-Z]`
//! - [`ReferrerCode`]: whatever arrived in the page's `ref` query parameter
//!
//! A referrer code is never validated against the referral code format:
//! anything that does not match a stored code simply attributes nothing.

use kernel::error::app_error::{AppError, AppResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of every issued referral code
pub const REFERRAL_CODE_LENGTH: usize = 6;

/// Sampling alphabet; codes are uppercased after sampling
const REFERRAL_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Longest `ref` value worth keeping
const REFERRER_CODE_MAX_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferralCode(String);

impl ReferralCode {
    /// Draw a fresh code from `rng`
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..REFERRAL_CODE_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..REFERRAL_ALPHABET.len());
                REFERRAL_ALPHABET[idx].to_ascii_uppercase() as char
            })
            .collect();
        Self(code)
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        if Self::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(AppError::bad_request(format!("Invalid referral code: {s}")))
        }
    }

    pub fn is_valid(s: &str) -> bool {
        s.len() == REFERRAL_CODE_LENGTH
            && s.bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReferralCode {
    type Error = AppError;

    fn try_from(value: String) -> AppResult<Self> {
        Self::parse(&value)
    }
}

impl From<ReferralCode> for String {
    fn from(code: ReferralCode) -> Self {
        code.0
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of fresh referral codes
pub trait ReferralCodeSource: Send + Sync {
    fn next_code(&self) -> ReferralCode;
}

/// Codes drawn from the thread-local RNG (OS-seeded)
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomReferralCodes;

impl ReferralCodeSource for RandomReferralCodes {
    fn next_code(&self) -> ReferralCode {
        ReferralCode::generate(&mut rand::rng())
    }
}

/// Referrer code captured from the page's `ref` query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferrerCode(String);

impl ReferrerCode {
    /// `None` for an absent, blank or oversized value
    pub fn from_query(raw: Option<&str>) -> Option<Self> {
        let trimmed = raw?.trim();
        if trimmed.is_empty() || trimmed.len() > REFERRER_CODE_MAX_LENGTH {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferrerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_generated_codes_match_format() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let code = ReferralCode::generate(&mut rng);
            assert_eq!(code.as_str().len(), REFERRAL_CODE_LENGTH);
            assert!(ReferralCode::is_valid(code.as_str()), "bad code {code}");
        }
    }

    #[test]
    fn test_generation_uses_whole_alphabet() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..2_000 {
            seen.extend(ReferralCode::generate(&mut rng).as_str().chars());
        }
        assert_eq!(seen.len(), 36);
    }

    #[test]
    fn test_random_source() {
        let code = RandomReferralCodes.next_code();
        assert!(ReferralCode::is_valid(code.as_str()));
    }

    #[test]
    fn test_parse() {
        assert!(ReferralCode::parse("AB12CD").is_ok());
        assert!(ReferralCode::parse("ab12cd").is_err());
        assert!(ReferralCode::parse("AB12C").is_err());
        assert!(ReferralCode::parse("AB12CDE").is_err());
        assert!(ReferralCode::parse("AB-2CD").is_err());
    }

    #[test]
    fn test_referrer_code_from_query() {
        assert_eq!(ReferrerCode::from_query(None), None);
        assert_eq!(ReferrerCode::from_query(Some("")), None);
        assert_eq!(ReferrerCode::from_query(Some("   ")), None);
        assert_eq!(ReferrerCode::from_query(Some(&"A".repeat(65))), None);
        assert_eq!(
            ReferrerCode::from_query(Some(" AB12CD ")).unwrap().as_str(),
            "AB12CD"
        );
        // Not a valid referral code, but still carried
        assert_eq!(
            ReferrerCode::from_query(Some("stale-code")).unwrap().as_str(),
            "stale-code"
        );
    }
}
