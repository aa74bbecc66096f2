//! Application Configuration
//!
//! Configuration for the Account application layer.

use std::time::Duration;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;
use platform::cookie::CookieConfig;

/// Default outbound form links shown on the landing page
pub const DEFAULT_FIND_HOUSING_URL: &str = "https://tally.so/r/3Ey154";
pub const DEFAULT_LIST_HOUSING_URL: &str = "https://tally.so/r/mBMGOR";

/// Account application configuration
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Page session cookie name
    pub page_session_cookie_name: String,
    /// Secret key for HMAC-signing page session cookies (32 bytes)
    pub page_session_secret: [u8; 32],
    /// Idle time after which a page session is evicted (12 hours)
    pub page_session_ttl: Duration,
    /// Idle time for page sessions with nobody signed in (30 minutes)
    pub anonymous_session_ttl: Duration,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Public origin of the landing page, used in referral links
    pub page_origin: String,
    /// Path of the landing page, used in referral links
    pub page_path: String,
    /// "Find housing" form
    pub find_housing_url: String,
    /// "List housing" form
    pub list_housing_url: String,
    /// Write attempts before giving up on referral code collisions
    pub referral_code_attempts: u32,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            page_session_cookie_name: "page_session".to_string(),
            page_session_secret: [0u8; 32],
            page_session_ttl: Duration::from_secs(12 * 3600), // 12 hours
            anonymous_session_ttl: Duration::from_secs(30 * 60),
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            page_origin: "http://localhost:40922".to_string(),
            page_path: "/".to_string(),
            find_housing_url: DEFAULT_FIND_HOUSING_URL.to_string(),
            list_housing_url: DEFAULT_LIST_HOUSING_URL.to_string(),
            referral_code_attempts: 5,
        }
    }
}

impl AccountConfig {
    /// Create config with a random page session secret (for development)
    pub fn with_random_secret() -> Self {
        Self {
            page_session_secret: platform::crypto::random_secret(),
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secret()
        }
    }

    /// Page session TTL in milliseconds
    pub fn page_session_ttl_ms(&self) -> i64 {
        self.page_session_ttl.as_millis() as i64
    }

    pub fn anonymous_session_ttl_ms(&self) -> i64 {
        self.anonymous_session_ttl.as_millis() as i64
    }

    /// Cookie settings for the page session
    pub fn page_session_cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.page_session_cookie_name.clone(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
            path: "/".to_string(),
            max_age: Some(self.page_session_ttl),
        }
    }
}
