//! Referral Link
//!
//! `<origin><path>?ref=<code>`, the link a signed-in visitor shares.

use std::fmt;

use crate::domain::value_object::referral_code::ReferralCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralLink(String);

impl ReferralLink {
    pub fn new(origin: &str, path: &str, code: &ReferralCode) -> Self {
        let origin = origin.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Self(format!("{origin}/{path}?ref={code}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferralLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ReferralLink> for String {
    fn from(link: ReferralLink) -> Self {
        link.0
    }
}
