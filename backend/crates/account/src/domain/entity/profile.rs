//! Profile Entity
//!
//! Application-level record for one principal, keyed by principal id.
//! Created once by the referral attribution flow and never mutated by it.

use chrono::{DateTime, Utc};

use crate::domain::entity::principal::Principal;
use crate::domain::value_object::{
    display_name::DisplayName, email::Email, principal_id::PrincipalId,
    referral_code::ReferralCode,
};

/// Stored profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub principal_id: PrincipalId,
    pub display_name: DisplayName,
    /// Copied from the principal at creation
    pub email: Option<Email>,
    /// Assigned by the store on insert
    pub created_at: DateTime<Utc>,
    pub referral_code: ReferralCode,
    /// Principal whose referral code was used at signup
    pub referred_by: Option<PrincipalId>,
}

/// Profile about to be written; `created_at` is left to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub principal_id: PrincipalId,
    pub display_name: DisplayName,
    pub email: Option<Email>,
    pub referral_code: ReferralCode,
    pub referred_by: Option<PrincipalId>,
}

impl NewProfile {
    pub fn new(
        principal: &Principal,
        display_name: DisplayName,
        referral_code: ReferralCode,
        referred_by: Option<PrincipalId>,
    ) -> Self {
        Self {
            principal_id: principal.id.clone(),
            display_name,
            email: principal.email.clone(),
            referral_code,
            referred_by,
        }
    }

    /// Same profile with another code (after a collision)
    pub fn with_referral_code(mut self, referral_code: ReferralCode) -> Self {
        self.referral_code = referral_code;
        self
    }

    pub fn into_profile(self, created_at: DateTime<Utc>) -> Profile {
        Profile {
            principal_id: self.principal_id,
            display_name: self.display_name,
            email: self.email,
            created_at,
            referral_code: self.referral_code,
            referred_by: self.referred_by,
        }
    }
}
