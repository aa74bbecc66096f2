//! Session View
//!
//! Merged principal + profile view exposed to the page while signed in.

use crate::domain::entity::{principal::Principal, profile::Profile};
use crate::domain::value_object::{
    email::Email, principal_id::PrincipalId, referral_code::ReferralCode,
};

/// Shown while the profile does not exist yet
pub const REFERRAL_CODE_PLACEHOLDER: &str = "GENERATING...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralCodeView {
    Ready(ReferralCode),
    /// Profile missing: attribution still running or failed
    Generating,
}

impl ReferralCodeView {
    pub fn as_str(&self) -> &str {
        match self {
            ReferralCodeView::Ready(code) => code.as_str(),
            ReferralCodeView::Generating => REFERRAL_CODE_PLACEHOLDER,
        }
    }

    pub fn ready(&self) -> Option<&ReferralCode> {
        match self {
            ReferralCodeView::Ready(code) => Some(code),
            ReferralCodeView::Generating => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub id: PrincipalId,
    pub email: Option<Email>,
    pub display_name: Option<String>,
    pub referral_code: ReferralCodeView,
}

impl SessionView {
    /// Principal fields win; the profile fills gaps and supplies the code.
    pub fn merge(principal: &Principal, profile: Option<&Profile>) -> Self {
        let display_name = principal
            .display_name
            .clone()
            .or_else(|| profile.map(|p| p.display_name.as_str().to_string()));
        let email = principal
            .email
            .clone()
            .or_else(|| profile.and_then(|p| p.email.clone()));
        let referral_code = match profile {
            Some(p) => ReferralCodeView::Ready(p.referral_code.clone()),
            None => ReferralCodeView::Generating,
        };

        Self {
            id: principal.id.clone(),
            email,
            display_name,
            referral_code,
        }
    }

    /// Name for the greeting: display name, else email
    pub fn greeting_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .or_else(|| self.email.as_ref().map(Email::as_str))
    }
}
