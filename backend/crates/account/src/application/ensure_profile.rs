//! Ensure Profile Use Case
//!
//! Creates the profile of a freshly registered principal: resolves the
//! referrer, issues a referral code and writes the profile once.

use std::sync::Arc;

use crate::application::config::AccountConfig;
use crate::domain::entity::{principal::Principal, profile::NewProfile, profile::Profile};
use crate::domain::repository::{CreateOutcome, ProfileRepository};
use crate::domain::value_object::{
    display_name::DisplayName,
    principal_id::PrincipalId,
    referral_code::{RandomReferralCodes, ReferralCodeSource, ReferrerCode},
};
use crate::error::{AccountError, AccountResult};

/// What `ensure_profile` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOutcome {
    Created(Profile),
    /// The principal already had a profile; nothing was written
    AlreadyExists,
}

impl ProfileOutcome {
    pub fn created(&self) -> Option<&Profile> {
        match self {
            ProfileOutcome::Created(profile) => Some(profile),
            ProfileOutcome::AlreadyExists => None,
        }
    }
}

/// Ensure profile use case
pub struct EnsureProfileUseCase<P>
where
    P: ProfileRepository,
{
    profiles: Arc<P>,
    config: Arc<AccountConfig>,
    codes: Arc<dyn ReferralCodeSource>,
}

impl<P> EnsureProfileUseCase<P>
where
    P: ProfileRepository,
{
    pub fn new(profiles: Arc<P>, config: Arc<AccountConfig>) -> Self {
        Self::with_code_source(profiles, config, Arc::new(RandomReferralCodes))
    }

    pub fn with_code_source(
        profiles: Arc<P>,
        config: Arc<AccountConfig>,
        codes: Arc<dyn ReferralCodeSource>,
    ) -> Self {
        Self {
            profiles,
            config,
            codes,
        }
    }

    pub async fn execute(
        &self,
        principal: &Principal,
        display_name: &DisplayName,
        referrer: Option<&ReferrerCode>,
    ) -> AccountResult<ProfileOutcome> {
        // Fast path; the conditional write below is what guarantees uniqueness
        if self.profiles.find_by_principal(&principal.id).await?.is_some() {
            tracing::debug!(principal_id = %principal.id, "Profile already exists");
            return Ok(ProfileOutcome::AlreadyExists);
        }

        let referred_by = self.resolve_referrer(referrer).await?;

        let mut profile = NewProfile::new(
            principal,
            display_name.clone(),
            self.codes.next_code(),
            referred_by,
        );

        for attempt in 1..=self.config.referral_code_attempts.max(1) {
            match self.profiles.create_if_absent(&profile).await? {
                CreateOutcome::Created(created) => {
                    tracing::info!(
                        principal_id = %created.principal_id,
                        referral_code = %created.referral_code,
                        referred_by = ?created.referred_by.as_ref().map(PrincipalId::as_str),
                        "Profile created"
                    );
                    return Ok(ProfileOutcome::Created(created));
                }
                CreateOutcome::PrincipalExists => {
                    tracing::info!(
                        principal_id = %principal.id,
                        "Profile created concurrently, keeping the first one"
                    );
                    return Ok(ProfileOutcome::AlreadyExists);
                }
                CreateOutcome::ReferralCodeTaken => {
                    tracing::warn!(
                        principal_id = %principal.id,
                        referral_code = %profile.referral_code,
                        attempt,
                        "Referral code collision, regenerating"
                    );
                    profile = profile.with_referral_code(self.codes.next_code());
                }
            }
        }

        Err(AccountError::ReferralCodeExhausted)
    }

    /// Unknown codes attribute nothing
    async fn resolve_referrer(
        &self,
        referrer: Option<&ReferrerCode>,
    ) -> AccountResult<Option<PrincipalId>> {
        let Some(code) = referrer else {
            return Ok(None);
        };

        match self.profiles.find_by_referral_code(code.as_str()).await? {
            Some(referrer_profile) => {
                tracing::debug!(
                    referral_code = %code,
                    referrer = %referrer_profile.principal_id,
                    "Referrer resolved"
                );
                Ok(Some(referrer_profile.principal_id))
            }
            None => {
                tracing::debug!(referral_code = %code, "Unknown referrer code ignored");
                Ok(None)
            }
        }
    }
}
