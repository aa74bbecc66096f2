//! Provider Sign In Use Case
//!
//! Federated sign-in. Referral attribution runs only for accounts the
//! provider links for the first time.

use std::sync::Arc;

use crate::application::config::AccountConfig;
use crate::application::ensure_profile::{EnsureProfileUseCase, ProfileOutcome};
use crate::domain::entity::principal::Principal;
use crate::domain::gateway::{IdentityGateway, ProviderCredential};
use crate::domain::repository::ProfileRepository;
use crate::domain::value_object::{display_name::DisplayName, referral_code::ReferrerCode};
use crate::error::AccountResult;

/// Provider sign in output
pub struct ProviderSignInOutput {
    pub principal: Principal,
    pub is_new_account: bool,
    /// `None` when attribution did not run
    pub profile: Option<ProfileOutcome>,
}

/// Provider sign in use case
pub struct ProviderSignInUseCase<G, P>
where
    G: IdentityGateway,
    P: ProfileRepository,
{
    gateway: Arc<G>,
    ensure_profile: EnsureProfileUseCase<P>,
}

impl<G, P> ProviderSignInUseCase<G, P>
where
    G: IdentityGateway,
    P: ProfileRepository,
{
    pub fn new(gateway: Arc<G>, profiles: Arc<P>, config: Arc<AccountConfig>) -> Self {
        Self {
            gateway,
            ensure_profile: EnsureProfileUseCase::new(profiles, config),
        }
    }

    pub async fn execute(
        &self,
        credential: &ProviderCredential,
        referrer: Option<&ReferrerCode>,
    ) -> AccountResult<ProviderSignInOutput> {
        let signed_in = self.gateway.authenticate_with_provider(credential).await?;
        let principal = signed_in.principal;

        tracing::info!(
            principal_id = %principal.id,
            provider = %credential.provider_id,
            is_new_account = signed_in.is_new_account,
            "Signed in with provider"
        );

        if !signed_in.is_new_account {
            return Ok(ProviderSignInOutput {
                principal,
                is_new_account: false,
                profile: None,
            });
        }

        let Some(display_name) = principal
            .display_name
            .as_deref()
            .and_then(DisplayName::from_provider)
        else {
            tracing::warn!(
                principal_id = %principal.id,
                provider = %credential.provider_id,
                "Provider sent no display name, skipping profile creation"
            );
            return Ok(ProviderSignInOutput {
                principal,
                is_new_account: true,
                profile: None,
            });
        };

        let profile = self
            .ensure_profile
            .execute(&principal, &display_name, referrer)
            .await?;

        Ok(ProviderSignInOutput {
            principal,
            is_new_account: true,
            profile: Some(profile),
        })
    }
}
