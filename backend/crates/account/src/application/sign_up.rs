//! Sign Up Use Case
//!
//! Registers an email/password account, sets its display name and runs
//! referral attribution.

use std::sync::Arc;

use crate::application::config::AccountConfig;
use crate::application::ensure_profile::{EnsureProfileUseCase, ProfileOutcome};
use crate::domain::entity::principal::Principal;
use crate::domain::gateway::IdentityGateway;
use crate::domain::repository::ProfileRepository;
use crate::domain::value_object::{
    display_name::DisplayName, email::Email, password::Password, referral_code::ReferrerCode,
};
use crate::error::{AccountError, AccountResult};

/// Sign up input
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// Sign up output
pub struct SignUpOutput {
    pub principal: Principal,
    pub profile: ProfileOutcome,
}

/// Sign up use case
pub struct SignUpUseCase<G, P>
where
    G: IdentityGateway,
    P: ProfileRepository,
{
    gateway: Arc<G>,
    ensure_profile: EnsureProfileUseCase<P>,
}

impl<G, P> SignUpUseCase<G, P>
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

    /// A failure after registration leaves the account registered and
    /// signed in; the caller reports it and the profile stays missing.
    pub async fn execute(
        &self,
        input: SignUpInput,
        referrer: Option<&ReferrerCode>,
    ) -> AccountResult<SignUpOutput> {
        // Name first: nothing reaches the gateway without one
        let display_name = DisplayName::new(&input.display_name)
            .map_err(|e| AccountError::InvalidInput(e.to_string()))?;

        let email = Email::new(input.email)
            .map_err(|e| AccountError::Credential(e.message().to_string()))?;
        let password = Password::new(input.password)
            .map_err(|e| AccountError::Credential(e.message().to_string()))?;

        let principal = self.gateway.register(&email, &password).await?;
        tracing::info!(principal_id = %principal.id, "Account registered");

        let principal = self.gateway.set_display_name(&display_name).await?;

        let profile = self
            .ensure_profile
            .execute(&principal, &display_name, referrer)
            .await?;

        Ok(SignUpOutput { principal, profile })
    }
}
