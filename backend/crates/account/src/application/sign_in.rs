//! Sign In Use Case

use std::sync::Arc;

use crate::domain::entity::principal::Principal;
use crate::domain::gateway::IdentityGateway;
use crate::domain::value_object::{email::Email, password::Password};
use crate::error::{AccountError, AccountResult};

/// Sign in input
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

/// Sign in use case
pub struct SignInUseCase<G>
where
    G: IdentityGateway,
{
    gateway: Arc<G>,
}

impl<G> SignInUseCase<G>
where
    G: IdentityGateway,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub async fn execute(&self, input: SignInInput) -> AccountResult<Principal> {
        let email = Email::new(input.email)
            .map_err(|e| AccountError::Credential(e.message().to_string()))?;
        let password = Password::new(input.password)
            .map_err(|e| AccountError::Credential(e.message().to_string()))?;

        let principal = self.gateway.authenticate(&email, &password).await?;

        tracing::info!(principal_id = %principal.id, "Signed in");

        Ok(principal)
    }
}
