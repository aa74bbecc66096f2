//! Sign Out Use Case

use std::sync::Arc;

use crate::domain::gateway::IdentityGateway;

/// Sign out use case
pub struct SignOutUseCase<G>
where
    G: IdentityGateway,
{
    gateway: Arc<G>,
}

impl<G> SignOutUseCase<G>
where
    G: IdentityGateway,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Failures are logged only; the auth state stays as it was
    pub async fn execute(&self) {
        match self.gateway.sign_out().await {
            Ok(()) => tracing::info!("Signed out"),
            Err(e) => tracing::error!(error = %e, "Sign out failed"),
        }
    }
}
