//! Identity Gateway
//!
//! The external identity service, seen from one user agent. A gateway
//! instance owns that visitor's tokens and current principal and notifies
//! subscribers on every sign-in / sign-out.

use tokio::sync::watch;

use crate::domain::entity::principal::Principal;
use crate::domain::value_object::{
    display_name::DisplayName, email::Email, password::Password,
};

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The service refused the request (message passed through verbatim)
    #[error("{0}")]
    Credential(String),

    /// Network failure, timeout, or 5xx from the service
    #[error("Identity service unavailable: {0}")]
    Unavailable(String),

    /// The call needs a signed-in principal
    #[error("Not signed in")]
    NotSignedIn,
}

/// Token obtained from a federated provider (OAuth) by the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredential {
    /// e.g. `google.com`
    pub provider_id: String,
    pub token: ProviderToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderToken {
    IdToken(String),
    AccessToken(String),
}

impl ProviderToken {
    pub fn value(&self) -> &str {
        match self {
            ProviderToken::IdToken(t) | ProviderToken::AccessToken(t) => t,
        }
    }

    /// Form-field name used in the provider post body
    pub fn field_name(&self) -> &'static str {
        match self {
            ProviderToken::IdToken(_) => "id_token",
            ProviderToken::AccessToken(_) => "access_token",
        }
    }
}

impl ProviderCredential {
    /// `None` when the provider id or the token is empty
    pub fn new(provider_id: impl Into<String>, token: ProviderToken) -> Option<Self> {
        let provider_id = provider_id.into();
        if provider_id.trim().is_empty() || token.value().trim().is_empty() {
            return None;
        }
        Some(Self { provider_id, token })
    }

    /// Form-encoded `id_token=...&providerId=...`
    pub fn post_body(&self) -> GatewayResult<String> {
        serde_urlencoded::to_string([
            (self.token.field_name(), self.token.value()),
            ("providerId", self.provider_id.as_str()),
        ])
        .map_err(|e| GatewayError::Credential(format!("Invalid provider credential: {e}")))
    }
}

/// Outcome of a federated sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSignIn {
    pub principal: Principal,
    /// The provider account was linked for the first time
    pub is_new_account: bool,
}

/// Identity gateway trait
#[trait_variant::make(IdentityGateway: Send)]
pub trait LocalIdentityGateway {
    /// Create an email/password account and sign it in
    async fn register(&self, email: &Email, password: &Password) -> GatewayResult<Principal>;

    /// Sign in with email/password
    async fn authenticate(&self, email: &Email, password: &Password) -> GatewayResult<Principal>;

    /// Sign in with a federated provider credential
    async fn authenticate_with_provider(
        &self,
        credential: &ProviderCredential,
    ) -> GatewayResult<ProviderSignIn>;

    /// Set the display name of the signed-in principal
    async fn set_display_name(&self, name: &DisplayName) -> GatewayResult<Principal>;

    /// Drop the session
    async fn sign_out(&self) -> GatewayResult<()>;

    /// Auth-state notifications; the current value is the signed-in
    /// principal, `None` when signed out
    fn subscribe(&self) -> watch::Receiver<Option<Principal>>;
}

/// Opens one gateway instance per visitor
pub trait GatewayFactory: Send + Sync + 'static {
    type Gateway: IdentityGateway + Send + Sync + 'static;

    fn open(&self) -> Self::Gateway;
}
