//! Identity Toolkit Gateway
//!
//! REST client for the managed identity service (Identity Toolkit v1).
//! Every call is a `POST {base_url}/accounts:{method}?key={api_key}`.
//! Sign-out is local: the gateway forgets its tokens.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};

use crate::domain::entity::principal::Principal;
use crate::domain::gateway::{
    GatewayError, GatewayFactory, GatewayResult, IdentityGateway, ProviderCredential,
    ProviderSignIn,
};
use crate::domain::value_object::{
    display_name::DisplayName, email::Email, password::Password, principal_id::PrincipalId,
};

pub const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Identity service connection parameters
#[derive(Clone)]
pub struct IdentityToolkitConfig {
    pub api_key: String,
    pub project_id: String,
    pub base_url: String,
    /// Redirect URI sent with provider sign-ins
    pub request_uri: Option<String>,
    pub timeout: Duration,
}

impl IdentityToolkitConfig {
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_uri: None,
            timeout: platform::http_client::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn request_uri(&self) -> String {
        self.request_uri
            .clone()
            .unwrap_or_else(|| format!("https://{}.firebaseapp.com/__/auth/handler", self.project_id))
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{}", self.base_url.trim_end_matches('/'), method)
    }
}

impl fmt::Debug for IdentityToolkitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityToolkitConfig")
            .field("api_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .field("request_uri", &self.request_uri)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Shared client; opens one gateway per visitor
#[derive(Clone)]
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    config: Arc<IdentityToolkitConfig>,
}

impl IdentityToolkitClient {
    pub fn new(config: IdentityToolkitConfig) -> Result<Self, reqwest::Error> {
        let http = platform::http_client::build_client(config.timeout)?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }
}

impl GatewayFactory for IdentityToolkitClient {
    type Gateway = IdentityToolkitGateway;

    fn open(&self) -> IdentityToolkitGateway {
        let (auth_tx, _) = watch::channel(None);
        IdentityToolkitGateway {
            http: self.http.clone(),
            config: self.config.clone(),
            tokens: Mutex::new(None),
            auth_tx,
        }
    }
}

/// One visitor's auth context
pub struct IdentityToolkitGateway {
    http: reqwest::Client,
    config: Arc<IdentityToolkitConfig>,
    tokens: Mutex<Option<TokenSession>>,
    auth_tx: watch::Sender<Option<Principal>>,
}

struct TokenSession {
    id_token: String,
    principal: Principal,
}

impl IdentityToolkitGateway {
    async fn call<B, R>(&self, method: &str, body: &B) -> GatewayResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.config.endpoint(method))
            .query(&[("key", self.config.api_key.as_str())])
            .json(body)
            .send()
            .await
            // The URL carries the API key
            .map_err(|e| GatewayError::Unavailable(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response.json::<R>().await.map_err(|e| {
                GatewayError::Unavailable(format!("Malformed response: {}", e.without_url()))
            });
        }

        let message = match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => envelope.error.message,
            Err(_) => status.to_string(),
        };

        tracing::debug!(method, status = status.as_u16(), message = %message, "Identity service refused request");

        if status.is_client_error() {
            Err(GatewayError::Credential(message))
        } else {
            Err(GatewayError::Unavailable(message))
        }
    }

    /// Store tokens and notify subscribers
    async fn signed_in(&self, id_token: String, principal: Principal) {
        *self.tokens.lock().await = Some(TokenSession {
            id_token,
            principal: principal.clone(),
        });
        self.auth_tx.send_replace(Some(principal));
    }
}

impl IdentityGateway for IdentityToolkitGateway {
    async fn register(&self, email: &Email, password: &Password) -> GatewayResult<Principal> {
        let body = PasswordRequest {
            email: email.as_str(),
            password: password.expose(),
            return_secure_token: true,
        };
        let response: AccountResponse = self.call("signUp", &body).await?;
        let (id_token, principal) = response.into_session()?;
        self.signed_in(id_token, principal.clone()).await;
        Ok(principal)
    }

    async fn authenticate(&self, email: &Email, password: &Password) -> GatewayResult<Principal> {
        let body = PasswordRequest {
            email: email.as_str(),
            password: password.expose(),
            return_secure_token: true,
        };
        let response: AccountResponse = self.call("signInWithPassword", &body).await?;
        let (id_token, principal) = response.into_session()?;
        self.signed_in(id_token, principal.clone()).await;
        Ok(principal)
    }

    async fn authenticate_with_provider(
        &self,
        credential: &ProviderCredential,
    ) -> GatewayResult<ProviderSignIn> {
        let body = IdpRequest {
            post_body: credential.post_body()?,
            request_uri: self.config.request_uri(),
            return_secure_token: true,
            return_idp_credential: true,
        };
        let response: AccountResponse = self.call("signInWithIdp", &body).await?;
        let is_new_account = response.is_new_user.unwrap_or(false);
        let (id_token, principal) = response.into_session()?;
        self.signed_in(id_token, principal.clone()).await;
        Ok(ProviderSignIn {
            principal,
            is_new_account,
        })
    }

    async fn set_display_name(&self, name: &DisplayName) -> GatewayResult<Principal> {
        let id_token = match self.tokens.lock().await.as_ref() {
            Some(session) => session.id_token.clone(),
            None => return Err(GatewayError::NotSignedIn),
        };

        let body = UpdateRequest {
            id_token: &id_token,
            display_name: name.as_str(),
            return_secure_token: true,
        };
        let response: AccountResponse = self.call("update", &body).await?;

        let mut tokens = self.tokens.lock().await;
        let Some(session) = tokens.as_mut() else {
            // Signed out while the update was in flight
            return Err(GatewayError::NotSignedIn);
        };
        if let Some(fresh) = response.id_token {
            session.id_token = fresh;
        }
        session.principal.display_name = Some(name.as_str().to_string());
        let principal = session.principal.clone();
        drop(tokens);

        self.auth_tx.send_replace(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        self.tokens.lock().await.take();
        self.auth_tx.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.auth_tx.subscribe()
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest {
    post_body: String,
    request_uri: String,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    is_new_user: Option<bool>,
}

impl AccountResponse {
    fn principal(&self) -> GatewayResult<Principal> {
        let id = PrincipalId::new(self.local_id.as_str())
            .map_err(|_| GatewayError::Unavailable("Malformed response: localId".to_string()))?;
        let email = self.email.as_deref().and_then(|e| Email::new(e).ok());
        Ok(Principal::new(id, email, self.display_name.clone()))
    }

    fn into_session(self) -> GatewayResult<(String, Principal)> {
        let principal = self.principal()?;
        let id_token = self
            .id_token
            .ok_or_else(|| GatewayError::Unavailable("Malformed response: idToken".to_string()))?;
        Ok((id_token, principal))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let config = IdentityToolkitConfig::new("key", "moscow-life").with_base_url("http://localhost:9099/v1/");
        assert_eq!(config.endpoint("signUp"), "http://localhost:9099/v1/accounts:signUp");
    }

    #[test]
    fn test_default_request_uri() {
        let config = IdentityToolkitConfig::new("key", "moscow-life");
        assert_eq!(
            config.request_uri(),
            "https://moscow-life.firebaseapp.com/__/auth/handler"
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = IdentityToolkitConfig::new("AIzaSecret", "moscow-life");
        assert!(!format!("{:?}", config).contains("AIzaSecret"));
    }

    #[test]
    fn test_account_response_parsing() {
        let json = r#"{
            "kind": "identitytoolkit#SignupNewUserResponse",
            "idToken": "tok",
            "email": "Anna@Example.com",
            "refreshToken": "r",
            "expiresIn": "3600",
            "localId": "Xk2mP0qLr8TzV1aBcDeFgHiJkL23"
        }"#;
        let response: AccountResponse = serde_json::from_str(json).unwrap();
        let (id_token, principal) = response.into_session().unwrap();
        assert_eq!(id_token, "tok");
        assert_eq!(principal.id.as_str(), "Xk2mP0qLr8TzV1aBcDeFgHiJkL23");
        assert_eq!(principal.email.unwrap().as_str(), "anna@example.com");
        assert!(principal.display_name.is_none());
    }

    #[test]
    fn test_error_envelope_parsing() {
        let json = r#"{"error":{"code":400,"message":"EMAIL_EXISTS","errors":[]}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error.message, "EMAIL_EXISTS");
    }

    #[tokio::test]
    async fn test_sign_out_notifies_subscribers() {
        let client = IdentityToolkitClient::new(IdentityToolkitConfig::new("key", "p")).unwrap();
        let gateway = client.open();
        let mut auth = gateway.subscribe();

        gateway
            .signed_in(
                "tok".to_string(),
                Principal::new(PrincipalId::new("uid-1").unwrap(), None, None),
            )
            .await;
        auth.changed().await.unwrap();
        assert!(auth.borrow_and_update().is_some());

        gateway.sign_out().await.unwrap();
        auth.changed().await.unwrap();
        assert!(auth.borrow().is_none());
    }

    #[tokio::test]
    async fn test_set_display_name_requires_session() {
        let client = IdentityToolkitClient::new(IdentityToolkitConfig::new("key", "p")).unwrap();
        let gateway = client.open();
        let name = DisplayName::new("Anna").unwrap();
        assert_eq!(
            gateway.set_display_name(&name).await,
            Err(GatewayError::NotSignedIn)
        );
    }
}
