//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

use crate::domain::entity::session_view::SessionView;

// ============================================================================
// Page
// ============================================================================

/// `GET /api/page` query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    /// Referrer code from the shared link
    #[serde(rename = "ref")]
    pub referrer: Option<String>,
}

/// Merged principal + profile view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionViewDto {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Display name, else email
    pub greeting_name: Option<String>,
    /// Ready code or the `GENERATING...` placeholder
    pub referral_code: String,
    pub referral_code_ready: bool,
}

impl From<&SessionView> for SessionViewDto {
    fn from(view: &SessionView) -> Self {
        Self {
            id: view.id.to_string(),
            email: view.email.as_ref().map(|e| e.as_str().to_string()),
            display_name: view.display_name.clone(),
            greeting_name: view.greeting_name().map(str::to_string),
            referral_code: view.referral_code.as_str().to_string(),
            referral_code_ready: view.referral_code.ready().is_some(),
        }
    }
}

/// Outbound form links
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinksDto {
    pub find_housing: String,
    pub list_housing: String,
}

/// Page state response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub user: Option<SessionViewDto>,
    pub links: LinksDto,
    /// Present once the referral code is ready
    pub referral_link: Option<String>,
}

// ============================================================================
// Account
// ============================================================================

/// Sign up request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
}

/// Sign in request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Federated sign in request; one of the tokens is required
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSignInRequest {
    pub provider_id: String,
    pub id_token: Option<String>,
    pub access_token: Option<String>,
}

/// Signed-in user response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user: Option<SessionViewDto>,
}

/// Federated sign in response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSignInResponse {
    pub user: Option<SessionViewDto>,
    pub is_new_account: bool,
}

// ============================================================================
// Referral
// ============================================================================

/// Referral link response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralLinkResponse {
    pub link: String,
}
