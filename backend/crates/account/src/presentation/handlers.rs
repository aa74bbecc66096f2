//! HTTP Handlers

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use kernel::id::PageSessionId;
use platform::cookie::extract_cookie;
use platform::crypto::{sign_token, verify_token};

use crate::application::config::AccountConfig;
use crate::application::{
    ProviderSignInUseCase, ReferralLink, SignInInput, SignInUseCase, SignOutUseCase, SignUpInput,
    SignUpUseCase,
};
use crate::domain::entity::session_view::SessionView;
use crate::domain::gateway::{GatewayFactory, ProviderCredential, ProviderToken};
use crate::domain::repository::ProfileRepository;
use crate::domain::value_object::referral_code::ReferrerCode;
use crate::error::{AccountError, AccountResult};
use crate::presentation::dto::{
    LinksDto, PageQuery, PageResponse, ProviderSignInRequest, ProviderSignInResponse,
    ReferralLinkResponse, SessionViewDto, SignInRequest, SignUpRequest, UserResponse,
};
use crate::presentation::page_session::{PageSession, PageSessions};

/// Shared state for account handlers
pub struct AccountAppState<F, P>
where
    F: GatewayFactory,
    P: ProfileRepository + Send + Sync + 'static,
{
    pub sessions: Arc<PageSessions<F, P>>,
    pub profiles: Arc<P>,
    pub config: Arc<AccountConfig>,
}

impl<F, P> AccountAppState<F, P>
where
    F: GatewayFactory,
    P: ProfileRepository + Send + Sync + 'static,
{
    pub fn new(factory: F, profiles: P, config: AccountConfig) -> Self {
        let profiles = Arc::new(profiles);
        Self {
            sessions: Arc::new(PageSessions::new(
                factory,
                profiles.clone(),
                config.page_session_ttl_ms(),
                config.anonymous_session_ttl_ms(),
            )),
            profiles,
            config: Arc::new(config),
        }
    }
}

// Derived Clone would require F: Clone and P: Clone
impl<F, P> Clone for AccountAppState<F, P>
where
    F: GatewayFactory,
    P: ProfileRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            profiles: self.profiles.clone(),
            config: self.config.clone(),
        }
    }
}

type SessionOf<F> = Arc<PageSession<<F as GatewayFactory>::Gateway>>;

// ============================================================================
// Page
// ============================================================================

/// GET /api/page
pub async fn page<F, P>(
    State(state): State<AccountAppState<F, P>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response
where
    F: GatewayFactory,
    P: ProfileRepository + Send + Sync + 'static,
{
    let (session, new_cookie) = match find_session(&state, &headers).await {
        Some(session) => (session, None),
        None => {
            let session = state.sessions.open().await;
            let token = sign_token(&state.config.page_session_secret, &session.id().to_string());
            let cookie = state.config.page_session_cookie().set_cookie_header(&token);
            (session, Some(cookie))
        }
    };

    // Each page load carries its own `ref`, or none
    session
        .set_referrer(ReferrerCode::from_query(query.referrer.as_deref()))
        .await;

    let view = session.projection().refresh().await;

    let body = PageResponse {
        user: view.as_ref().map(SessionViewDto::from),
        links: LinksDto {
            find_housing: state.config.find_housing_url.clone(),
            list_housing: state.config.list_housing_url.clone(),
        },
        referral_link: view
            .as_ref()
            .and_then(|v| referral_link(&state.config, v))
            .map(String::from),
    };

    match new_cookie {
        Some(cookie) => ([(header::SET_COOKIE, cookie)], Json(body)).into_response(),
        None => Json(body).into_response(),
    }
}

// ============================================================================
// Sign Up
// ============================================================================

/// POST /api/account/signup
pub async fn sign_up<F, P>(
    State(state): State<AccountAppState<F, P>>,
    headers: HeaderMap,
    Json(req): Json<SignUpRequest>,
) -> AccountResult<Json<UserResponse>>
where
    F: GatewayFactory,
    P: ProfileRepository + Send + Sync + 'static,
{
    let session = require_session(&state, &headers).await?;
    let referrer = session.referrer().await;

    let use_case =
        SignUpUseCase::new(session.gateway(), state.profiles.clone(), state.config.clone());

    let input = SignUpInput {
        email: req.email,
        password: req.password,
        display_name: req.display_name,
    };

    use_case.execute(input, referrer.as_ref()).await?;

    let view = session.projection().refresh().await;

    Ok(Json(UserResponse {
        user: view.as_ref().map(SessionViewDto::from),
    }))
}

// ============================================================================
// Sign In
// ============================================================================

/// POST /api/account/signin
pub async fn sign_in<F, P>(
    State(state): State<AccountAppState<F, P>>,
    headers: HeaderMap,
    Json(req): Json<SignInRequest>,
) -> AccountResult<Json<UserResponse>>
where
    F: GatewayFactory,
    P: ProfileRepository + Send + Sync + 'static,
{
    let session = require_session(&state, &headers).await?;

    let use_case = SignInUseCase::new(session.gateway());

    let input = SignInInput {
        email: req.email,
        password: req.password,
    };

    use_case.execute(input).await?;

    let view = session.projection().refresh().await;

    Ok(Json(UserResponse {
        user: view.as_ref().map(SessionViewDto::from),
    }))
}

/// POST /api/account/provider
pub async fn provider_sign_in<F, P>(
    State(state): State<AccountAppState<F, P>>,
    headers: HeaderMap,
    Json(req): Json<ProviderSignInRequest>,
) -> AccountResult<Json<ProviderSignInResponse>>
where
    F: GatewayFactory,
    P: ProfileRepository + Send + Sync + 'static,
{
    let session = require_session(&state, &headers).await?;

    let token = match (req.id_token, req.access_token) {
        (Some(id_token), _) => ProviderToken::IdToken(id_token),
        (None, Some(access_token)) => ProviderToken::AccessToken(access_token),
        (None, None) => {
            return Err(AccountError::InvalidInput(
                "Missing provider token".to_string(),
            ));
        }
    };
    let credential = ProviderCredential::new(req.provider_id, token)
        .ok_or_else(|| AccountError::InvalidInput("Invalid provider credential".to_string()))?;

    let referrer = session.referrer().await;
    let use_case = ProviderSignInUseCase::new(
        session.gateway(),
        state.profiles.clone(),
        state.config.clone(),
    );

    let output = use_case.execute(&credential, referrer.as_ref()).await?;

    let view = session.projection().refresh().await;

    Ok(Json(ProviderSignInResponse {
        user: view.as_ref().map(SessionViewDto::from),
        is_new_account: output.is_new_account,
    }))
}

// ============================================================================
// Sign Out
// ============================================================================

/// POST /api/account/signout
pub async fn sign_out<F, P>(
    State(state): State<AccountAppState<F, P>>,
    headers: HeaderMap,
) -> StatusCode
where
    F: GatewayFactory,
    P: ProfileRepository + Send + Sync + 'static,
{
    // No session means nothing to sign out of
    if let Some(session) = find_session(&state, &headers).await {
        SignOutUseCase::new(session.gateway()).execute().await;
        session.projection().refresh().await;
    }

    StatusCode::NO_CONTENT
}

// ============================================================================
// Referral Link
// ============================================================================

/// GET /api/referral/link
pub async fn referral_link_handler<F, P>(
    State(state): State<AccountAppState<F, P>>,
    headers: HeaderMap,
) -> AccountResult<Json<ReferralLinkResponse>>
where
    F: GatewayFactory,
    P: ProfileRepository + Send + Sync + 'static,
{
    let session = require_session(&state, &headers).await?;

    let view = session
        .projection()
        .refresh()
        .await
        .ok_or(AccountError::NotSignedIn)?;

    let link = referral_link(&state.config, &view).ok_or(AccountError::ReferralCodePending)?;

    tracing::debug!(principal_id = %view.id, "Referral link issued");

    Ok(Json(ReferralLinkResponse { link: link.into() }))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// `None` while the code is the placeholder
fn referral_link(config: &AccountConfig, view: &SessionView) -> Option<ReferralLink> {
    view.referral_code
        .ready()
        .map(|code| ReferralLink::new(&config.page_origin, &config.page_path, code))
}

async fn find_session<F, P>(state: &AccountAppState<F, P>, headers: &HeaderMap) -> Option<SessionOf<F>>
where
    F: GatewayFactory,
    P: ProfileRepository + Send + Sync + 'static,
{
    let token = extract_cookie(headers, &state.config.page_session_cookie_name)?;

    let payload = match verify_token(&state.config.page_session_secret, &token) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected page session cookie");
            return None;
        }
    };

    let id: PageSessionId = payload.parse().ok()?;
    state.sessions.get(&id).await
}

async fn require_session<F, P>(
    state: &AccountAppState<F, P>,
    headers: &HeaderMap,
) -> AccountResult<SessionOf<F>>
where
    F: GatewayFactory,
    P: ProfileRepository + Send + Sync + 'static,
{
    find_session(state, headers)
        .await
        .ok_or(AccountError::SessionInvalid)
}
