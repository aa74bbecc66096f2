//! Account Router

use axum::{
    Router,
    routing::{get, post},
};

use crate::domain::gateway::GatewayFactory;
use crate::domain::repository::ProfileRepository;
use crate::infra::identity_toolkit::IdentityToolkitClient;
use crate::infra::postgres::PgProfileRepository;
use crate::presentation::handlers::{self, AccountAppState};

/// Create the Account router with the identity service client and PostgreSQL store
pub fn account_router(state: AccountAppState<IdentityToolkitClient, PgProfileRepository>) -> Router {
    account_router_generic(state)
}

/// Create a generic Account router for any gateway / repository implementation
pub fn account_router_generic<F, P>(state: AccountAppState<F, P>) -> Router
where
    F: GatewayFactory,
    P: ProfileRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/page", get(handlers::page::<F, P>))
        .route("/account/signup", post(handlers::sign_up::<F, P>))
        .route("/account/signin", post(handlers::sign_in::<F, P>))
        .route("/account/provider", post(handlers::provider_sign_in::<F, P>))
        .route("/account/signout", post(handlers::sign_out::<F, P>))
        .route("/referral/link", get(handlers::referral_link_handler::<F, P>))
        .with_state(state)
}
