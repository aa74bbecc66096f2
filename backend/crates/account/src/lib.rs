//! Account Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository and gateway traits
//! - `application/` - Use cases (signup, sign-in, referral attribution, projection)
//! - `infra/` - PostgreSQL profile store, identity gateway client, in-memory doubles
//! - `presentation/` - HTTP handlers, DTOs, page sessions, router
//!
//! ## Features
//! - Signup/sign-in with email + password, or with a federated provider
//! - One profile per principal, created exactly once after registration
//! - Referral codes (6 chars, `[0-9A-Z]`) and referrer attribution
//! - Per-visitor session projection merging principal and profile
//!
//! ## Consistency Model
//! - Profile creation is a single conditional write (create-if-absent)
//! - Referral codes are unique by index; collisions regenerate the code
//! - Unknown referrer codes are ignored, never reported

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::AccountConfig;
pub use error::{AccountError, AccountResult};
pub use infra::identity_toolkit::{IdentityToolkitClient, IdentityToolkitConfig};
pub use infra::postgres::PgProfileRepository;
pub use presentation::handlers::AccountAppState;
pub use presentation::router::{account_router, account_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod store {
    pub use crate::infra::memory::{MemoryIdentityDirectory, MemoryProfileRepository};
    pub use crate::infra::postgres::PgProfileRepository as ProfileStore;
}

#[cfg(test)]
mod tests;
