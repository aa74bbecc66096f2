//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod ensure_profile;
pub mod projection;
pub mod provider_sign_in;
pub mod referral_link;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;

// Re-exports
pub use config::AccountConfig;
pub use ensure_profile::{EnsureProfileUseCase, ProfileOutcome};
pub use projection::SessionProjection;
pub use provider_sign_in::{ProviderSignInOutput, ProviderSignInUseCase};
pub use referral_link::ReferralLink;
pub use sign_in::{SignInInput, SignInUseCase};
pub use sign_out::SignOutUseCase;
pub use sign_up::{SignUpInput, SignUpOutput, SignUpUseCase};
