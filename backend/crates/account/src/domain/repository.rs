//! Repository Traits
//!
//! Interfaces for profile persistence. Implementations are in the
//! infrastructure layer.

use crate::domain::entity::profile::{NewProfile, Profile};
use crate::domain::value_object::principal_id::PrincipalId;
use crate::error::AccountResult;

/// Result of a conditional profile write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Written; carries the stored row (with its store-assigned timestamp)
    Created(Profile),
    /// The principal already has a profile; nothing was written
    PrincipalExists,
    /// Another profile owns the referral code; nothing was written
    ReferralCodeTaken,
}

/// Profile repository trait
///
/// Invariants the store must enforce:
/// - at most one profile per principal id
/// - at most one profile per referral code (secondary index)
#[trait_variant::make(ProfileRepository: Send)]
pub trait LocalProfileRepository {
    /// Find the profile owned by a principal
    async fn find_by_principal(&self, principal_id: &PrincipalId) -> AccountResult<Option<Profile>>;

    /// Create the profile unless the principal already has one.
    /// Must be a single atomic write.
    async fn create_if_absent(&self, profile: &NewProfile) -> AccountResult<CreateOutcome>;

    /// Exact-match lookup through the referral code index
    async fn find_by_referral_code(&self, code: &str) -> AccountResult<Option<Profile>>;
}
