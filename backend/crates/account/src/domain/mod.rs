//! Domain Layer
//!
//! Contains entities, value objects, the profile repository trait and the
//! identity gateway trait.

pub mod entity;
pub mod gateway;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{NewProfile, Principal, Profile, SessionView};
pub use gateway::{GatewayFactory, IdentityGateway};
pub use repository::{CreateOutcome, ProfileRepository};
