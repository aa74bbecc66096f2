//! Infrastructure Layer
//!
//! Database implementations and external service integrations.

pub mod identity_toolkit;
pub mod memory;
pub mod postgres;

pub use identity_toolkit::{IdentityToolkitClient, IdentityToolkitConfig, IdentityToolkitGateway};
pub use memory::{MemoryIdentityDirectory, MemoryIdentityGateway, MemoryProfileRepository};
pub use postgres::PgProfileRepository;
