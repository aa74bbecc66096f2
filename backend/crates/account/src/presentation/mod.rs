//! Presentation Layer
//!
//! HTTP handlers, DTOs, page sessions and routing.

pub mod dto;
pub mod handlers;
pub mod page_session;
pub mod router;

pub use handlers::AccountAppState;
pub use page_session::{PageSession, PageSessions};
pub use router::{account_router, account_router_generic};
