//! Entity Module

pub mod principal;
pub mod profile;
pub mod session_view;

pub use principal::Principal;
pub use profile::{NewProfile, Profile};
pub use session_view::{ReferralCodeView, SessionView};
