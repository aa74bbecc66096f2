//! Value Object Module

pub mod display_name;
pub mod email;
pub mod password;
pub mod principal_id;
pub mod referral_code;
