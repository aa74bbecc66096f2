//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, HMAC-signed tokens, Base64)
//! - Cookie management
//! - Outbound HTTP client construction

pub mod cookie;
pub mod crypto;
pub mod http_client;
