//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, HMAC, random tokens and codes)
//! - Password hashing (Argon2id) and strength policy
//! - Cookie management
//! - Client IP extraction
//! - Fixed-window rate limiting

pub mod client;
pub mod cookie;
pub mod crypto;
pub mod password;
pub mod rate_limit;
