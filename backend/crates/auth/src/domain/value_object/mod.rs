//! Value Object Module

pub mod auth_provider;
pub mod email;
pub mod one_time_code;
pub mod person_name;
pub mod user_id;
pub mod user_password;
