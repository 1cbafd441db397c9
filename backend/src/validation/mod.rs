//! Validation rules for request payloads.

pub mod rules;

pub use rules::{validate_not_blank, validate_user_name};
pub use validator::Validate;
