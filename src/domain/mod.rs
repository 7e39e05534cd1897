//! Domain layer types and invariants.

pub mod comments;
pub mod entities;
pub mod error;
pub mod onboarding;
pub mod posts;
pub mod types;
pub mod validation;
