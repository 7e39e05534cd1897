//! Boundary adapters and runtime bootstrap.

pub mod error;
pub mod memory;
pub mod onboarding;
pub mod remote;
pub mod telemetry;
