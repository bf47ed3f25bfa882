//! Domain core for worker onboarding.
//!
//! Holds the wizard step model, per-step validators, upload checks and the
//! two seams (`OnboardingGateway`, `ObjectStorage`) the orchestration layer
//! talks through. This crate has no database or HTTP dependencies.

pub mod audit;
pub mod error;
pub mod gateway;
pub mod onboarding_wizard;
pub mod rate_limit;
pub mod roles;
pub mod signing;
pub mod steps;
pub mod storage;
pub mod types;
pub mod uploads;
