//! Row models for the onboarding tables.
//!
//! Each row type mirrors one table. Conversions into the core step types
//! parse the text enums stored in the database and fail with a
//! `CoreError::Validation` if a value is unknown.

pub mod audit;
pub mod document;
pub mod language;
pub mod onboarding;
pub mod preferences;
pub mod profile;
pub mod skill;
pub mod work_history;
