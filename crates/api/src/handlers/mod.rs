pub mod files;
pub mod onboarding;
