//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` (or an open transaction) as the first argument.

pub mod audit_event_repo;
pub mod document_repo;
pub mod language_repo;
pub mod onboarding_repo;
pub mod preferences_repo;
pub mod profile_repo;
pub mod skill_repo;
pub mod work_history_repo;

pub use audit_event_repo::AuditEventRepo;
pub use document_repo::DocumentRepo;
pub use language_repo::LanguageRepo;
pub use onboarding_repo::OnboardingRepo;
pub use preferences_repo::PreferencesRepo;
pub use profile_repo::ProfileRepo;
pub use skill_repo::SkillRepo;
pub use work_history_repo::WorkHistoryRepo;
