//! Wizard orchestration: the per-worker controller, debounced autosave,
//! the document sub-flow, and the storage/gateway backends that do not need
//! a database.

pub mod autosave;
pub mod config;
pub mod controller;
pub mod documents;
pub mod error;
pub mod local_storage;
pub mod memory;

pub use config::WizardConfig;
pub use controller::{WizardController, WizardDeps, WizardPhase, WizardView};
pub use error::WizardError;
