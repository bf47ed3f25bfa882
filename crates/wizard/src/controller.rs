//! The wizard controller: one per worker session.
//!
//! Owns the step pointer, the in-memory snapshot, the completed-step cache
//! and the per-step validity map. Step data is staged for a debounced save;
//! documents and the profile photo go straight through the document flow.
//!
//! A controller only exists once loaded: the `Loading` state of a session
//! is the time spent inside [`WizardController::initialize`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use workbridge_core::gateway::{GatewayError, OnboardingGateway, OnboardingRecord};
use workbridge_core::onboarding_wizard::{
    can_navigate_to, completion_percent, OnboardingStatus, WizardStep,
};
use workbridge_core::rate_limit::UploadRateLimiter;
use workbridge_core::steps::{
    DocumentEntry, DocumentType, ReviewData, StepData, ValidationContext, WizardSnapshot,
};
use workbridge_core::storage::{ObjectStorage, SignedUrl};
use workbridge_core::types::{DbId, Timestamp};

use crate::autosave::{Autosaver, SaveFailure, SaveIndicator, SaveJob};
use crate::config::WizardConfig;
use crate::documents::{DocumentFlow, UploadSlot};
use crate::error::WizardError;

/// Shared collaborators for every controller in a process.
#[derive(Clone)]
pub struct WizardDeps {
    pub gateway: Arc<dyn OnboardingGateway>,
    pub storage: Arc<dyn ObjectStorage>,
    pub limiter: Arc<UploadRateLimiter>,
    pub config: WizardConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardPhase {
    Ready,
    Submitting,
    Submitted,
}

/// Everything the client needs to render the wizard.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub onboarding_id: DbId,
    pub status: OnboardingStatus,
    pub phase: WizardPhase,
    pub current_step: WizardStep,
    pub current_step_number: u8,
    pub completed_steps: Vec<WizardStep>,
    pub completion_percent: u8,
    pub step_validity: BTreeMap<WizardStep, bool>,
    pub reachable_steps: Vec<WizardStep>,
    pub read_only: bool,
    pub can_submit: bool,
    pub save_indicator: SaveIndicator,
    pub upload_slots: BTreeMap<DocumentType, UploadSlot>,
    pub submitted_at: Option<Timestamp>,
    pub snapshot: WizardSnapshot,
}

pub struct WizardController {
    config: WizardConfig,
    gateway: Arc<dyn OnboardingGateway>,
    record: OnboardingRecord,
    phase: WizardPhase,
    current: WizardStep,
    snapshot: WizardSnapshot,
    completed: BTreeSet<WizardStep>,
    valid: BTreeMap<WizardStep, bool>,
    autosave: Autosaver,
    documents: DocumentFlow,
}

impl WizardController {
    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Load or create the worker's record and hydrate every step.
    ///
    /// `user_id` is `None` when there is no authenticated session.
    pub async fn initialize(deps: WizardDeps, user_id: Option<DbId>) -> Result<Self, WizardError> {
        let user_id = user_id.ok_or(WizardError::AuthRequired)?;

        let record = deps.gateway.load_or_create(user_id).await?;
        let snapshot = deps.gateway.hydrate(record.id).await?;
        let completed = snapshot.derive_completed_steps(record.status);
        let valid = completed.iter().map(|&step| (step, true)).collect();

        let read_only = deps.config.read_only_after_submit && !record.status.is_editable();
        let current = if read_only {
            WizardStep::Review
        } else {
            record.current_step
        };
        let phase = if record.status.is_editable() {
            WizardPhase::Ready
        } else {
            WizardPhase::Submitted
        };

        let autosave = Autosaver::new(
            Arc::clone(&deps.gateway),
            record.id,
            deps.config.autosave_delay,
            deps.config.saved_indicator_ttl,
        );
        let documents = DocumentFlow::new(
            Arc::clone(&deps.gateway),
            deps.storage,
            deps.limiter,
            deps.config.upload_limits.clone(),
            user_id,
            record.id,
            &snapshot.documents,
        );

        tracing::info!(
            onboarding_id = record.id,
            user_id,
            status = record.status.as_str(),
            step = %current,
            completed = completed.len(),
            "Onboarding loaded"
        );

        Ok(Self {
            config: deps.config,
            gateway: deps.gateway,
            record,
            phase,
            current,
            snapshot,
            completed,
            valid,
            autosave,
            documents,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn onboarding_id(&self) -> DbId {
        self.record.id
    }

    pub fn user_id(&self) -> DbId {
        self.record.user_id
    }

    pub fn status(&self) -> OnboardingStatus {
        self.record.status
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn current_step(&self) -> WizardStep {
        self.current
    }

    pub fn snapshot(&self) -> &WizardSnapshot {
        &self.snapshot
    }

    pub fn completed_steps(&self) -> &BTreeSet<WizardStep> {
        &self.completed
    }

    pub fn is_step_valid(&self, step: WizardStep) -> bool {
        self.valid.get(&step).copied().unwrap_or(false)
    }

    pub fn upload_slot(&self, document_type: DocumentType) -> &UploadSlot {
        self.documents.slot(document_type)
    }

    /// Whether [`WizardController::close`] has run. A closed controller
    /// refuses every change.
    pub fn is_closed(&self) -> bool {
        self.autosave.is_shut_down()
    }

    /// Whether edits are refused because the record has left `draft`.
    pub fn is_read_only(&self) -> bool {
        self.config.read_only_after_submit && !self.record.status.is_editable()
    }

    pub fn save_indicator(&self) -> SaveIndicator {
        self.autosave.indicator()
    }

    pub fn subscribe_save_indicator(&self) -> watch::Receiver<SaveIndicator> {
        self.autosave.subscribe()
    }

    /// Background save failures since the last call, for the client to toast.
    pub fn drain_save_failures(&self) -> Vec<SaveFailure> {
        self.autosave.drain_failures()
    }

    pub fn view(&self) -> WizardView {
        WizardView {
            onboarding_id: self.record.id,
            status: self.record.status,
            phase: self.phase,
            current_step: self.current,
            current_step_number: self.current.number(),
            completed_steps: self.completed.iter().copied().collect(),
            completion_percent: completion_percent(&self.completed),
            step_validity: WizardStep::ALL
                .into_iter()
                .map(|step| (step, self.is_step_valid(step)))
                .collect(),
            reachable_steps: WizardStep::ALL
                .into_iter()
                .filter(|&step| self.can_navigate_to(step))
                .collect(),
            read_only: self.is_read_only(),
            can_submit: self.can_submit(),
            save_indicator: self.autosave.indicator(),
            upload_slots: self.documents.slots().clone(),
            submitted_at: self.record.submitted_at,
            snapshot: self.snapshot.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    fn ensure_open(&self) -> Result<(), WizardError> {
        if self.is_closed() {
            return Err(WizardError::NotReady("session closed"));
        }
        Ok(())
    }

    fn ensure_editable(&self) -> Result<(), WizardError> {
        self.ensure_open()?;
        if self.phase == WizardPhase::Submitting {
            return Err(WizardError::NotReady("submission in progress"));
        }
        if self.is_read_only() {
            return Err(WizardError::ReadOnly {
                status: self.record.status,
            });
        }
        Ok(())
    }

    fn move_pointer(&mut self, target: WizardStep) {
        self.current = target;
        if !self.is_read_only() {
            self.autosave.schedule(SaveJob::CurrentStep(target));
        }
    }

    /// Replace storage keys in a client payload with the ones this session
    /// uploaded. The photo key comes only from [`Self::upload_profile_photo`];
    /// certification keys survive only if the stored certification carried
    /// the same key.
    fn with_owned_keys(&self, data: StepData) -> StepData {
        match data {
            StepData::Profile(mut profile) => {
                profile.profile_photo_key = self
                    .snapshot
                    .profile
                    .as_ref()
                    .and_then(|p| p.profile_photo_key.clone());
                StepData::Profile(profile)
            }
            StepData::Skills(mut skills) => {
                let known: BTreeSet<&str> = self
                    .snapshot
                    .skills
                    .iter()
                    .flat_map(|s| s.certifications.iter())
                    .filter_map(|c| c.file_key.as_deref())
                    .collect();
                for cert in &mut skills.certifications {
                    if cert.file_key.as_deref().is_some_and(|key| !known.contains(key)) {
                        cert.file_key = None;
                    }
                }
                StepData::Skills(skills)
            }
            other => other,
        }
    }

    /// Re-derive the Documents entries of the cache from the document map.
    fn sync_documents(&mut self) {
        let has_required = self.snapshot.documents.has_required();
        self.valid.insert(WizardStep::Documents, has_required);
        if has_required {
            self.completed.insert(WizardStep::Documents);
        } else {
            self.completed.remove(&WizardStep::Documents);
        }
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    /// Accept a step's submitted data.
    ///
    /// Valid data is merged into the snapshot, the step is marked valid and
    /// complete, and a save is staged. Completing the current step moves the
    /// pointer to the next one. Documents are validated from the stored map
    /// (the payload is ignored, uploads own that data). Review only stages
    /// the terms flag; it completes through [`WizardController::submit`].
    pub fn complete_step(&mut self, step: WizardStep, data: StepData) -> Result<(), WizardError> {
        self.ensure_editable()?;
        if data.step() != step {
            return Err(WizardError::StepMismatch {
                expected: step,
                actual: data.step(),
            });
        }
        let data = self.with_owned_keys(data);

        let ctx = ValidationContext::now();
        let errors = match &data {
            StepData::Documents(_) => self.snapshot.validate_step(WizardStep::Documents, &ctx),
            other => self.snapshot.validate_candidate(other, &ctx),
        };

        if step == WizardStep::Review {
            if let StepData::Review(review) = data {
                self.snapshot.review = Some(review);
            }
            self.valid.insert(step, errors.is_empty());
            return if errors.is_empty() {
                Ok(())
            } else {
                Err(WizardError::ValidationFailed { step, errors })
            };
        }

        if !errors.is_empty() {
            self.valid.insert(step, false);
            return Err(WizardError::ValidationFailed { step, errors });
        }

        if !matches!(data, StepData::Documents(_)) {
            self.snapshot.merge(data.clone());
        }
        self.valid.insert(step, true);
        self.completed.insert(step);
        if step.autosaves() {
            self.autosave.schedule(SaveJob::Step(data));
        }

        tracing::info!(onboarding_id = self.record.id, step = %step, "Step completed");

        if step == self.current {
            if let Some(next) = step.next() {
                self.move_pointer(next);
            }
        }
        Ok(())
    }

    /// Record the live validity a step reports while the worker edits.
    pub fn set_step_validity(&mut self, step: WizardStep, is_valid: bool) {
        self.valid.insert(step, is_valid);
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    pub fn can_navigate_to(&self, target: WizardStep) -> bool {
        can_navigate_to(
            target,
            self.current,
            &self.completed,
            self.is_step_valid(self.current),
        )
    }

    pub fn navigate_to(&mut self, target: WizardStep) -> Result<(), WizardError> {
        self.ensure_open()?;
        if self.phase == WizardPhase::Submitting {
            return Err(WizardError::NotReady("submission in progress"));
        }
        if !self.can_navigate_to(target) {
            return Err(WizardError::NavigationBlocked {
                from: self.current,
                to: target,
            });
        }
        if target != self.current {
            tracing::debug!(
                onboarding_id = self.record.id,
                from = %self.current,
                to = %target,
                "Navigated"
            );
            self.move_pointer(target);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Documents and photo
    // -----------------------------------------------------------------------

    pub async fn upload_document(
        &mut self,
        document_type: DocumentType,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<DocumentEntry, WizardError> {
        self.ensure_editable()?;
        let previous = self.snapshot.documents.get(document_type).cloned();
        let entry = self
            .documents
            .upload(document_type, file_name, bytes, previous.as_ref())
            .await?;
        self.snapshot.documents.insert(entry.clone());
        self.sync_documents();
        Ok(entry)
    }

    /// Delete a document; may flip the Documents step back to invalid.
    pub async fn remove_document(&mut self, document_type: DocumentType) -> Result<bool, WizardError> {
        self.ensure_editable()?;
        let existed = self.documents.remove(document_type).await?;
        self.snapshot.documents.remove(document_type);
        self.sync_documents();
        Ok(existed)
    }

    pub async fn upload_profile_photo(
        &mut self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, WizardError> {
        self.ensure_editable()?;
        let previous = self
            .snapshot
            .profile
            .as_ref()
            .and_then(|p| p.profile_photo_key.clone());
        let key = self
            .documents
            .upload_photo(file_name, bytes, previous.as_deref())
            .await?;
        self.snapshot
            .profile
            .get_or_insert_with(Default::default)
            .profile_photo_key = Some(key.clone());
        Ok(key)
    }

    /// A short-lived URL for displaying an uploaded document.
    pub async fn document_url(&self, document_type: DocumentType) -> Result<SignedUrl, WizardError> {
        let entry = self
            .snapshot
            .documents
            .get(document_type)
            .ok_or(WizardError::DocumentNotFound(document_type))?;
        self.documents
            .signed_url(&entry.storage_key, self.config.signed_url_ttl)
            .await
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Whether the Review step would accept a submit right now.
    pub fn can_submit(&self) -> bool {
        self.phase == WizardPhase::Ready
            && self.record.status.is_editable()
            && self
                .snapshot
                .validate_step(WizardStep::Review, &ValidationContext::now())
                .is_empty()
    }

    /// Send every staged save now.
    pub async fn flush(&self) -> Result<(), WizardError> {
        self.autosave
            .flush()
            .await
            .map_err(|failure| WizardError::PersistenceFailed(failure.message))
    }

    /// Flush pending saves, then move the record to `pending_verification`.
    pub async fn submit(&mut self, terms_accepted: bool) -> Result<OnboardingRecord, WizardError> {
        self.ensure_open()?;
        if self.phase == WizardPhase::Submitted || !self.record.status.is_editable() {
            return Err(WizardError::ReadOnly {
                status: self.record.status,
            });
        }

        self.snapshot.review = Some(ReviewData { terms_accepted });
        let errors = self
            .snapshot
            .validate_step(WizardStep::Review, &ValidationContext::now());
        if !errors.is_empty() {
            self.valid.insert(WizardStep::Review, false);
            return Err(WizardError::ValidationFailed {
                step: WizardStep::Review,
                errors,
            });
        }

        self.phase = WizardPhase::Submitting;
        if let Err(e) = self.flush().await {
            self.phase = WizardPhase::Ready;
            return Err(e);
        }

        let record = match self.gateway.submit(self.record.id, self.record.user_id).await {
            Ok(record) => record,
            Err(GatewayError::Conflict(message)) => {
                tracing::warn!(onboarding_id = self.record.id, %message, "Submit conflicted");
                if let Ok(latest) = self.gateway.load_or_create(self.record.user_id).await {
                    self.record = latest;
                }
                self.phase = if self.record.status.is_editable() {
                    WizardPhase::Ready
                } else {
                    WizardPhase::Submitted
                };
                if self.is_read_only() {
                    self.current = WizardStep::Review;
                }
                return Err(WizardError::ReadOnly {
                    status: self.record.status,
                });
            }
            Err(e) => {
                self.phase = WizardPhase::Ready;
                return Err(e.into());
            }
        };

        self.record = record.clone();
        self.phase = WizardPhase::Submitted;
        self.valid.insert(WizardStep::Review, true);
        self.completed.insert(WizardStep::Review);
        self.current = WizardStep::Review;

        tracing::info!(
            onboarding_id = record.id,
            user_id = record.user_id,
            "Onboarding submitted for verification"
        );
        Ok(record)
    }

    /// Flush and stop background timers. Used when a session is dropped.
    pub async fn close(&self) -> Result<(), WizardError> {
        let flushed = self.flush().await;
        self.autosave.shutdown();
        flushed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
