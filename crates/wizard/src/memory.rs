//! In-memory gateway and object storage.
//!
//! Used by tests and by local runs without a database. Both keep enough
//! bookkeeping (save log, audit log, scripted save latency) for tests to
//! observe what the wizard sent.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use workbridge_core::audit::{action_types, entity_types, submission_metadata};
use workbridge_core::gateway::{GatewayError, NewDocument, OnboardingGateway, OnboardingRecord};
use workbridge_core::onboarding_wizard::{OnboardingStatus, WizardStep};
use workbridge_core::signing::UrlSigner;
use workbridge_core::steps::{
    DocumentEntry, DocumentStatus, DocumentType, StepData, WizardSnapshot,
};
use workbridge_core::storage::{validate_storage_key, ObjectStorage, SignedUrl, StorageError};
use workbridge_core::types::DbId;

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// One `save_step` call that reached the store.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedStep {
    pub onboarding_id: DbId,
    pub data: StepData,
}

/// An audit event written on submission.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub actor_id: DbId,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: DbId,
    pub metadata: serde_json::Value,
}

struct ScriptedSave {
    delay: Duration,
    result: Result<(), String>,
}

#[derive(Default)]
struct GatewayState {
    next_id: DbId,
    records: HashMap<DbId, OnboardingRecord>,
    snapshots: HashMap<DbId, WizardSnapshot>,
    saves: Vec<SavedStep>,
    audit: Vec<AuditEntry>,
}

impl GatewayState {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn record_mut(&mut self, onboarding_id: DbId) -> Result<&mut OnboardingRecord, GatewayError> {
        self.records
            .get_mut(&onboarding_id)
            .ok_or(GatewayError::NotFound {
                entity: "worker_onboarding",
                onboarding_id,
            })
    }

    fn snapshot_mut(&mut self, onboarding_id: DbId) -> Result<&mut WizardSnapshot, GatewayError> {
        if !self.records.contains_key(&onboarding_id) {
            return Err(GatewayError::NotFound {
                entity: "worker_onboarding",
                onboarding_id,
            });
        }
        Ok(self.snapshots.entry(onboarding_id).or_default())
    }
}

/// Gateway that keeps every onboarding in process memory.
#[derive(Default)]
pub struct MemoryGateway {
    state: RwLock<GatewayState>,
    script: Mutex<VecDeque<ScriptedSave>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, GatewayState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, GatewayState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next unscripted `save_step` call wait `delay` and then
    /// return `result`. Calls consume scripts in order.
    pub fn script_save(&self, delay: Duration, result: Result<(), String>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(ScriptedSave { delay, result });
    }

    /// Insert a record with existing data, as if from an earlier session.
    pub fn seed(
        &self,
        user_id: DbId,
        current_step: WizardStep,
        status: OnboardingStatus,
        snapshot: WizardSnapshot,
    ) -> OnboardingRecord {
        let mut state = self.write();
        let id = state.next_id();
        let record = OnboardingRecord {
            id,
            user_id,
            current_step,
            status,
            submitted_at: (!status.is_editable()).then(chrono::Utc::now),
        };
        state.records.insert(id, record.clone());
        state.snapshots.insert(id, snapshot);
        record
    }

    /// Every successful `save_step` call, oldest first.
    pub fn saves(&self) -> Vec<SavedStep> {
        self.read().saves.clone()
    }

    pub fn record_for_user(&self, user_id: DbId) -> Option<OnboardingRecord> {
        self.read()
            .records
            .values()
            .find(|r| r.user_id == user_id)
            .cloned()
    }

    pub fn audit_events(&self) -> Vec<AuditEntry> {
        self.read().audit.clone()
    }
}

#[async_trait]
impl OnboardingGateway for MemoryGateway {
    async fn load_or_create(&self, user_id: DbId) -> Result<OnboardingRecord, GatewayError> {
        let mut state = self.write();
        if let Some(record) = state.records.values().find(|r| r.user_id == user_id) {
            return Ok(record.clone());
        }
        let id = state.next_id();
        let record = OnboardingRecord {
            id,
            user_id,
            current_step: WizardStep::Profile,
            status: OnboardingStatus::Draft,
            submitted_at: None,
        };
        state.records.insert(id, record.clone());
        Ok(record)
    }

    async fn hydrate(&self, onboarding_id: DbId) -> Result<WizardSnapshot, GatewayError> {
        let state = self.read();
        if !state.records.contains_key(&onboarding_id) {
            return Err(GatewayError::NotFound {
                entity: "worker_onboarding",
                onboarding_id,
            });
        }
        let mut snapshot = state
            .snapshots
            .get(&onboarding_id)
            .cloned()
            .unwrap_or_default();

        // Match the row-backed store: empty collections load as "never saved".
        if snapshot
            .skills
            .as_ref()
            .is_some_and(|s| s.skills.is_empty() && s.certifications.is_empty())
        {
            snapshot.skills = None;
        }
        if snapshot.work_history.as_ref().is_some_and(|w| w.entries.is_empty()) {
            snapshot.work_history = None;
        }
        if snapshot.languages.as_ref().is_some_and(|l| l.languages.is_empty()) {
            snapshot.languages = None;
        }
        snapshot.review = None;
        Ok(snapshot)
    }

    async fn save_step(&self, onboarding_id: DbId, data: &StepData) -> Result<(), GatewayError> {
        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(ScriptedSave { delay, result }) = scripted {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result.map_err(GatewayError::backend)?;
        }

        let mut state = self.write();
        let snapshot = state.snapshot_mut(onboarding_id)?;
        match data {
            StepData::Documents(_) | StepData::Review(_) => {}
            StepData::Profile(profile) => {
                // Keep a photo uploaded separately when the payload has none.
                let photo = snapshot
                    .profile
                    .as_ref()
                    .and_then(|p| p.profile_photo_key.clone());
                let mut profile = profile.clone();
                if profile.profile_photo_key.is_none() {
                    profile.profile_photo_key = photo;
                }
                snapshot.profile = Some(profile);
            }
            other => snapshot.merge(other.clone()),
        }
        state.saves.push(SavedStep {
            onboarding_id,
            data: data.clone(),
        });
        Ok(())
    }

    async fn update_current_step(
        &self,
        onboarding_id: DbId,
        step: WizardStep,
    ) -> Result<(), GatewayError> {
        self.write().record_mut(onboarding_id)?.current_step = step;
        Ok(())
    }

    async fn set_profile_photo(
        &self,
        onboarding_id: DbId,
        storage_key: &str,
    ) -> Result<(), GatewayError> {
        let mut state = self.write();
        let snapshot = state.snapshot_mut(onboarding_id)?;
        snapshot
            .profile
            .get_or_insert_with(Default::default)
            .profile_photo_key = Some(storage_key.to_string());
        Ok(())
    }

    async fn upsert_document(
        &self,
        onboarding_id: DbId,
        doc: &NewDocument,
    ) -> Result<DocumentEntry, GatewayError> {
        let mut state = self.write();
        let existing_id = state
            .snapshots
            .get(&onboarding_id)
            .and_then(|s| s.documents.get(doc.document_type))
            .map(|d| d.id);
        let id = match existing_id {
            Some(id) => id,
            None => state.next_id(),
        };
        let entry = DocumentEntry {
            id,
            onboarding_id,
            document_type: doc.document_type,
            file_name: doc.file_name.clone(),
            storage_key: doc.storage_key.clone(),
            file_size: doc.file_size,
            mime_type: doc.mime_type.clone(),
            status: DocumentStatus::Uploaded,
        };
        state
            .snapshot_mut(onboarding_id)?
            .documents
            .insert(entry.clone());
        Ok(entry)
    }

    async fn find_document(
        &self,
        onboarding_id: DbId,
        document_type: DocumentType,
    ) -> Result<Option<DocumentEntry>, GatewayError> {
        Ok(self
            .read()
            .snapshots
            .get(&onboarding_id)
            .and_then(|s| s.documents.get(document_type))
            .cloned())
    }

    async fn delete_document(
        &self,
        onboarding_id: DbId,
        document_type: DocumentType,
    ) -> Result<bool, GatewayError> {
        let mut state = self.write();
        Ok(state
            .snapshot_mut(onboarding_id)?
            .documents
            .remove(document_type)
            .is_some())
    }

    async fn submit(
        &self,
        onboarding_id: DbId,
        actor_id: DbId,
    ) -> Result<OnboardingRecord, GatewayError> {
        let mut state = self.write();
        let record = state.record_mut(onboarding_id)?;
        if record.status != OnboardingStatus::Draft {
            return Err(GatewayError::Conflict(format!(
                "Onboarding {onboarding_id} is already '{}'",
                record.status.as_str()
            )));
        }
        let now = chrono::Utc::now();
        record.status = OnboardingStatus::PendingVerification;
        record.submitted_at = Some(now);
        let record = record.clone();

        state.audit.push(AuditEntry {
            actor_id,
            action: action_types::ONBOARDING_SUBMITTED,
            entity_type: entity_types::WORKER_ONBOARDING,
            entity_id: onboarding_id,
            metadata: submission_metadata(now),
        });
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Object storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Object storage held in a map. URLs are signed like the filesystem
/// backend's, so the download route can serve them.
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, StoredObject>>,
    fail_removals: AtomicBool,
    signer: UrlSigner,
}

impl MemoryStorage {
    pub fn new(signer: UrlSigner) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            fail_removals: AtomicBool::new(false),
            signer,
        }
    }

    /// Make every subsequent `remove` fail, to exercise cleanup paths.
    pub fn fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|o| o.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        validate_storage_key(key)?;
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key.to_string(),
                StoredObject {
                    bytes: bytes.to_vec(),
                    content_type: content_type.to_string(),
                },
            );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_storage_key(key)?;
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_storage_key(key)?;
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("refusing to remove {key}")));
        }
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .map(drop)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<SignedUrl, StorageError> {
        validate_storage_key(key)?;
        if !self.contains(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(self.signer.sign(key, ttl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use workbridge_core::steps::{SkillsData, WorkHistoryData};

    fn storage() -> MemoryStorage {
        MemoryStorage::new(UrlSigner::new(b"secret".to_vec(), "/files"))
    }

    #[tokio::test]
    async fn load_or_create_is_stable_per_user() {
        let gateway = MemoryGateway::new();
        let a = gateway.load_or_create(7).await.unwrap();
        let b = gateway.load_or_create(7).await.unwrap();
        let c = gateway.load_or_create(8).await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a.id, c.id);
        assert_eq!(a.current_step, WizardStep::Profile);
        assert_eq!(a.status, OnboardingStatus::Draft);
    }

    #[tokio::test]
    async fn hydrate_treats_empty_collections_as_unsaved() {
        let gateway = MemoryGateway::new();
        let id = gateway.load_or_create(7).await.unwrap().id;
        gateway
            .save_step(id, &StepData::Skills(SkillsData::default()))
            .await
            .unwrap();
        gateway
            .save_step(id, &StepData::WorkHistory(WorkHistoryData::default()))
            .await
            .unwrap();

        let snapshot = gateway.hydrate(id).await.unwrap();
        assert!(snapshot.skills.is_none());
        assert!(snapshot.work_history.is_none());
    }

    #[tokio::test]
    async fn unknown_onboarding_is_not_found() {
        let gateway = MemoryGateway::new();
        assert_matches!(
            gateway.update_current_step(42, WizardStep::Skills).await,
            Err(GatewayError::NotFound { .. })
        );
        assert_matches!(gateway.hydrate(42).await, Err(GatewayError::NotFound { .. }));
    }

    #[tokio::test]
    async fn submit_twice_conflicts() {
        let gateway = MemoryGateway::new();
        let id = gateway.load_or_create(7).await.unwrap().id;
        gateway.submit(id, 7).await.unwrap();
        assert_matches!(gateway.submit(id, 7).await, Err(GatewayError::Conflict(_)));
        assert_eq!(gateway.audit_events().len(), 1);
    }

    #[tokio::test]
    async fn storage_put_get_remove() {
        let storage = storage();
        storage.put("7/1/pan.pdf", b"%PDF", "application/pdf").await.unwrap();
        assert_eq!(storage.get("7/1/pan.pdf").await.unwrap(), b"%PDF");
        assert_eq!(
            storage.content_type("7/1/pan.pdf").as_deref(),
            Some("application/pdf")
        );

        storage.remove("7/1/pan.pdf").await.unwrap();
        assert!(storage.is_empty());
        assert_matches!(
            storage.remove("7/1/pan.pdf").await,
            Err(StorageError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn storage_rejects_escaping_keys() {
        let storage = storage();
        assert_matches!(
            storage.put("../etc/passwd", b"x", "text/plain").await,
            Err(StorageError::InvalidKey(_))
        );
    }

    #[tokio::test]
    async fn signed_url_requires_an_object() {
        let storage = storage();
        assert_matches!(
            storage.signed_url("7/1/pan.pdf", Duration::from_secs(60)).await,
            Err(StorageError::NotFound(_))
        );
        storage.put("7/1/pan.pdf", b"%PDF", "application/pdf").await.unwrap();
        let url = storage
            .signed_url("7/1/pan.pdf", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.url.starts_with("/files/7/1/pan.pdf?expires="));
    }
}
