//! Postgres implementation of the onboarding gateway.

use async_trait::async_trait;
use sqlx::PgPool;
use workbridge_core::audit::{action_types, entity_types, submission_metadata};
use workbridge_core::error::CoreError;
use workbridge_core::gateway::{GatewayError, NewDocument, OnboardingGateway, OnboardingRecord};
use workbridge_core::onboarding_wizard::WizardStep;
use workbridge_core::steps::{
    DocumentEntry, DocumentType, DocumentsData, LanguagesData, SkillsData, StepData,
    WizardSnapshot, WorkHistoryData,
};
use workbridge_core::types::DbId;

use crate::models::audit::CreateAuditEvent;
use crate::repositories::{
    AuditEventRepo, DocumentRepo, LanguageRepo, OnboardingRepo, PreferencesRepo, ProfileRepo,
    SkillRepo, WorkHistoryRepo,
};

/// Gateway backed by a Postgres pool.
#[derive(Clone)]
pub struct PgOnboardingGateway {
    pool: PgPool,
}

impl PgOnboardingGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn db_err(err: sqlx::Error) -> GatewayError {
    GatewayError::backend(err)
}

fn decode_err(err: CoreError) -> GatewayError {
    GatewayError::backend(err)
}

#[async_trait]
impl OnboardingGateway for PgOnboardingGateway {
    async fn load_or_create(&self, user_id: DbId) -> Result<OnboardingRecord, GatewayError> {
        let row = OnboardingRepo::get_or_create(&self.pool, user_id)
            .await
            .map_err(db_err)?;
        row.into_record().map_err(decode_err)
    }

    async fn hydrate(&self, onboarding_id: DbId) -> Result<WizardSnapshot, GatewayError> {
        let pool = &self.pool;
        let (profile, documents, skills, certifications, history, languages, preferences) =
            tokio::try_join!(
                ProfileRepo::find(pool, onboarding_id),
                DocumentRepo::list_for_onboarding(pool, onboarding_id),
                SkillRepo::list_skills(pool, onboarding_id),
                SkillRepo::list_certifications(pool, onboarding_id),
                WorkHistoryRepo::list(pool, onboarding_id),
                LanguageRepo::list(pool, onboarding_id),
                PreferencesRepo::find(pool, onboarding_id),
            )
            .map_err(db_err)?;

        let mut docs = DocumentsData::default();
        for row in documents {
            docs.insert(row.into_entry().map_err(decode_err)?);
        }

        let skills = (!skills.is_empty() || !certifications.is_empty()).then(|| SkillsData {
            skills: skills.into_iter().map(Into::into).collect(),
            certifications: certifications.into_iter().map(Into::into).collect(),
        });

        let work_history = (!history.is_empty()).then(|| WorkHistoryData {
            entries: history.into_iter().map(Into::into).collect(),
        });

        let languages = if languages.is_empty() {
            None
        } else {
            Some(LanguagesData {
                languages: languages
                    .into_iter()
                    .map(|row| row.into_entry())
                    .collect::<Result<_, _>>()
                    .map_err(decode_err)?,
            })
        };

        Ok(WizardSnapshot {
            profile: profile.map(Into::into),
            documents: docs,
            skills,
            work_history,
            languages,
            preferences: preferences.map(Into::into),
            review: None,
        })
    }

    async fn save_step(&self, onboarding_id: DbId, data: &StepData) -> Result<(), GatewayError> {
        let pool = &self.pool;
        match data {
            StepData::Profile(profile) => {
                ProfileRepo::upsert(pool, onboarding_id, profile).await.map(drop)
            }
            StepData::Skills(skills) => SkillRepo::replace_all(pool, onboarding_id, skills).await,
            StepData::WorkHistory(history) => {
                WorkHistoryRepo::replace_all(pool, onboarding_id, history).await
            }
            StepData::Languages(languages) => {
                LanguageRepo::replace_all(pool, onboarding_id, languages).await
            }
            StepData::Preferences(prefs) => {
                PreferencesRepo::upsert(pool, onboarding_id, prefs).await.map(drop)
            }
            // Documents persist per upload; review persists through submit.
            StepData::Documents(_) | StepData::Review(_) => Ok(()),
        }
        .map_err(db_err)?;

        tracing::debug!(onboarding_id, step = %data.step(), "Step data saved");
        Ok(())
    }

    async fn update_current_step(
        &self,
        onboarding_id: DbId,
        step: WizardStep,
    ) -> Result<(), GatewayError> {
        let updated = OnboardingRepo::update_current_step(&self.pool, onboarding_id, step)
            .await
            .map_err(db_err)?;
        if !updated {
            return Err(GatewayError::NotFound {
                entity: "worker_onboarding",
                onboarding_id,
            });
        }
        Ok(())
    }

    async fn set_profile_photo(
        &self,
        onboarding_id: DbId,
        storage_key: &str,
    ) -> Result<(), GatewayError> {
        ProfileRepo::set_photo_key(&self.pool, onboarding_id, storage_key)
            .await
            .map_err(db_err)
    }

    async fn upsert_document(
        &self,
        onboarding_id: DbId,
        doc: &NewDocument,
    ) -> Result<DocumentEntry, GatewayError> {
        let row = DocumentRepo::upsert(&self.pool, onboarding_id, doc)
            .await
            .map_err(db_err)?;
        row.into_entry().map_err(decode_err)
    }

    async fn find_document(
        &self,
        onboarding_id: DbId,
        document_type: DocumentType,
    ) -> Result<Option<DocumentEntry>, GatewayError> {
        DocumentRepo::find(&self.pool, onboarding_id, document_type)
            .await
            .map_err(db_err)?
            .map(|row| row.into_entry().map_err(decode_err))
            .transpose()
    }

    async fn delete_document(
        &self,
        onboarding_id: DbId,
        document_type: DocumentType,
    ) -> Result<bool, GatewayError> {
        DocumentRepo::delete(&self.pool, onboarding_id, document_type)
            .await
            .map_err(db_err)
    }

    async fn submit(
        &self,
        onboarding_id: DbId,
        actor_id: DbId,
    ) -> Result<OnboardingRecord, GatewayError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let Some(row) = OnboardingRepo::mark_submitted(&mut tx, onboarding_id)
            .await
            .map_err(db_err)?
        else {
            // Dropping `tx` rolls back; decide which failure to report.
            drop(tx);
            return match OnboardingRepo::find_by_id(&self.pool, onboarding_id)
                .await
                .map_err(db_err)?
            {
                Some(existing) => Err(GatewayError::Conflict(format!(
                    "Onboarding {onboarding_id} is already '{}'",
                    existing.status
                ))),
                None => Err(GatewayError::NotFound {
                    entity: "worker_onboarding",
                    onboarding_id,
                }),
            };
        };

        let submitted_at = row.submitted_at.unwrap_or(row.updated_at);
        AuditEventRepo::insert(
            &mut tx,
            &CreateAuditEvent {
                actor_id,
                action: action_types::ONBOARDING_SUBMITTED.to_string(),
                entity_type: entity_types::WORKER_ONBOARDING.to_string(),
                entity_id: onboarding_id,
                metadata: submission_metadata(submitted_at),
            },
        )
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        tracing::info!(onboarding_id, actor_id, "Onboarding submitted");
        row.into_record().map_err(decode_err)
    }
}
