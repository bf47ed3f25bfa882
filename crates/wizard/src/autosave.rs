//! Debounced autosave with per-key sequence numbers.
//!
//! A staged save is keyed by what it writes: one step's data, or the step
//! pointer. Staging the same key again inside the delay replaces the payload
//! and restarts its timer, so only the trailing payload is sent. Different
//! keys are independent and may complete in any order.
//!
//! Every send takes the next sequence number for its key. Sends are never
//! cancelled, so an older request can finish after a newer one; such a
//! response is dropped without touching the indicator or the failure list.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;
use workbridge_core::gateway::OnboardingGateway;
use workbridge_core::onboarding_wizard::WizardStep;
use workbridge_core::steps::StepData;
use workbridge_core::types::DbId;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Save status shown next to the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveIndicator {
    #[default]
    Idle,
    Saving,
    Saved,
    Failed,
}

/// What a staged save writes. Saves coalesce per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "step", rename_all = "snake_case")]
pub enum SaveKey {
    Step(WizardStep),
    CurrentStep,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveJob {
    Step(StepData),
    CurrentStep(WizardStep),
}

impl SaveJob {
    pub fn key(&self) -> SaveKey {
        match self {
            Self::Step(data) => SaveKey::Step(data.step()),
            Self::CurrentStep(_) => SaveKey::CurrentStep,
        }
    }
}

/// A save the backend refused. The in-memory snapshot is not rolled back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveFailure {
    pub key: SaveKey,
    pub seq: u64,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct Staged {
    job: SaveJob,
    generation: u64,
}

#[derive(Default)]
struct State {
    staged: HashMap<SaveKey, Staged>,
    /// Latest sequence number handed out per key.
    issued: HashMap<SaveKey, u64>,
    in_flight: usize,
    generation: u64,
    /// Bumped on every indicator change; a pending "Saved" clear only fires
    /// if nothing changed since it was armed.
    indicator_epoch: u64,
    /// Indicator to publish once nothing is in flight.
    settled: SaveIndicator,
    failures: Vec<SaveFailure>,
    /// Keys whose latest send failed, with the payload to resend on flush.
    unsaved: HashMap<SaveKey, (SaveJob, SaveFailure)>,
}

struct Inner {
    gateway: Arc<dyn OnboardingGateway>,
    onboarding_id: DbId,
    delay: Duration,
    saved_ttl: Duration,
    state: Mutex<State>,
    indicator: watch::Sender<SaveIndicator>,
    idle: Notify,
    cancel: CancellationToken,
}

enum Outcome {
    Applied,
    Failed(SaveFailure),
    Stale,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove the staged job for `key` if it is still the one a timer armed
    /// for `generation`.
    fn take_staged(&self, key: SaveKey, generation: u64) -> Option<SaveJob> {
        let mut state = self.state();
        match state.staged.get(&key) {
            Some(staged) if staged.generation == generation => {
                state.staged.remove(&key).map(|s| s.job)
            }
            _ => None,
        }
    }

    async fn send(self: &Arc<Self>, job: SaveJob) -> Result<(), SaveFailure> {
        let key = job.key();
        let seq = {
            let mut state = self.state();
            let issued = state.issued.entry(key).or_insert(0);
            *issued += 1;
            let seq = *issued;
            state.in_flight += 1;
            state.indicator_epoch += 1;
            seq
        };
        self.indicator.send_replace(SaveIndicator::Saving);
        tracing::debug!(onboarding_id = self.onboarding_id, ?key, seq, "Save sent");

        let result = match &job {
            SaveJob::Step(data) => self.gateway.save_step(self.onboarding_id, data).await,
            SaveJob::CurrentStep(step) => {
                self.gateway
                    .update_current_step(self.onboarding_id, *step)
                    .await
            }
        };

        let (outcome, publish) = {
            let mut state = self.state();
            state.in_flight -= 1;

            let latest = state.issued.get(&key).copied().unwrap_or(seq);
            let outcome = if seq < latest {
                Outcome::Stale
            } else {
                match result {
                    Ok(()) => {
                        state.unsaved.remove(&key);
                        state.settled = SaveIndicator::Saved;
                        Outcome::Applied
                    }
                    Err(e) => {
                        let failure = SaveFailure {
                            key,
                            seq,
                            message: e.to_string(),
                        };
                        // A newer staged payload for the key supersedes this one.
                        if !state.staged.contains_key(&key) {
                            state.unsaved.insert(key, (job, failure.clone()));
                        }
                        state.settled = SaveIndicator::Failed;
                        state.failures.push(failure.clone());
                        Outcome::Failed(failure)
                    }
                }
            };

            let publish = (state.in_flight == 0).then(|| {
                state.indicator_epoch += 1;
                (state.settled, state.indicator_epoch)
            });
            (outcome, publish)
        };

        if let Some((indicator, epoch)) = publish {
            self.indicator.send_replace(indicator);
            if indicator == SaveIndicator::Saved {
                self.arm_saved_clear(epoch);
            }
            self.idle.notify_waiters();
        }

        match outcome {
            Outcome::Applied => {
                tracing::debug!(onboarding_id = self.onboarding_id, ?key, seq, "Save applied");
                Ok(())
            }
            Outcome::Stale => {
                tracing::debug!(
                    onboarding_id = self.onboarding_id,
                    ?key,
                    seq,
                    "Stale save response discarded"
                );
                Ok(())
            }
            Outcome::Failed(failure) => {
                tracing::warn!(
                    onboarding_id = self.onboarding_id,
                    ?key,
                    seq,
                    error = %failure.message,
                    "Save failed"
                );
                Err(failure)
            }
        }
    }

    fn arm_saved_clear(self: &Arc<Self>, epoch: u64) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = inner.cancel.cancelled() => {}
                _ = tokio::time::sleep(inner.saved_ttl) => {
                    let mut state = inner.state();
                    if state.indicator_epoch == epoch {
                        state.indicator_epoch += 1;
                        state.settled = SaveIndicator::Idle;
                        inner.indicator.send_replace(SaveIndicator::Idle);
                    }
                }
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Autosaver
// ---------------------------------------------------------------------------

/// Trailing-edge debouncer in front of the gateway, one per onboarding.
///
/// Cloning shares the same queue.
#[derive(Clone)]
pub struct Autosaver {
    inner: Arc<Inner>,
}

impl Autosaver {
    pub fn new(
        gateway: Arc<dyn OnboardingGateway>,
        onboarding_id: DbId,
        delay: Duration,
        saved_ttl: Duration,
    ) -> Self {
        let (indicator, _) = watch::channel(SaveIndicator::Idle);
        Self {
            inner: Arc::new(Inner {
                gateway,
                onboarding_id,
                delay,
                saved_ttl,
                state: Mutex::new(State::default()),
                indicator,
                idle: Notify::new(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Stage `job` and (re)start the timer for its key.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&self, job: SaveJob) {
        let key = job.key();
        let generation = {
            let mut state = self.inner.state();
            state.generation += 1;
            let generation = state.generation;
            state.staged.insert(key, Staged { job, generation });
            state.unsaved.remove(&key);
            generation
        };
        tracing::debug!(onboarding_id = self.inner.onboarding_id, ?key, "Save scheduled");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = inner.cancel.cancelled() => {}
                _ = tokio::time::sleep(inner.delay) => {
                    if let Some(job) = inner.take_staged(key, generation) {
                        // Failures are recorded in state; nobody awaits this task.
                        let _ = inner.send(job).await;
                    }
                }
            }
        });
    }

    /// Send every staged save now, resend any whose last send failed, and
    /// wait until nothing is in flight.
    ///
    /// Fails if any key's latest send failed, including a timer-fired send
    /// that was already in flight when the flush started. The failed
    /// payload stays queued for the next flush.
    pub async fn flush(&self) -> Result<(), SaveFailure> {
        let jobs: Vec<SaveJob> = {
            let mut state = self.inner.state();
            let mut jobs: Vec<SaveJob> = state.staged.drain().map(|(_, staged)| staged.job).collect();
            jobs.extend(state.unsaved.drain().map(|(_, (job, _))| job));
            jobs
        };

        let sends = jobs.into_iter().map(|job| self.inner.send(job));
        futures::future::join_all(sends).await;
        self.wait_idle().await;

        let state = self.inner.state();
        match state.unsaved.values().min_by_key(|(_, failure)| failure.seq) {
            Some((_, failure)) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.state().in_flight == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Keys staged but not yet sent.
    pub fn staged_keys(&self) -> Vec<SaveKey> {
        self.inner.state().staged.keys().copied().collect()
    }

    pub fn in_flight(&self) -> usize {
        self.inner.state().in_flight
    }

    pub fn indicator(&self) -> SaveIndicator {
        *self.inner.indicator.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveIndicator> {
        self.inner.indicator.subscribe()
    }

    /// Take the failures recorded since the last call.
    pub fn drain_failures(&self) -> Vec<SaveFailure> {
        std::mem::take(&mut self.inner.state().failures)
    }

    /// Stop all timers. Staged saves that have not been sent are dropped;
    /// call [`Autosaver::flush`] first to keep them.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.state().staged.clear();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGateway;
    use tokio::time::sleep;
    use workbridge_core::steps::{WorkHistoryData, WorkHistoryEntry};

    const DELAY: Duration = Duration::from_millis(800);
    const TTL: Duration = Duration::from_secs(2);

    fn work_history(company: &str) -> StepData {
        StepData::WorkHistory(WorkHistoryData {
            entries: vec![WorkHistoryEntry {
                company_name: company.to_string(),
                role: "Fitter".into(),
                start_date: chrono::NaiveDate::from_ymd_opt(2020, 1, 1),
                end_date: None,
                is_current: true,
                responsibilities: None,
            }],
        })
    }

    async fn setup() -> (Arc<MemoryGateway>, Autosaver) {
        let gateway = Arc::new(MemoryGateway::new());
        let record = gateway.load_or_create(7).await.unwrap();
        let saver = Autosaver::new(gateway.clone(), record.id, DELAY, TTL);
        (gateway, saver)
    }

    // -- coalescing --

    #[tokio::test(start_paused = true)]
    async fn same_step_twice_in_window_sends_only_the_last_payload() {
        let (gateway, saver) = setup().await;

        saver.schedule(SaveJob::Step(work_history("Acme")));
        sleep(Duration::from_millis(300)).await;
        saver.schedule(SaveJob::Step(work_history("Globex")));
        sleep(Duration::from_millis(1_000)).await;

        let saves = gateway.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].data, work_history("Globex"));
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_sent_before_the_delay() {
        let (gateway, saver) = setup().await;
        saver.schedule(SaveJob::Step(work_history("Acme")));
        sleep(Duration::from_millis(700)).await;
        assert!(gateway.saves().is_empty());
        assert_eq!(saver.staged_keys(), vec![SaveKey::Step(WizardStep::WorkHistory)]);
    }

    #[tokio::test(start_paused = true)]
    async fn different_keys_are_saved_independently() {
        let (gateway, saver) = setup().await;
        saver.schedule(SaveJob::Step(work_history("Acme")));
        saver.schedule(SaveJob::CurrentStep(WizardStep::Languages));
        sleep(Duration::from_millis(900)).await;

        assert_eq!(gateway.saves().len(), 1);
        let record = gateway.record_for_user(7).unwrap();
        assert_eq!(record.current_step, WizardStep::Languages);
    }

    // -- indicator --

    #[tokio::test(start_paused = true)]
    async fn indicator_goes_saving_then_saved_then_idle() {
        let (gateway, saver) = setup().await;
        gateway.script_save(Duration::from_secs(1), Ok(()));

        assert_eq!(saver.indicator(), SaveIndicator::Idle);
        saver.schedule(SaveJob::Step(work_history("Acme")));

        sleep(Duration::from_millis(900)).await;
        assert_eq!(saver.indicator(), SaveIndicator::Saving);

        sleep(Duration::from_millis(1_000)).await;
        assert_eq!(saver.indicator(), SaveIndicator::Saved);

        sleep(Duration::from_millis(2_100)).await;
        assert_eq!(saver.indicator(), SaveIndicator::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_recorded_and_shown() {
        let (gateway, saver) = setup().await;
        gateway.script_save(Duration::ZERO, Err("connection reset".into()));

        saver.schedule(SaveJob::Step(work_history("Acme")));
        sleep(Duration::from_millis(900)).await;

        assert_eq!(saver.indicator(), SaveIndicator::Failed);
        let failures = saver.drain_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].key, SaveKey::Step(WizardStep::WorkHistory));
        assert!(failures[0].message.contains("connection reset"));
        assert!(saver.drain_failures().is_empty());

        // "Failed" does not auto-clear.
        sleep(Duration::from_secs(5)).await;
        assert_eq!(saver.indicator(), SaveIndicator::Failed);
    }

    // -- stale guard --

    #[tokio::test(start_paused = true)]
    async fn late_response_from_an_older_send_is_discarded() {
        let (gateway, saver) = setup().await;
        // First send hangs for 5s and then fails; the second succeeds at once.
        gateway.script_save(Duration::from_secs(5), Err("timeout".into()));

        saver.schedule(SaveJob::Step(work_history("Acme")));
        sleep(Duration::from_millis(1_000)).await;
        saver.schedule(SaveJob::Step(work_history("Globex")));
        sleep(Duration::from_millis(1_000)).await;

        // Newer save done, older one still out.
        assert_eq!(saver.in_flight(), 1);
        assert_eq!(saver.indicator(), SaveIndicator::Saving);

        sleep(Duration::from_secs(4)).await;
        assert_eq!(saver.in_flight(), 0);
        assert!(saver.drain_failures().is_empty());
        assert_eq!(saver.indicator(), SaveIndicator::Saved);
    }

    // -- flush / shutdown --

    #[tokio::test(start_paused = true)]
    async fn flush_sends_staged_saves_immediately() {
        let (gateway, saver) = setup().await;
        saver.schedule(SaveJob::Step(work_history("Acme")));
        saver.flush().await.unwrap();

        assert_eq!(gateway.saves().len(), 1);
        assert!(saver.staged_keys().is_empty());

        // The original timer finds nothing left to send.
        sleep(Duration::from_secs(1)).await;
        assert_eq!(gateway.saves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_reports_failures() {
        let (gateway, saver) = setup().await;
        gateway.script_save(Duration::ZERO, Err("disk full".into()));
        saver.schedule(SaveJob::Step(work_history("Acme")));

        let failure = saver.flush().await.unwrap_err();
        assert!(failure.message.contains("disk full"));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_reports_a_failed_save_that_was_already_in_flight() {
        let (gateway, saver) = setup().await;
        gateway.script_save(Duration::from_secs(3), Err("timeout".into()));
        saver.schedule(SaveJob::Step(work_history("Acme")));
        sleep(Duration::from_millis(900)).await;
        assert_eq!(saver.in_flight(), 1);
        assert!(saver.staged_keys().is_empty());

        let failure = saver.flush().await.unwrap_err();
        assert_eq!(failure.key, SaveKey::Step(WizardStep::WorkHistory));
        assert!(failure.message.contains("timeout"));
        assert!(gateway.saves().is_empty());

        // The failed payload is resent by the next flush.
        saver.flush().await.unwrap();
        assert_eq!(gateway.saves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_payload_replaces_a_failed_one() {
        let (gateway, saver) = setup().await;
        gateway.script_save(Duration::ZERO, Err("connection reset".into()));
        saver.schedule(SaveJob::Step(work_history("Acme")));
        sleep(Duration::from_millis(900)).await;
        assert_eq!(saver.indicator(), SaveIndicator::Failed);

        saver.schedule(SaveJob::Step(work_history("Globex")));
        saver.flush().await.unwrap();

        let saves = gateway.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].data, work_history("Globex"));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_waits_for_in_flight_saves() {
        let (gateway, saver) = setup().await;
        gateway.script_save(Duration::from_secs(3), Ok(()));
        saver.schedule(SaveJob::Step(work_history("Acme")));
        sleep(Duration::from_millis(900)).await;
        assert_eq!(saver.in_flight(), 1);

        saver.flush().await.unwrap();
        assert_eq!(saver.in_flight(), 0);
        assert_eq!(gateway.saves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drops_staged_saves() {
        let (gateway, saver) = setup().await;
        saver.schedule(SaveJob::Step(work_history("Acme")));
        saver.shutdown();
        assert!(saver.is_shut_down());
        sleep(Duration::from_secs(2)).await;
        assert!(gateway.saves().is_empty());
    }
}
