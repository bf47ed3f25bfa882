//! Live wizard controllers, one per worker.
//!
//! A controller holds the debounced saves for its worker, so requests from
//! the same worker must reach the same instance. Each entry is behind an
//! async mutex; requests for one worker are serialized, different workers
//! proceed in parallel.
//!
//! An entry leaves the map before its controller is closed, and a closed
//! controller refuses edits. [`WizardSessions::lock`] skips closed
//! controllers, so a request that raced a reload lands on the new one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use workbridge_core::types::DbId;
use workbridge_wizard::{WizardController, WizardDeps, WizardError};

pub type SharedController = Arc<Mutex<WizardController>>;

#[derive(Clone)]
struct Entry {
    controller: SharedController,
    touched: Arc<StdMutex<Instant>>,
}

impl Entry {
    fn new(controller: WizardController) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            touched: Arc::new(StdMutex::new(Instant::now())),
        }
    }

    fn touch(&self) {
        *self.touched.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.touched.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

pub struct WizardSessions {
    deps: WizardDeps,
    live: RwLock<HashMap<DbId, Entry>>,
}

impl WizardSessions {
    pub fn new(deps: WizardDeps) -> Self {
        Self {
            deps,
            live: RwLock::new(HashMap::new()),
        }
    }

    pub fn deps(&self) -> &WizardDeps {
        &self.deps
    }

    fn lookup(&self, user_id: DbId) -> Option<SharedController> {
        let live = self.live.read().unwrap_or_else(PoisonError::into_inner);
        live.get(&user_id).map(|entry| {
            entry.touch();
            Arc::clone(&entry.controller)
        })
    }

    fn remove(&self, user_id: DbId) -> Option<SharedController> {
        self.live
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user_id)
            .map(|entry| entry.controller)
    }

    /// The worker's live controller, loading one if none exists yet.
    pub async fn get(&self, user_id: DbId) -> Result<SharedController, WizardError> {
        if let Some(existing) = self.lookup(user_id) {
            return Ok(existing);
        }

        let entry = Entry::new(WizardController::initialize(self.deps.clone(), Some(user_id)).await?);

        // Another request may have loaded one meanwhile; keep the first.
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(&live.entry(user_id).or_insert(entry).controller))
    }

    /// Lock the worker's live controller.
    ///
    /// A controller closed while this request waited for it has already
    /// left the map; the lookup is retried against its replacement.
    pub async fn lock(&self, user_id: DbId) -> Result<OwnedMutexGuard<WizardController>, WizardError> {
        loop {
            let guard = self.get(user_id).await?.lock_owned().await;
            if !guard.is_closed() {
                return Ok(guard);
            }
            tracing::debug!(user_id, "Wizard session was replaced, retrying");
        }
    }

    /// Reload the worker's controller from storage.
    ///
    /// The previous controller, if any, is taken out of the map and flushed
    /// before the replacement loads, so the reload sees its staged edits.
    pub async fn open(&self, user_id: DbId) -> Result<SharedController, WizardError> {
        if let Some(previous) = self.remove(user_id) {
            if let Err(e) = previous.lock().await.close().await {
                tracing::warn!(user_id, error = %e, "Flush before reload failed");
            }
        }

        let entry = Entry::new(WizardController::initialize(self.deps.clone(), Some(user_id)).await?);
        let shared = Arc::clone(&entry.controller);
        let displaced = self
            .live
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, entry);

        // A concurrent `get` may have loaded its own copy in the meantime.
        if let Some(displaced) = displaced {
            if let Err(e) = displaced.controller.lock().await.close().await {
                tracing::warn!(user_id, error = %e, "Flush of displaced session failed");
            }
        }
        Ok(shared)
    }

    /// Flush and drop sessions nobody has touched for `idle_for`.
    ///
    /// A session is kept if its flush fails or a request still holds it.
    /// Returns the number of sessions dropped.
    pub async fn evict_idle(&self, idle_for: Duration) -> usize {
        let now = Instant::now();
        let candidates: Vec<(DbId, Entry)> = self
            .live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, entry)| entry.idle_for(now) >= idle_for)
            .map(|(&user_id, entry)| (user_id, entry.clone()))
            .collect();

        let mut evicted = 0;
        for (user_id, candidate) in candidates {
            let wizard = candidate.controller.lock().await;
            if let Err(e) = wizard.flush().await {
                tracing::warn!(user_id, error = %e, "Idle session kept, flush failed");
                continue;
            }

            let removed = {
                let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
                let still_idle = live.get(&user_id).is_some_and(|current| {
                    Arc::ptr_eq(&current.controller, &candidate.controller)
                        && current.idle_for(Instant::now()) >= idle_for
                        // The map and `candidate` hold the only references.
                        && Arc::strong_count(&candidate.controller) == 2
                });
                if still_idle {
                    live.remove(&user_id);
                }
                still_idle
            };

            if removed {
                if let Err(e) = wizard.close().await {
                    tracing::warn!(user_id, error = %e, "Flush on eviction failed");
                }
                evicted += 1;
            }
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.live.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush every live controller. Called once the server stops accepting
    /// requests.
    pub async fn close_all(&self) {
        let all: Vec<(DbId, Entry)> = self
            .live
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        for (user_id, entry) in all {
            if let Err(e) = entry.controller.lock().await.close().await {
                tracing::warn!(user_id, error = %e, "Flush on shutdown failed");
            }
        }
    }
}
