use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::countdown::CountdownTimer;
use super::domain::{ApplicationRecord, DocumentSlot, FieldEdit, UploadedFile, WizardView};
use super::rate_limit::RateLimiter;
use super::store::{SecureStore, SessionStorage};
use super::wizard::{RegistrationWizard, WizardError};

/// Identifier for one browser tab's registration session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("reg-{id:06}"))
}

type SharedWizard<S> = Arc<Mutex<RegistrationWizard<S>>>;

struct Tab<S> {
    store: SecureStore<S>,
    wizard: SharedWizard<S>,
    countdown: Option<CountdownTimer>,
    last_active: DateTime<Utc>,
    submitted: bool,
}

impl<S> Tab<S> {
    fn is_stale(&self, now: DateTime<Utc>, idle_limit: Duration) -> bool {
        self.submitted || now - self.last_active > idle_limit
    }
}

/// Hosts registration wizards, one per session, over a shared rate limiter.
///
/// Each session gets its own storage scope, standing in for a browser tab's session storage.
/// [`RegistrationService::reload`] remounts a session's wizard over that same scope.
pub struct RegistrationService<S> {
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    draft_ttl: Duration,
    tabs: Mutex<HashMap<SessionId, Tab<S>>>,
}

impl<S> RegistrationService<S>
where
    S: SessionStorage + Default + 'static,
{
    pub fn new(limiter: Arc<RateLimiter>, clock: Arc<dyn Clock>, draft_ttl: Duration) -> Self {
        Self {
            limiter,
            clock,
            draft_ttl,
            tabs: Mutex::new(HashMap::new()),
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn session_count(&self) -> usize {
        self.tabs.lock().expect("session registry mutex poisoned").len()
    }

    /// Open a fresh session with empty storage.
    pub fn open_session(&self) -> (SessionId, WizardView) {
        let store = SecureStore::with_ttl(
            Arc::new(S::default()),
            self.clock.clone(),
            self.draft_ttl,
        );
        let wizard = RegistrationWizard::mount(self.limiter.clone(), store.clone());
        let view = wizard.view();

        let id = next_session_id();
        self.tabs
            .lock()
            .expect("session registry mutex poisoned")
            .insert(
                id.clone(),
                Tab {
                    store,
                    wizard: Arc::new(Mutex::new(wizard)),
                    countdown: None,
                    last_active: self.clock.now(),
                    submitted: false,
                },
            );
        info!(session = %id, "registration session opened");
        (id, view)
    }

    pub fn view(&self, id: &SessionId) -> Result<WizardView, RegistrationServiceError> {
        self.with_wizard(id, |wizard| Ok(wizard.view()))
    }

    pub fn apply(
        &self,
        id: &SessionId,
        edit: FieldEdit,
    ) -> Result<WizardView, RegistrationServiceError> {
        self.with_wizard(id, |wizard| {
            wizard.apply(edit)?;
            Ok(wizard.view())
        })
    }

    pub fn select_document(
        &self,
        id: &SessionId,
        slot: DocumentSlot,
        file: Option<UploadedFile>,
    ) -> Result<WizardView, RegistrationServiceError> {
        self.with_wizard(id, |wizard| {
            wizard.select_document(slot, file)?;
            Ok(wizard.view())
        })
    }

    pub fn next(&self, id: &SessionId) -> Result<WizardView, RegistrationServiceError> {
        self.with_wizard(id, |wizard| {
            wizard.next()?;
            Ok(wizard.view())
        })
    }

    pub fn previous(&self, id: &SessionId) -> Result<WizardView, RegistrationServiceError> {
        self.with_wizard(id, |wizard| {
            wizard.previous()?;
            Ok(wizard.view())
        })
    }

    /// Submit the session's application. A rate-limit refusal arms the lockout countdown when a
    /// tokio runtime is available to drive it.
    pub fn submit(&self, id: &SessionId) -> Result<ApplicationRecord, RegistrationServiceError> {
        let wizard = self.wizard(id)?;
        let outcome = wizard.lock().expect("wizard mutex poisoned").submit();

        match outcome {
            Ok(record) => {
                if let Some(tab) = self
                    .tabs
                    .lock()
                    .expect("session registry mutex poisoned")
                    .get_mut(id)
                {
                    tab.submitted = true;
                }
                info!(session = %id, "registration session completed");
                Ok(record)
            }
            Err(err @ WizardError::RateLimited { .. }) => {
                self.arm_countdown(id, &wizard);
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Simulate a page reload: the wizard is remounted over the session's existing storage.
    /// Step position, errors, documents and any lockout banner are lost; the draft is restored.
    pub fn reload(&self, id: &SessionId) -> Result<WizardView, RegistrationServiceError> {
        let mut tabs = self.tabs.lock().expect("session registry mutex poisoned");
        let tab = tabs
            .get_mut(id)
            .ok_or_else(|| RegistrationServiceError::UnknownSession(id.clone()))?;

        let wizard = RegistrationWizard::mount(self.limiter.clone(), tab.store.clone());
        let view = wizard.view();
        tab.wizard = Arc::new(Mutex::new(wizard));
        tab.countdown = None;
        tab.last_active = self.clock.now();
        tab.submitted = false;
        debug!(session = %id, "registration session reloaded");
        Ok(view)
    }

    /// Close a session, dropping its storage scope. Returns whether it existed.
    pub fn close(&self, id: &SessionId) -> bool {
        let removed = self
            .tabs
            .lock()
            .expect("session registry mutex poisoned")
            .remove(id);
        if removed.is_some() {
            debug!(session = %id, "registration session closed");
        }
        removed.is_some()
    }

    /// Sweep expired or rejected entries from every session's storage.
    pub fn cleanup_storage(&self) -> usize {
        let stores: Vec<(SessionId, SecureStore<S>)> = self
            .tabs
            .lock()
            .expect("session registry mutex poisoned")
            .iter()
            .map(|(id, tab)| (id.clone(), tab.store.clone()))
            .collect();

        stores
            .into_iter()
            .map(|(id, store)| match store.cleanup() {
                Ok(removed) => removed,
                Err(err) => {
                    warn!(session = %id, error = %err, "session storage sweep failed");
                    0
                }
            })
            .sum()
    }

    /// Drop sessions that were submitted or have sat idle for longer than the draft TTL.
    /// Returns how many were removed.
    pub fn expire_sessions(&self) -> usize {
        let now = self.clock.now();
        let mut tabs = self.tabs.lock().expect("session registry mutex poisoned");
        let before = tabs.len();
        tabs.retain(|id, tab| {
            let stale = tab.is_stale(now, self.draft_ttl);
            if stale {
                debug!(session = %id, submitted = tab.submitted, "registration session expired");
            }
            !stale
        });
        before - tabs.len()
    }

    /// Look up a session's wizard, counting the lookup as activity.
    fn wizard(&self, id: &SessionId) -> Result<SharedWizard<S>, RegistrationServiceError> {
        let now = self.clock.now();
        let mut tabs = self.tabs.lock().expect("session registry mutex poisoned");
        let tab = tabs
            .get_mut(id)
            .ok_or_else(|| RegistrationServiceError::UnknownSession(id.clone()))?;
        tab.last_active = now;
        Ok(tab.wizard.clone())
    }

    fn with_wizard<T>(
        &self,
        id: &SessionId,
        action: impl FnOnce(&mut RegistrationWizard<S>) -> Result<T, WizardError>,
    ) -> Result<T, RegistrationServiceError> {
        let wizard = self.wizard(id)?;
        let mut wizard = wizard.lock().expect("wizard mutex poisoned");
        Ok(action(&mut *wizard)?)
    }

    fn arm_countdown(&self, id: &SessionId, wizard: &SharedWizard<S>) {
        if tokio::runtime::Handle::try_current().is_err() {
            return;
        }

        let mut tabs = self.tabs.lock().expect("session registry mutex poisoned");
        let Some(tab) = tabs.get_mut(id) else {
            return;
        };
        // a reload between submit and here swapped the wizard out
        if !Arc::ptr_eq(&tab.wizard, wizard) {
            return;
        }
        let running = tab
            .countdown
            .as_ref()
            .is_some_and(|countdown| !countdown.is_finished());
        if !running {
            tab.countdown = Some(CountdownTimer::start(Arc::downgrade(wizard)));
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationServiceError {
    #[error("unknown registration session `{0}`")]
    UnknownSession(SessionId),
    #[error(transparent)]
    Wizard(#[from] WizardError),
}
