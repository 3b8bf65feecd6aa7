use std::sync::{Mutex, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::store::SessionStorage;
use super::wizard::{RegistrationWizard, COUNTDOWN_TICK_SECONDS};

/// Background ticker that re-checks a wizard's lockout every second and clears it once the
/// deadline passes.
///
/// The task holds only a weak handle, so closing the session ends it on the next tick.
/// Dropping the timer aborts the task.
#[derive(Debug)]
pub struct CountdownTimer {
    handle: JoinHandle<()>,
}

impl CountdownTimer {
    /// Spawn onto the current tokio runtime. Panics outside a runtime, like `tokio::spawn`.
    pub fn start<S>(wizard: Weak<Mutex<RegistrationWizard<S>>>) -> Self
    where
        S: SessionStorage + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(COUNTDOWN_TICK_SECONDS));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(wizard) = wizard.upgrade() else {
                    break;
                };
                let still_active = wizard
                    .lock()
                    .expect("wizard mutex poisoned")
                    .tick_rate_limit();
                if !still_active {
                    break;
                }
            }
        });

        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
