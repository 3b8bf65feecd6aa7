use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use super::service::RegistrationService;
use super::store::SessionStorage;

/// How often the periodic sweeps run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HousekeepingSchedule {
    pub limiter_sweep: Duration,
    pub storage_sweep: Duration,
}

impl Default for HousekeepingSchedule {
    fn default() -> Self {
        Self {
            limiter_sweep: Duration::from_secs(5 * 60),
            storage_sweep: Duration::from_secs(10 * 60),
        }
    }
}

/// Background sweeps of idle rate-limiter entries, expired drafts and stale sessions.
/// Dropping it stops both tasks.
#[derive(Debug)]
pub struct Housekeeping {
    limiter_task: JoinHandle<()>,
    storage_task: JoinHandle<()>,
}

impl Housekeeping {
    pub fn spawn<S>(service: Arc<RegistrationService<S>>, schedule: HousekeepingSchedule) -> Self
    where
        S: SessionStorage + Default + 'static,
    {
        let limiter = service.limiter().clone();
        let limiter_task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(schedule.limiter_sweep);
            timer.tick().await;
            loop {
                timer.tick().await;
                let removed = limiter.cleanup();
                debug!(removed, "rate limiter sweep");
            }
        });

        let storage_task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(schedule.storage_sweep);
            timer.tick().await;
            loop {
                timer.tick().await;
                let removed = service.cleanup_storage();
                let expired = service.expire_sessions();
                debug!(removed, expired, "session storage sweep");
            }
        });

        Self {
            limiter_task,
            storage_task,
        }
    }

    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for Housekeeping {
    fn drop(&mut self) {
        self.limiter_task.abort();
        self.storage_task.abort();
    }
}
