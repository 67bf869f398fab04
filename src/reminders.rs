//! Ties the alarm registry to the scheduler.
//!
//! Every change to the registry or to the id to job mapping happens under one
//! lock, and the scheduler's own lock is only ever taken inside it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Local;
use log::info;

use crate::{
    alarm::{AlarmId, AlarmRequest, AlarmSnapshot},
    content::ContentProvider,
    error::Result,
    registry::AlarmRegistry,
    scheduler::Scheduler,
    speaker::{RetryPolicy, Speaker},
};

/// Why an alarm is being deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOrigin {
    /// the user asked for it
    User,
    /// its trigger had already passed when it was created, so it never got scheduled
    Expired,
    /// it just finished ringing
    RingFinished,
}

impl DeleteOrigin {
    #[must_use]
    pub const fn has_finished_ringing(self) -> bool {
        matches!(self, Self::RingFinished)
    }

    #[must_use]
    pub const fn was_scheduled(self) -> bool {
        !matches!(self, Self::Expired)
    }
}

/// Outcome of [`Reminders::create_alarm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Created {
    Scheduled(AlarmSnapshot),
    /// the trigger was already in the past; the alarm was dropped straight away
    Expired(AlarmSnapshot),
}

impl Created {
    #[must_use]
    pub const fn snapshot(&self) -> &AlarmSnapshot {
        match self {
            Self::Scheduled(snapshot) | Self::Expired(snapshot) => snapshot,
        }
    }
}

struct Inner {
    registry: Mutex<AlarmRegistry>,
    scheduler: Scheduler,
    content: Arc<dyn ContentProvider>,
    speaker: Arc<dyn Speaker>,
    retry: RetryPolicy,
}

impl Inner {
    fn registry(&self) -> MutexGuard<'_, AlarmRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns whether an alarm was actually removed; a second delete of the
    /// same id is a no-op.
    fn delete(&self, registry: &mut AlarmRegistry, id: AlarmId, origin: DeleteOrigin) -> bool {
        if !origin.has_finished_ringing() && origin.was_scheduled() {
            if let Some(handle) = registry.handle(id) {
                if self.scheduler.cancel(handle) {
                    info!("schedule for alarm {id} has been cancelled");
                }
            }
        }
        if origin.was_scheduled() {
            registry.detach(id);
        }
        let removed = registry.remove(id).is_some();
        if removed {
            info!("alarm {id} has been deleted ({origin:?})");
        }
        removed
    }
}

/// The alarm service: create, list and delete alarms that speak when due.
#[derive(Clone)]
pub struct Reminders {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Reminders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reminders")
            .field("alarms", &self.inner.registry().len())
            .field("scheduler", &self.inner.scheduler)
            .finish_non_exhaustive()
    }
}

impl Reminders {
    #[must_use]
    pub fn new(
        content: Arc<dyn ContentProvider>,
        speaker: Arc<dyn Speaker>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(AlarmRegistry::new()),
                scheduler: Scheduler::new(),
                content,
                speaker,
                retry,
            }),
        }
    }

    /// Create an alarm and schedule it to ring at its trigger.
    ///
    /// An alarm whose trigger has already passed is created and deleted again
    /// without ever being scheduled.
    ///
    /// # Errors
    /// if the request's date or time is malformed, or the run-loop can't start
    pub fn create_alarm(&self, request: &AlarmRequest) -> Result<Created> {
        let mut registry = self.inner.registry();
        let alarm = registry.create(request)?;
        let id = alarm.id();
        let snapshot = alarm.snapshot();

        let (due, seconds) = alarm.due(Local::now());
        if seconds < 0 {
            info!("alarm {id} is {} seconds too late to schedule", -seconds);
            self.inner.delete(&mut registry, id, DeleteOrigin::Expired);
            return Ok(Created::Expired(snapshot));
        }

        let content = Arc::clone(&self.inner.content);
        let speaker = Arc::clone(&self.inner.speaker);
        let retry = self.inner.retry;
        let ringing = Arc::clone(&alarm);
        let service: Weak<Inner> = Arc::downgrade(&self.inner);

        let scheduled = self.inner.scheduler.schedule(
            due,
            alarm.priority(),
            move || ringing.ring(content.as_ref(), speaker.as_ref(), &retry),
            move || {
                if let Some(inner) = service.upgrade() {
                    let mut registry = inner.registry();
                    inner.delete(&mut registry, id, DeleteOrigin::RingFinished);
                }
            },
        );
        let handle = match scheduled {
            Ok(handle) => handle,
            Err(e) => {
                registry.remove(id);
                return Err(e);
            }
        };
        registry.attach(id, handle);
        info!("alarm {id} scheduled to ring in {seconds} seconds");
        Ok(Created::Scheduled(snapshot))
    }

    /// Delete an alarm at the user's request, cancelling it if it hasn't
    /// started ringing.
    ///
    /// Returns false if there was no such alarm.
    pub fn delete_alarm(&self, id: AlarmId) -> bool {
        let mut registry = self.inner.registry();
        self.inner.delete(&mut registry, id, DeleteOrigin::User)
    }

    #[must_use]
    pub fn alarms(&self) -> Vec<AlarmSnapshot> {
        self.inner
            .registry()
            .all()
            .iter()
            .map(|alarm| alarm.snapshot())
            .collect()
    }

    #[must_use]
    pub fn lookup(&self, id: AlarmId) -> Option<AlarmSnapshot> {
        self.inner.registry().lookup(id).map(|alarm| alarm.snapshot())
    }

    /// Whether the alarm is still waiting to ring.
    #[must_use]
    pub fn is_scheduled(&self, id: AlarmId) -> bool {
        let registry = self.inner.registry();
        registry
            .handle(id)
            .is_some_and(|handle| self.inner.scheduler.is_pending(handle))
    }

    /// Number of alarms waiting to ring.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.scheduler.pending_len()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::{content::NoContent, error::SpeakError};

    struct Silent;

    impl Speaker for Silent {
        fn say(&self, _text: &str) -> std::result::Result<(), SpeakError> {
            Ok(())
        }
    }

    fn reminders() -> Reminders {
        Reminders::new(Arc::new(NoContent), Arc::new(Silent), RetryPolicy::default())
    }

    fn in_an_hour(message: &str) -> AlarmRequest {
        let at = Local::now().naive_local() + chrono::Duration::hours(1);
        AlarmRequest {
            message: message.to_string(),
            date: at.format("%Y-%m-%d").to_string(),
            time: at.format("%H:%M").to_string(),
            ..AlarmRequest::default()
        }
    }

    #[test]
    fn delete_origin_flags() {
        assert!(DeleteOrigin::User.was_scheduled());
        assert!(!DeleteOrigin::User.has_finished_ringing());
        assert!(!DeleteOrigin::Expired.was_scheduled());
        assert!(DeleteOrigin::RingFinished.has_finished_ringing());
    }

    #[test]
    fn user_delete_cancels_the_schedule() {
        let service = reminders();
        let created = service.create_alarm(&in_an_hour("walk")).unwrap();
        let id = created.snapshot().id;
        assert!(service.is_scheduled(id));
        assert!(service.delete_alarm(id));
        assert!(!service.is_scheduled(id));
        assert_eq!(service.pending(), 0);
        assert!(service.lookup(id).is_none());
    }

    #[test]
    fn deleting_twice_is_harmless() {
        let service = reminders();
        let id = service
            .create_alarm(&in_an_hour("walk"))
            .unwrap()
            .snapshot()
            .id;
        assert!(service.delete_alarm(id));
        assert!(!service.delete_alarm(id));
        assert!(!service.delete_alarm(AlarmId(99)));
    }

    #[test]
    fn concurrent_deletes_remove_once() {
        let service = reminders();
        let id = service
            .create_alarm(&in_an_hour("walk"))
            .unwrap()
            .snapshot()
            .id;
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                thread::spawn(move || service.delete_alarm(id))
            })
            .collect();
        let removed = workers
            .into_iter()
            .map(|worker| worker.join().unwrap())
            .filter(|removed| *removed)
            .count();
        assert_eq!(removed, 1);
        assert!(service.alarms().is_empty());
    }
}
