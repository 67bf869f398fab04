//! Deferred execution of alarm rings on a background run-loop.
//!
//! Jobs wait in a queue ordered by due time, then by priority (higher first),
//! then by the order they were scheduled in. A single run-loop thread pops the
//! next due job and runs it inline; it is started on demand and exits once the
//! queue is empty.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashMap},
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread,
    time::{Duration, SystemTime},
};

use log::{debug, error};

use crate::error::{Error, Result};

type Action = Box<dyn FnOnce() + Send>;

/// Token for a scheduled job, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduledHandle(u64);

/// Where a live job is. Cancelled and finished jobs are forgotten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Firing,
    /// fired, its completion callback is running
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    due: SystemTime,
    priority: Reverse<u32>,
    seq: u64,
}

struct Job {
    fire: Action,
    on_complete: Action,
}

#[derive(Default)]
struct Queue {
    pending: BTreeMap<QueueKey, Job>,
    keys: HashMap<ScheduledHandle, QueueKey>,
    /// live jobs only
    states: HashMap<ScheduledHandle, JobState>,
    next_seq: u64,
    running: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<Queue>,
    wakeup: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the run-loop; clones share the same queue.
#[derive(Clone, Default)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.shared.lock();
        f.debug_struct("Scheduler")
            .field("pending", &queue.pending.len())
            .field("running", &queue.running)
            .finish()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `fire` to run at `due`; `on_complete` runs right after it.
    ///
    /// A `due` in the past runs as soon as the run-loop gets to it.
    ///
    /// # Errors
    /// if the run-loop thread had to be started and couldn't be
    pub fn schedule<F, C>(
        &self,
        due: SystemTime,
        priority: u32,
        fire: F,
        on_complete: C,
    ) -> Result<ScheduledHandle>
    where
        F: FnOnce() + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let mut queue = self.shared.lock();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        let handle = ScheduledHandle(seq);
        let key = QueueKey {
            due,
            priority: Reverse(priority),
            seq,
        };
        queue.pending.insert(
            key,
            Job {
                fire: Box::new(fire),
                on_complete: Box::new(on_complete),
            },
        );
        queue.keys.insert(handle, key);
        queue.states.insert(handle, JobState::Pending);

        if queue.running {
            self.shared.wakeup.notify_all();
        } else {
            let shared = Arc::clone(&self.shared);
            thread::Builder::new()
                .name("alarm-run-loop".to_string())
                .spawn(move || run(&shared))
                .map_err(|e| {
                    // nothing will ever run it
                    queue.pending.remove(&key);
                    queue.keys.remove(&handle);
                    queue.states.remove(&handle);
                    Error::RunLoop(e)
                })?;
            queue.running = true;
        }
        Ok(handle)
    }

    /// [`schedule`](Self::schedule) relative to now.
    ///
    /// # Errors
    /// if the run-loop thread couldn't be started
    pub fn schedule_in<F, C>(
        &self,
        delay: Duration,
        priority: u32,
        fire: F,
        on_complete: C,
    ) -> Result<ScheduledHandle>
    where
        F: FnOnce() + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.schedule(SystemTime::now() + delay, priority, fire, on_complete)
    }

    /// Drop a job that hasn't started yet.
    ///
    /// Returns false (and does nothing) if the job is already firing, has
    /// finished, or was cancelled before.
    pub fn cancel(&self, handle: ScheduledHandle) -> bool {
        let mut queue = self.shared.lock();
        let Some(key) = queue.keys.remove(&handle) else {
            return false;
        };
        queue.pending.remove(&key);
        queue.states.remove(&handle);
        self.shared.wakeup.notify_all();
        debug!("cancelled job {}", handle.0);
        true
    }

    /// `None` once the job has been cancelled or has fully run.
    #[must_use]
    pub fn state(&self, handle: ScheduledHandle) -> Option<JobState> {
        self.shared.lock().states.get(&handle).copied()
    }

    #[must_use]
    pub fn is_pending(&self, handle: ScheduledHandle) -> bool {
        self.shared.lock().keys.contains_key(&handle)
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Number of jobs the scheduler still keeps state for, pending or firing.
    #[must_use]
    pub fn tracked_len(&self) -> usize {
        self.shared.lock().states.len()
    }
}

fn run(shared: &Shared) {
    debug!("run-loop started");
    let mut queue = shared.lock();
    loop {
        let Some(&key) = queue.pending.keys().next() else {
            queue.running = false;
            debug!("run-loop idle, exiting");
            return;
        };
        if let Ok(wait) = key.due.duration_since(SystemTime::now()) {
            if !wait.is_zero() {
                queue = shared
                    .wakeup
                    .wait_timeout(queue, wait)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
                continue;
            }
        }

        let Some(job) = queue.pending.remove(&key) else {
            continue;
        };
        let handle = ScheduledHandle(key.seq);
        queue.keys.remove(&handle);
        queue.states.insert(handle, JobState::Firing);
        drop(queue);

        if panic::catch_unwind(AssertUnwindSafe(job.fire)).is_err() {
            error!("job {} panicked while firing", key.seq);
        }

        shared.lock().states.insert(handle, JobState::Completed);
        if panic::catch_unwind(AssertUnwindSafe(job.on_complete)).is_err() {
            error!("job {} panicked while completing", key.seq);
        }
        queue = shared.lock();
        queue.states.remove(&handle);
    }
}
