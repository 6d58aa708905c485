//! ---
//! dab_section: "01-core-protocol"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Request routing, device adapters, and telemetry scheduling."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
//! Periodic telemetry scheduling.
//!
//! One worker thread per adapter drains a time-ordered queue of
//! publishers. Each entry is keyed by its next fire time; the worker
//! sleeps on a condition variable until the head is due, invokes the
//! producer, publishes the sample, and reinserts the entry one interval
//! ahead. Ticks for distinct subjects are serialized on purpose: a slow
//! producer delays other subjects rather than fanning out unbounded
//! work.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dab_json::JsonValue;
use tracing::{debug, warn};

use crate::error::DabResult;
use crate::publish::{publish_message, Publisher};

/// Produces one telemetry sample per tick.
pub type TelemetryProducer = Box<dyn FnMut() -> DabResult<JsonValue> + Send>;

struct TelemetryEntry {
    subject_id: String,
    publish_topic: String,
    interval: Duration,
    producer: TelemetryProducer,
}

/// Queue keyed by `(next_fire, seq)`; the sequence number breaks ties in
/// insertion order. At most one entry exists per subject.
#[derive(Default)]
struct Queue {
    entries: BTreeMap<(Instant, u64), TelemetryEntry>,
    next_seq: u64,
    exiting: bool,
}

impl Queue {
    fn sequence(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

struct Shared {
    queue: Mutex<Queue>,
    wakeup: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().expect("telemetry queue poisoned")
    }
}

/// Cloneable handle for inserting, updating, and removing entries. The
/// adapter's telemetry start/stop operations drive the scheduler through
/// this.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Insert or update the entry for `subject_id`. An existing subject
    /// keeps its scheduled fire time and only changes cadence; a new
    /// subject is scheduled for now, so the first sample publishes
    /// immediately.
    pub fn add(
        &self,
        subject_id: &str,
        interval: Duration,
        publish_topic: String,
        producer: TelemetryProducer,
    ) {
        {
            let mut queue = self.shared.lock();
            let key = queue
                .entries
                .iter()
                .find(|(_, entry)| entry.subject_id == subject_id)
                .map(|(key, _)| *key);
            match key {
                Some(key) => {
                    // the fire time already scheduled stays put, only the
                    // cadence changes
                    if let Some(entry) = queue.entries.get_mut(&key) {
                        entry.interval = interval;
                    }
                }
                None => {
                    let seq = queue.sequence();
                    queue.entries.insert(
                        (Instant::now(), seq),
                        TelemetryEntry {
                            subject_id: subject_id.to_owned(),
                            publish_topic,
                            interval,
                            producer,
                        },
                    );
                }
            }
        }
        self.shared.wakeup.notify_all();
    }

    /// Remove the entry for `subject_id`. Removing an unknown subject is
    /// a no-op.
    pub fn remove(&self, subject_id: &str) {
        {
            let mut queue = self.shared.lock();
            let key = queue
                .entries
                .iter()
                .find(|(_, entry)| entry.subject_id == subject_id)
                .map(|(key, _)| *key);
            if let Some(key) = key {
                queue.entries.remove(&key);
            }
        }
        self.shared.wakeup.notify_all();
    }

    /// True when an entry exists for `subject_id`.
    #[must_use]
    pub fn contains(&self, subject_id: &str) -> bool {
        self.shared
            .lock()
            .entries
            .values()
            .any(|entry| entry.subject_id == subject_id)
    }

    /// Configured cadence for `subject_id`, if scheduled.
    #[must_use]
    pub fn interval(&self, subject_id: &str) -> Option<Duration> {
        self.shared
            .lock()
            .entries
            .values()
            .find(|entry| entry.subject_id == subject_id)
            .map(|entry| entry.interval)
    }

    /// Number of scheduled subjects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.lock().entries.len()
    }

    /// True when nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owns the worker thread. Dropping the scheduler signals the worker and
/// joins it, so no publish can outlive the owning adapter.
pub struct TelemetryScheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl TelemetryScheduler {
    /// Spawn the worker, publishing samples through `publisher`.
    #[must_use]
    pub fn spawn(publisher: Publisher) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            wakeup: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("dab-telemetry".into())
            .spawn(move || worker_loop(&worker_shared, &publisher))
            .expect("spawn telemetry worker");
        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Handle for queue mutation and inspection.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for TelemetryScheduler {
    fn drop(&mut self) {
        self.shared.lock().exiting = true;
        self.shared.wakeup.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: &Shared, publisher: &Publisher) {
    loop {
        let mut queue = shared.lock();
        queue = match queue.entries.keys().next().copied() {
            None => shared
                .wakeup
                .wait(queue)
                .expect("telemetry queue poisoned"),
            Some((next_fire, _)) => {
                let timeout = next_fire.saturating_duration_since(Instant::now());
                shared
                    .wakeup
                    .wait_timeout(queue, timeout)
                    .expect("telemetry queue poisoned")
                    .0
            }
        };
        if queue.exiting {
            return;
        }
        let now = Instant::now();
        let due = queue
            .entries
            .keys()
            .next()
            .copied()
            .filter(|(next_fire, _)| *next_fire <= now);
        let Some(key) = due else {
            continue;
        };
        let mut entry = queue.entries.remove(&key).expect("due entry present");
        match (entry.producer)() {
            Ok(payload) => {
                debug!(subject = %entry.subject_id, topic = %entry.publish_topic, "telemetry tick");
                publisher.publish(&publish_message(&entry.publish_topic, payload));
            }
            Err(err) => {
                // a failing producer loses this tick but keeps its slot
                warn!(
                    subject = %entry.subject_id,
                    topic = %entry.publish_topic,
                    error = %err,
                    "telemetry producer failed, dropping tick"
                );
            }
        }
        let seq = queue.sequence();
        queue.entries.insert((Instant::now() + entry.interval, seq), entry);
    }
}
