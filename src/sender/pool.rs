//! Bounded worker pool executing dispatch jobs off the caller's thread.
//!
//! The pool owns a dedicated multi-thread tokio runtime with `max_threads`
//! OS threads. Jobs are picked up by worker loops, each running one job at a
//! time, so no more than `max_threads` jobs are ever in flight.
//!
//! With a bounded queue the pool admits at most `max_threads + max_queue`
//! jobs at once, counting both running and pending ones. Each admitted job
//! holds a permit until it finishes. When no permit is left the
//! [`OverflowPolicy`] decides what happens to the submitter: it is either
//! refused with [`Error::Submission`] or blocked until a job completes. A
//! job is never dropped silently.
//!
//! `min_threads` worker loops start eagerly. Another loop is started
//! whenever pending jobs outnumber idle workers, up to `max_threads`.

use crate::{Error, Result};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub type Job = BoxFuture<'static, ()>;

/// What a submitter experiences when the pool is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Refuse the job with [`Error::Submission`].
    #[default]
    Reject,
    /// Park the submitting thread until a running job finishes.
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    pub min_threads: usize,
    pub max_threads: usize,
    pub max_queue: Option<usize>,
    pub overflow: OverflowPolicy,
}

impl PoolOptions {
    pub fn validate(&self) -> Result<()> {
        if self.min_threads == 0 {
            return Err(invalid("worker_min_threads", self.min_threads, "at least 1".to_string()));
        }

        if self.max_threads < self.min_threads {
            return Err(invalid(
                "worker_max_threads",
                self.max_threads,
                format!("at least worker_min_threads ({})", self.min_threads),
            ));
        }

        if self.max_queue == Some(0) {
            return Err(invalid(
                "worker_max_queue",
                0,
                "at least 1, or unset for an unbounded queue".to_string(),
            ));
        }

        Ok(())
    }

    /// Jobs admitted at once, running plus pending. `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.max_queue.map(|queue| self.max_threads + queue)
    }
}

fn invalid(field: &str, value: usize, expected: String) -> Error {
    Error::InvalidConfigValue {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    }
}

/// Point-in-time counters of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub idle: usize,
    pub active: usize,
    pub queued: usize,
    pub completed: u64,
}

impl PoolStats {
    /// Jobs accepted but not finished.
    pub fn pending(&self) -> usize {
        self.queued + self.active
    }
}

struct Task {
    job: Job,
    // released when the job finishes
    _permit: Option<OwnedSemaphorePermit>,
}

struct Shared {
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<Task>>,
    live: AtomicUsize,
    idle: AtomicUsize,
    active: AtomicUsize,
    queued: AtomicUsize,
    completed: AtomicU64,
}

pub struct WorkerPool {
    options: PoolOptions,
    queue: RwLock<Option<mpsc::UnboundedSender<Task>>>,
    admission: Option<Arc<Semaphore>>,
    shared: Arc<Shared>,
    handle: Handle,
    runtime: Mutex<Option<Runtime>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    spawned: AtomicUsize,
}

impl WorkerPool {
    pub fn new(options: PoolOptions) -> Result<Self> {
        options.validate()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(options.max_threads)
            .thread_name("kafka-rest-worker")
            .enable_all()
            .build()?;

        let (queue, receiver) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            receiver: tokio::sync::Mutex::new(receiver),
            live: AtomicUsize::new(0),
            idle: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
        });

        let pool = Self {
            options,
            queue: RwLock::new(Some(queue)),
            admission: options.capacity().map(|permits| Arc::new(Semaphore::new(permits))),
            shared,
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            workers: Mutex::new(Vec::with_capacity(options.max_threads)),
            spawned: AtomicUsize::new(0),
        };

        for _ in 0..options.min_threads {
            pool.shared.live.fetch_add(1, Ordering::SeqCst);
            pool.spawn_worker();
        }

        info!(
            min_threads = options.min_threads,
            max_threads = options.max_threads,
            max_queue = ?options.max_queue,
            overflow = ?options.overflow,
            "Worker pool started"
        );

        Ok(pool)
    }

    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Queues `job`, applying the overflow policy if the pool is at capacity.
    ///
    /// `topic` only labels the error.
    pub fn submit(&self, topic: &str, job: Job) -> Result<()> {
        if self.is_shut_down() {
            return Err(rejected(topic, "worker pool is shut down".to_string()));
        }

        let permit = self.admit(topic)?;

        let queue = self
            .queue
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| rejected(topic, "worker pool is shut down".to_string()))?;

        self.shared.queued.fetch_add(1, Ordering::SeqCst);
        if queue.send(Task { job, _permit: permit }).is_err() {
            self.shared.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(rejected(topic, "worker pool is shut down".to_string()));
        }
        drop(queue);

        self.maybe_grow();
        Ok(())
    }

    fn admit(&self, topic: &str) -> Result<Option<OwnedSemaphorePermit>> {
        let Some(admission) = &self.admission else {
            return Ok(None);
        };

        let permit = match self.options.overflow {
            OverflowPolicy::Reject => Arc::clone(admission).try_acquire_owned().map_err(|e| match e {
                TryAcquireError::NoPermits => {
                    let stats = self.stats();
                    rejected(
                        topic,
                        format!(
                            "queue is full ({} pending, {} workers busy)",
                            stats.queued, stats.active
                        ),
                    )
                }
                TryAcquireError::Closed => rejected(topic, "worker pool is shut down".to_string()),
            })?,
            OverflowPolicy::Block => futures::executor::block_on(Arc::clone(admission).acquire_owned())
                .map_err(|_| rejected(topic, "worker pool is shut down".to_string()))?,
        };

        Ok(Some(permit))
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.shared.live.load(Ordering::SeqCst),
            idle: self.shared.idle.load(Ordering::SeqCst),
            active: self.shared.active.load(Ordering::SeqCst),
            queued: self.shared.queued.load(Ordering::SeqCst),
            completed: self.shared.completed.load(Ordering::SeqCst),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.queue.read().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    /// Closes the queue and waits up to `timeout` for workers to drain it.
    ///
    /// Jobs still pending after the timeout are abandoned. Submitters blocked
    /// on a full pool are refused. Calling this more than once is a no-op.
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        let queue = self.queue.write().unwrap_or_else(PoisonError::into_inner).take();
        if queue.is_none() {
            return Ok(());
        }
        drop(queue);

        if let Some(admission) = &self.admission {
            admission.close();
        }

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        let Some(runtime) = self.runtime.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            return Ok(());
        };

        info!(
            pending = self.shared.queued.load(Ordering::SeqCst),
            active = self.shared.active.load(Ordering::SeqCst),
            "Shutting down worker pool"
        );

        let drain = runtime.spawn(async move { tokio::time::timeout(timeout, join_all(workers)).await.is_ok() });

        match futures::executor::block_on(drain) {
            Ok(true) => info!(
                completed = self.shared.completed.load(Ordering::SeqCst),
                "Worker pool drained"
            ),
            Ok(false) => warn!(
                abandoned = self.stats().pending(),
                timeout_ms = timeout.as_millis() as u64,
                "Worker pool did not drain in time, abandoning pending messages"
            ),
            Err(e) => warn!(error = %e, "Worker pool drain task failed"),
        }

        runtime.shutdown_background();
        Ok(())
    }

    // Pending jobs outnumbering idle workers means some job has nobody to
    // pick it up yet.
    fn maybe_grow(&self) {
        if self.shared.queued.load(Ordering::SeqCst) <= self.shared.idle.load(Ordering::SeqCst) {
            return;
        }

        let mut live = self.shared.live.load(Ordering::SeqCst);
        while live < self.options.max_threads {
            match self
                .shared
                .live
                .compare_exchange(live, live + 1, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => {
                    if !self.spawn_worker() {
                        self.shared.live.fetch_sub(1, Ordering::SeqCst);
                    }
                    return;
                }
                Err(current) => live = current,
            }
        }
    }

    /// Starts a worker loop unless the pool is shutting down.
    ///
    /// The `workers` lock is held across the check so that `shutdown` joins
    /// every worker that was started.
    fn spawn_worker(&self) -> bool {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_shut_down() {
            return false;
        }

        let index = self.spawned.fetch_add(1, Ordering::SeqCst);
        self.shared.idle.fetch_add(1, Ordering::SeqCst);
        workers.push(self.handle.spawn(run_worker(Arc::clone(&self.shared), index)));

        debug!(worker = index, "Worker started");
        true
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let runtime = self.runtime.get_mut().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(runtime) = runtime {
            let abandoned = self.stats().pending();
            if abandoned > 0 {
                warn!(abandoned, "Worker pool dropped without shutdown, cancelling pending messages");
            } else {
                debug!("Worker pool dropped without shutdown");
            }
            runtime.shutdown_background();
        }
    }
}

// A worker is counted idle from spawn until it dequeues a job.
async fn run_worker(shared: Arc<Shared>, worker: usize) {
    loop {
        let task = {
            let mut receiver = shared.receiver.lock().await;
            receiver.recv().await
        };
        shared.idle.fetch_sub(1, Ordering::SeqCst);

        let Some(task) = task else {
            break;
        };

        shared.queued.fetch_sub(1, Ordering::SeqCst);
        shared.active.fetch_add(1, Ordering::SeqCst);

        let Task { job, _permit: permit } = task;
        if let Err(panic) = AssertUnwindSafe(job).catch_unwind().await {
            error!(worker, panic = %panic_message(&*panic), "Dispatch job panicked");
        }

        shared.active.fetch_sub(1, Ordering::SeqCst);
        shared.completed.fetch_add(1, Ordering::SeqCst);
        shared.idle.fetch_add(1, Ordering::SeqCst);
        drop(permit);
    }

    shared.live.fetch_sub(1, Ordering::SeqCst);
    debug!(worker, "Worker stopped");
}

fn rejected(topic: &str, reason: String) -> Error {
    Error::Submission {
        topic: topic.to_string(),
        reason,
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
