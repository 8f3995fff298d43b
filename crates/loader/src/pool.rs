//! Bounded worker pool with idle keep-alive.
//!
//! Workers are spawned lazily when queued jobs outnumber idle workers, up to
//! `max_workers`. A worker that waits longer than `keep_alive` without work
//! exits; the next burst spawns fresh ones.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use tracing::{debug, warn};

use crate::error::PoolError;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    queue: VecDeque<Job>,
    live: usize,
    idle: usize,
    running: usize,
    spawned: u64,
    shutdown: bool,
}

struct Shared {
    name: String,
    max_workers: usize,
    keep_alive: Duration,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A fixed-maximum pool of named background threads.
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    pub fn new(name: impl Into<String>, max_workers: usize, keep_alive: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                max_workers: max_workers.max(1),
                keep_alive,
                state: Mutex::new(PoolState {
                    queue: VecDeque::new(),
                    live: 0,
                    idle: 0,
                    running: 0,
                    spawned: 0,
                    shutdown: false,
                }),
                available: Condvar::new(),
            }),
        }
    }

    /// Queue a job; spawns a worker if none is free and the pool has room.
    pub fn execute<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.lock();
        if state.shutdown {
            return Err(PoolError::ShutDown);
        }
        state.queue.push_back(Box::new(job));

        if state.queue.len() <= state.idle {
            self.shared.available.notify_one();
            return Ok(());
        }
        if state.live >= self.shared.max_workers {
            // Every worker is busy; the job waits its turn.
            return Ok(());
        }

        state.live += 1;
        state.spawned += 1;
        let worker_name = format!("{}-{}", self.shared.name, state.spawned);
        let shared = Arc::clone(&self.shared);
        let spawn = thread::Builder::new()
            .name(worker_name.clone())
            .spawn(move || worker_loop(shared));

        match spawn {
            Ok(_) => {
                debug!(worker = %worker_name, live = state.live, "spawned pool worker");
                Ok(())
            }
            Err(e) => {
                state.live -= 1;
                if state.live == 0 {
                    // Nobody would ever run it.
                    state.queue.pop_back();
                    return Err(PoolError::Spawn(e));
                }
                warn!(worker = %worker_name, error = %e, "failed to spawn extra pool worker");
                Ok(())
            }
        }
    }

    /// Run `job` on the pool and hand its output to `on_reply`, which also
    /// runs on the pool thread.
    pub fn post_and_reply<T, J, R>(&self, job: J, on_reply: R) -> Result<(), PoolError>
    where
        T: Send + 'static,
        J: FnOnce() -> T + Send + 'static,
        R: FnOnce(T) + Send + 'static,
    {
        self.execute(move || on_reply(job()))
    }

    /// Run `job` on the pool and block until it finishes or `timeout` passes.
    ///
    /// A timed-out job is not cancelled; it still runs to completion.
    pub fn post_and_wait<T, J>(&self, job: J, timeout: Duration) -> Result<T, PoolError>
    where
        T: Send + 'static,
        J: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.execute(move || {
            // The waiter may have given up already.
            let _ = tx.send(job());
        })?;
        match rx.recv_timeout(timeout) {
            Ok(value) => Ok(value),
            Err(RecvTimeoutError::Timeout) => Err(PoolError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(PoolError::Abandoned),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn max_workers(&self) -> usize {
        self.shared.max_workers
    }

    pub fn keep_alive(&self) -> Duration {
        self.shared.keep_alive
    }

    /// Worker threads currently alive, busy or idle.
    pub fn live_workers(&self) -> usize {
        self.shared.lock().live
    }

    pub fn idle_workers(&self) -> usize {
        self.shared.lock().idle
    }

    /// Workers currently running a job.
    pub fn busy_workers(&self) -> usize {
        self.shared.lock().running
    }

    pub fn queued_jobs(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Stop accepting jobs. Queued jobs still run; workers then exit.
    pub fn shutdown(&self) {
        let mut state = self.shared.lock();
        if !state.shutdown {
            state.shutdown = true;
            debug!(pool = %self.shared.name, queued = state.queue.len(), "pool shutting down");
            self.shared.available.notify_all();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut state = shared.lock();
            let deadline = Instant::now() + shared.keep_alive;
            loop {
                if let Some(job) = state.queue.pop_front() {
                    state.running += 1;
                    break job;
                }
                let now = Instant::now();
                if state.shutdown || now >= deadline {
                    state.live -= 1;
                    debug!(
                        worker = thread::current().name().unwrap_or("pool-worker"),
                        live = state.live,
                        "pool worker exiting"
                    );
                    return;
                }
                state.idle += 1;
                let (guard, _) = shared
                    .available
                    .wait_timeout(state, deadline - now)
                    .unwrap_or_else(|e| e.into_inner());
                state = guard;
                state.idle -= 1;
            }
        };

        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            warn!(pool = %shared.name, "pool job panicked");
        }
        shared.lock().running -= 1;
    }
}
