//! Delivery of completion notifications onto the caller's execution context.
//!
//! A [`Subscriber`] pairs a callback with the [`ExecutionContext`] that issued
//! the request. [`CallbackDispatcher`] never runs a callback on the thread
//! that produced the result; it posts a task to the origin context instead.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::loader::LoadResult;

/// A unit of work posted to an execution context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Somewhere tasks can be scheduled: a thread, an event loop, a queue.
pub trait ExecutionContext: Send + Sync {
    /// Schedule `task` to run on this context. Never runs it inline.
    fn post(&self, task: Task) -> Result<(), DispatchError>;

    /// Human-readable name used in logs.
    fn name(&self) -> &str;
}

// ── Subscriber ───────────────────────────────────────────────────────

enum Delivery {
    Callback {
        context: Arc<dyn ExecutionContext>,
        callback: Box<dyn FnOnce(LoadResult) + Send + 'static>,
    },
    Channel(oneshot::Sender<LoadResult>),
}

/// Someone waiting for the outcome of a load.
pub struct Subscriber {
    delivery: Delivery,
}

impl Subscriber {
    /// Invoke `callback` on `context` once the load completes.
    pub fn new<F>(context: Arc<dyn ExecutionContext>, callback: F) -> Self
    where
        F: FnOnce(LoadResult) + Send + 'static,
    {
        Self {
            delivery: Delivery::Callback {
                context,
                callback: Box::new(callback),
            },
        }
    }

    /// Deliver the outcome as a message; the receiver can be awaited.
    pub fn channel() -> (Self, oneshot::Receiver<LoadResult>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                delivery: Delivery::Channel(tx),
            },
            rx,
        )
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.delivery {
            Delivery::Callback { context, .. } => {
                f.debug_struct("Subscriber").field("context", &context.name()).finish()
            }
            Delivery::Channel(_) => f.debug_struct("Subscriber").field("context", &"channel").finish(),
        }
    }
}

// ── CallbackDispatcher ───────────────────────────────────────────────

/// Routes results to subscribers on their origin contexts.
pub struct CallbackDispatcher;

impl CallbackDispatcher {
    /// Deliver `result` to one subscriber. A closed context drops the
    /// notification with a warning.
    pub fn dispatch(subscriber: Subscriber, result: LoadResult) {
        match subscriber.delivery {
            Delivery::Callback { context, callback } => {
                let name = context.name().to_string();
                if let Err(e) = context.post(Box::new(move || callback(result))) {
                    warn!(context = %name, error = %e, "dropping font load notification");
                }
            }
            Delivery::Channel(tx) => {
                if tx.send(result).is_err() {
                    debug!("font load receiver dropped before completion");
                }
            }
        }
    }

    /// Deliver the same result to every subscriber, in order.
    pub fn dispatch_all(subscribers: Vec<Subscriber>, result: &LoadResult) {
        for subscriber in subscribers {
            Self::dispatch(subscriber, result.clone());
        }
    }
}

fn run_task(context: &str, task: Task) {
    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
        warn!(context = %context, "task panicked");
    }
}

// ── LoopThread ───────────────────────────────────────────────────────

/// A dedicated thread running posted tasks one at a time, in order.
///
/// The thread exits once every handle to it has been dropped.
#[derive(Clone)]
pub struct LoopThread {
    name: String,
    sender: Sender<Task>,
    thread_id: ThreadId,
}

impl LoopThread {
    pub fn spawn(name: impl Into<String>) -> std::io::Result<Arc<Self>> {
        let name = name.into();
        let (sender, receiver) = crossbeam_channel::unbounded::<Task>();
        let loop_name = name.clone();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            debug!(context = %loop_name, "loop thread started");
            for task in receiver {
                run_task(&loop_name, task);
            }
            debug!(context = %loop_name, "loop thread stopped");
        })?;
        Ok(Arc::new(Self {
            name,
            sender,
            thread_id: handle.thread().id(),
        }))
    }

    /// Id of the thread tasks run on.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }
}

impl ExecutionContext for LoopThread {
    fn post(&self, task: Task) -> Result<(), DispatchError> {
        self.sender
            .send(task)
            .map_err(|_| DispatchError::Closed(self.name.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ── TaskQueue ────────────────────────────────────────────────────────

/// A queue drained by whichever thread owns it, e.g. a UI thread's message
/// pump. Hand out [`QueueContext`]s to let other threads post into it.
pub struct TaskQueue {
    name: String,
    sender: Sender<Task>,
    receiver: Receiver<Task>,
}

/// Posting side of a [`TaskQueue`].
pub struct QueueContext {
    name: String,
    sender: Sender<Task>,
}

impl TaskQueue {
    pub fn new(name: impl Into<String>) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            name: name.into(),
            sender,
            receiver,
        }
    }

    pub fn context(&self) -> Arc<QueueContext> {
        Arc::new(QueueContext {
            name: self.name.clone(),
            sender: self.sender.clone(),
        })
    }

    /// Run every task already queued. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            run_task(&self.name, task);
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one task and run it.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => {
                run_task(&self.name, task);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl ExecutionContext for QueueContext {
    fn post(&self, task: Task) -> Result<(), DispatchError> {
        self.sender
            .send(task)
            .map_err(|_| DispatchError::Closed(self.name.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ── TokioContext ─────────────────────────────────────────────────────

/// Runs posted tasks on a tokio runtime, one at a time in posting order.
///
/// A single drain task pulls from an unbounded channel and hands each task to
/// the blocking pool, awaiting it before taking the next. Once the runtime
/// shuts down the drain task is gone and posts fail with
/// [`DispatchError::Closed`].
pub struct TokioContext {
    name: String,
    sender: mpsc::UnboundedSender<Task>,
}

impl TokioContext {
    pub fn new(name: impl Into<String>, handle: tokio::runtime::Handle) -> Arc<Self> {
        let name = name.into();
        let (sender, mut receiver) = mpsc::unbounded_channel::<Task>();
        let drain_name = name.clone();
        handle.spawn(async move {
            while let Some(task) = receiver.recv().await {
                let task_name = drain_name.clone();
                if let Err(e) = tokio::task::spawn_blocking(move || run_task(&task_name, task)).await {
                    warn!(context = %drain_name, error = %e, "task did not complete");
                }
            }
            debug!(context = %drain_name, "tokio context drained");
        });
        Arc::new(Self { name, sender })
    }

    /// Context for the runtime the caller is currently inside.
    pub fn current(name: impl Into<String>) -> Arc<Self> {
        Self::new(name, tokio::runtime::Handle::current())
    }
}

impl ExecutionContext for TokioContext {
    fn post(&self, task: Task) -> Result<(), DispatchError> {
        self.sender
            .send(task)
            .map_err(|_| DispatchError::Closed(self.name.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use fontreq_core::LoadError;

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn queue_runs_posted_tasks_in_order() {
        let queue = TaskQueue::new("test-queue");
        let ctx = queue.context();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let seen = Arc::clone(&seen);
            ctx.post(Box::new(move || seen.lock().unwrap().push(i))).unwrap();
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.run_pending(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn closed_queue_rejects_posts() {
        let queue = TaskQueue::new("gone");
        let ctx = queue.context();
        drop(queue);
        assert_eq!(
            ctx.post(Box::new(|| {})).unwrap_err(),
            DispatchError::Closed("gone".into())
        );
    }

    #[test]
    fn dispatch_runs_callback_on_loop_thread() {
        let looper = LoopThread::spawn("test-loop").unwrap();
        let expected = looper.thread_id();
        let (tx, rx) = crossbeam_channel::bounded(1);

        let subscriber = Subscriber::new(looper, move |result: LoadResult| {
            tx.send((thread::current().id(), result)).unwrap();
        });
        CallbackDispatcher::dispatch(subscriber, Err(LoadError::ResourceNotFound));

        let (ran_on, result) = rx.recv_timeout(WAIT).unwrap();
        assert_eq!(ran_on, expected);
        assert_eq!(result.unwrap_err(), LoadError::ResourceNotFound);
    }

    #[test]
    fn dispatch_to_closed_context_is_dropped() {
        let queue = TaskQueue::new("closed");
        let ctx = queue.context();
        drop(queue);
        let subscriber = Subscriber::new(ctx, |_| panic!("must not run"));
        CallbackDispatcher::dispatch(subscriber, Err(LoadError::LoadFailed));
    }

    #[test]
    fn panicking_task_does_not_kill_loop() {
        let looper = LoopThread::spawn("panicky").unwrap();
        looper.post(Box::new(|| panic!("boom"))).unwrap();
        let (tx, rx) = crossbeam_channel::bounded(1);
        looper.post(Box::new(move || tx.send(()).unwrap())).unwrap();
        assert!(rx.recv_timeout(WAIT).is_ok());
    }

    #[tokio::test]
    async fn channel_subscriber_delivers_message() {
        let (subscriber, rx) = Subscriber::channel();
        CallbackDispatcher::dispatch(subscriber, Err(LoadError::CertificateMismatch));
        assert_eq!(rx.await.unwrap().unwrap_err(), LoadError::CertificateMismatch);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tokio_context_runs_task() {
        let ctx = TokioContext::current("rt");
        let (tx, rx) = oneshot::channel();
        ctx.post(Box::new(move || {
            tx.send(7).ok();
        }))
        .unwrap();
        assert_eq!(rx.await.unwrap(), 7);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tokio_context_runs_tasks_in_posting_order() {
        let ctx = TokioContext::current("rt-order");
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..4 {
            let seen = Arc::clone(&seen);
            ctx.post(Box::new(move || {
                if i == 0 {
                    thread::sleep(Duration::from_millis(100));
                }
                seen.lock().unwrap().push(i);
            }))
            .unwrap();
        }
        let (tx, rx) = oneshot::channel();
        ctx.post(Box::new(move || {
            tx.send(()).ok();
        }))
        .unwrap();
        rx.await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn tokio_context_rejects_after_runtime_shutdown() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let ctx = TokioContext::new("rt-gone", rt.handle().clone());
        drop(rt);
        assert_eq!(
            ctx.post(Box::new(|| {})).unwrap_err(),
            DispatchError::Closed("rt-gone".into())
        );
    }
}
