//! Deduplicating, cache-backed font loading.
//!
//! [`Loader`] serves resolved typefaces from an LRU cache, coalesces
//! concurrent non-blocking requests for the same key into one provider call,
//! runs provider work on a small [`WorkerPool`], and delivers completions
//! back onto each caller's [`ExecutionContext`].

pub mod cache;
pub mod classify;
pub mod dispatch;
pub mod error;
pub mod loader;
pub mod pending;
pub mod pool;

pub use cache::{CacheStats, ResultCache};
pub use classify::resolve;
pub use dispatch::{
    CallbackDispatcher, ExecutionContext, LoopThread, QueueContext, Subscriber, Task, TaskQueue,
    TokioContext,
};
pub use error::{DispatchError, PoolError};
pub use loader::{FetchTimeout, LoadOutcome, LoadResult, Loader, Mode, UNBOUNDED_WAIT};
pub use pending::{JoinOutcome, PendingRegistry};
pub use pool::WorkerPool;
