//! # hopper: In-Process Typed Work Queue
//!
//! **At-least-once delivery between producers and consumers in the same
//! process**, with the failure handling a real queue needs:
//!
//! - **Visibility timeouts**: a consumer that goes silent never strands an
//!   entry; a single re-armable maintenance timer reclaims it
//! - **Retry with backoff**: abandoned entries re-enter the ready list on a
//!   configurable multiplier schedule
//! - **Dead-lettering**: entries that exhaust their retry budget land on an
//!   observable terminal list instead of vanishing
//! - **Embedded worker**: an optional single consumer loop with
//!   auto-complete-on-success semantics
//! - **Pluggable seams**: lifecycle hooks (with enqueue veto), a gauge
//!   metrics sink, and a payload codec for deep-copy semantics
//!
//! Not covered, on purpose: cross-process durability, persistence,
//! fan-out, priorities, and exactly-once delivery.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use hopper::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl EntryHandler<String> for Greeter {
//!     async fn handle(&self, entry: &Entry<String>) -> Result<(), HandlerError> {
//!         println!("hello, {}", entry.payload);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> QueueResult<()> {
//!     let queue: WorkQueue<String> = WorkQueue::with_config(
//!         QueueConfig::new()
//!             .with_retry_limit(3)
//!             .with_retry_delay(Duration::from_secs(1))
//!             .with_visibility_timeout(Duration::from_secs(30)),
//!     );
//!
//!     queue.enqueue("world".to_string()).await?;
//!
//!     // embedded worker: completes on Ok, abandons on Err
//!     queue.start_working(Arc::new(Greeter), true).await;
//!
//!     // ... later
//!     queue.stop_working().await;
//!     queue.dispose();
//!     Ok(())
//! }
//! ```
//!
//! Consumers can also pull directly:
//!
//! ```rust,no_run
//! # use hopper::prelude::*;
//! # use std::time::Duration;
//! # async fn pull(queue: WorkQueue<String>) -> QueueResult<()> {
//! if let Some(delivery) = queue.dequeue_timeout(Duration::from_secs(1)).await? {
//!     match delivery.payload().len() {
//!         0 => delivery.abandon().await?,
//!         _ => delivery.complete().await?,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod hooks;
pub mod metrics;
pub mod queue;
pub mod types;
pub mod worker;

pub use codec::{JsonCodec, PayloadCodec};
pub use config::QueueConfig;
pub use error::{HandlerError, QueueError, QueueResult};
pub use hooks::{NoopHooks, QueueHooks};
pub use metrics::{MetricsSink, QueueStats};
pub use queue::retry::RetryPolicy;
pub use queue::{Delivery, WorkQueue, DEFAULT_DEQUEUE_TIMEOUT};
pub use types::{Entry, EntryId, QueueEvent};
pub use worker::EntryHandler;

/// One-stop imports for queue producers and consumers
pub mod prelude {
    pub use crate::{
        Delivery, Entry, EntryHandler, EntryId, HandlerError, JsonCodec, MetricsSink, NoopHooks,
        PayloadCodec, QueueConfig, QueueError, QueueEvent, QueueHooks, QueueResult, QueueStats,
        RetryPolicy, WorkQueue,
    };

    pub use async_trait::async_trait;
}
