//! Producer side of the pipeline: input lines become records on a bounded
//! work queue.
//!
//! - [`LineProducer`]: reads the input stream and publishes one [`Record`] per line
//! - [`WorkQueue`]: the shared consumer half, drained by the worker pool

pub mod producer;
pub mod queue;
pub mod record;

pub use producer::{LineProducer, ProducerReport};
pub use queue::{work_queue, WorkQueue};
pub use record::Record;
