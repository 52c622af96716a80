//! Worker Layer - Stream Consumers
//!
//! 实现 JobDispatcher，消费任务流并分派到模型 Handler

mod dispatcher;

pub use dispatcher::{DispatchOutcome, DispatcherConfig, JobDispatcher};
