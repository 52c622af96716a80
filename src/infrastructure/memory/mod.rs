//! Memory Layer - In-Memory State Management
//!
//! 进程内消费组流，用于测试与单机运行

mod job_stream;

pub use job_stream::InMemoryJobStream;
