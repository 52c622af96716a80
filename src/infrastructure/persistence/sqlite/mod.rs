//! SQLite Persistence - SQLite 数据库持久化实现

mod annotation_repo;
mod database;
mod job_stream;
mod model_class_repo;
mod model_run_repo;

pub use annotation_repo::*;
pub use database::*;
pub use job_stream::*;
pub use model_class_repo::*;
pub use model_run_repo::*;
