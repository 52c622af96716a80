//! Converters - 任务消息 / 远程响应 与 领域对象之间的转换
//!
//! 纯函数，不做 IO

mod detection;
mod interactive_request;
mod interactive_response;
mod tracking;

pub use detection::{build_detection_annotation, build_detection_request};
pub use interactive_request::build_interactive_request;
pub use interactive_response::build_interactive_annotation;
pub use tracking::{build_tracking_annotation, build_tracking_request};
