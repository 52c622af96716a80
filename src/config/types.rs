//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

use crate::application::retry::RetryPolicy;
use crate::infrastructure::adapters::model::HttpModelCallerConfig;
use crate::infrastructure::worker::DispatcherConfig;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 任务流配置
    #[serde(default)]
    pub stream: StreamConfig,

    /// 远程推理服务配置
    #[serde(default)]
    pub model: ModelConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 流后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamBackend {
    /// 进程内，重启丢失
    Memory,
    /// SQLite 表
    Sqlite,
}

impl StreamBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamBackend::Memory => "memory",
            StreamBackend::Sqlite => "sqlite",
        }
    }
}

impl Default for StreamBackend {
    fn default() -> Self {
        StreamBackend::Sqlite
    }
}

/// 任务流配置
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub backend: StreamBackend,

    /// Stream key
    #[serde(default = "default_stream_key")]
    pub key: String,

    /// 消费组名称
    #[serde(default = "default_stream_group")]
    pub group: String,

    /// 消费者名前缀，未设置时随机生成
    #[serde(default)]
    pub consumer_name: Option<String>,

    /// 本进程的消费者数量
    #[serde(default = "default_consumers")]
    pub consumers: usize,

    /// 每次读取的最大记录数
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// 无记录时的阻塞时间（毫秒）
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,

    /// 未确认记录重新投递前的空闲时间（秒）
    #[serde(default = "default_redelivery_idle_secs")]
    pub redelivery_idle_secs: u64,
}

fn default_stream_key() -> String {
    "model_run_jobs".to_string()
}

fn default_stream_group() -> String {
    "model_run_group".to_string()
}

fn default_consumers() -> usize {
    2
}

fn default_batch_size() -> usize {
    1
}

fn default_block_ms() -> u64 {
    2000
}

fn default_redelivery_idle_secs() -> u64 {
    300
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            backend: StreamBackend::default(),
            key: default_stream_key(),
            group: default_stream_group(),
            consumer_name: None,
            consumers: default_consumers(),
            batch_size: default_batch_size(),
            block_ms: default_block_ms(),
            redelivery_idle_secs: default_redelivery_idle_secs(),
        }
    }
}

impl StreamConfig {
    pub fn redelivery_idle(&self) -> Duration {
        Duration::from_secs(self.redelivery_idle_secs)
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            batch_size: self.batch_size,
            block: Duration::from_millis(self.block_ms),
            ..DispatcherConfig::default()
        }
    }
}

/// 远程推理服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// 单次调用超时时间（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// 总尝试次数（含首次）
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// 资源 URL 中的本地主机占位符
    #[serde(default = "default_placeholder_host")]
    pub placeholder_host: String,

    /// 替换占位符的主机
    /// 未设置时回退到 MINIO_HOST 环境变量（去掉端口）
    #[serde(default)]
    pub resource_host: Option<String>,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_placeholder_host() -> String {
    "localhost".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            placeholder_host: default_placeholder_host(),
            resource_host: None,
        }
    }
}

impl ModelConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_backoff_ms),
            max_delay: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.backoff_multiplier,
        }
    }

    pub fn caller_config(&self) -> HttpModelCallerConfig {
        HttpModelCallerConfig {
            timeout_secs: self.timeout_secs,
            placeholder_host: self.placeholder_host.clone(),
            resource_host: self.resource_host.clone(),
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/modelrun.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LogConfig {
    /// 默认过滤器（RUST_LOG 未设置时使用）
    pub fn filter_directive(&self) -> String {
        format!("{},modelrun={}", self.level, self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.stream.backend, StreamBackend::Sqlite);
        assert_eq!(config.stream.consumers, 2);
        assert_eq!(config.model.timeout_secs, 60);
        assert_eq!(config.model.placeholder_host, "localhost");
        assert_eq!(config.database.path, "data/modelrun.db");
    }

    #[test]
    fn test_database_url() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url(), "sqlite:data/modelrun.db?mode=rwc");
    }

    #[test]
    fn test_model_config_conversions() {
        let config = ModelConfig {
            resource_host: Some("minio".into()),
            ..ModelConfig::default()
        };
        let retry = config.retry_policy();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.initial_delay, Duration::from_millis(500));

        let caller = config.caller_config();
        assert_eq!(caller.timeout_secs, 60);
        assert_eq!(caller.resource_host.as_deref(), Some("minio"));
    }

    #[test]
    fn test_log_filter_directive() {
        let config = LogConfig {
            level: "debug".into(),
            json: true,
        };
        assert_eq!(config.filter_directive(), "debug,modelrun=debug");
    }
}
