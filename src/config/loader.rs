//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 资源主机的旧环境变量
const LEGACY_RESOURCE_HOST_ENV: &str = "MINIO_HOST";

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `MODELRUN_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `MODELRUN_STREAM__BACKEND=memory`
/// - `MODELRUN_STREAM__CONSUMERS=4`
/// - `MODELRUN_MODEL__TIMEOUT_SECS=30`
/// - `MODELRUN_MODEL__RESOURCE_HOST=minio`
/// - `MODELRUN_DATABASE__PATH=/data/modelrun.db`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 例如: MODELRUN_MODEL__TIMEOUT_SECS=30
    builder = builder.add_source(
        Environment::with_prefix("MODELRUN")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    // 缺省字段由类型上的 serde default 补齐
    let mut app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    let legacy_host = std::env::var(LEGACY_RESOURCE_HOST_ENV).ok();
    resolve_resource_host(&mut app_config, legacy_host.as_deref());

    validate_config(&app_config)?;

    Ok(app_config)
}

/// `model.resource_host` 未设置时使用旧变量的主机部分
fn resolve_resource_host(config: &mut AppConfig, legacy: Option<&str>) {
    if config.model.resource_host.is_some() {
        return;
    }
    config.model.resource_host = legacy.and_then(strip_port);
}

/// `minio:9000` -> `minio`；也接受带 scheme 的写法
fn strip_port(value: &str) -> Option<String> {
    let value = value.trim();
    let without_scheme = value.split_once("://").map_or(value, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', ':'])
        .next()
        .unwrap_or_default();
    (!host.is_empty()).then(|| host.to_string())
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let checks = [
        (config.stream.consumers == 0, "Stream consumers must be at least 1"),
        (config.stream.batch_size == 0, "Stream batch size must be at least 1"),
        (config.stream.key.is_empty(), "Stream key cannot be empty"),
        (config.stream.group.is_empty(), "Stream group cannot be empty"),
        (config.model.max_attempts == 0, "Model max attempts must be at least 1"),
        (config.model.timeout_secs == 0, "Model timeout cannot be 0"),
        (config.model.backoff_multiplier < 1.0, "Backoff multiplier cannot be below 1.0"),
        (config.database.path.is_empty(), "Database path cannot be empty"),
    ];

    match checks.iter().find(|(failed, _)| *failed) {
        Some((_, message)) => Err(ConfigError::ValidationError(message.to_string())),
        None => Ok(()),
    }
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!(
        "Stream: {} key={} group={}",
        config.stream.backend.as_str(),
        config.stream.key,
        config.stream.group
    );
    tracing::info!(
        "Consumers: {} (batch {}, block {}ms, redelivery after {}s)",
        config.stream.consumers,
        config.stream.batch_size,
        config.stream.block_ms,
        config.stream.redelivery_idle_secs
    );
    tracing::info!("Model Timeout: {}s", config.model.timeout_secs);
    tracing::info!(
        "Model Retry: {} attempts, {}ms..{}ms x{}",
        config.model.max_attempts,
        config.model.initial_backoff_ms,
        config.model.max_backoff_ms,
        config.model.backoff_multiplier
    );
    match &config.model.resource_host {
        Some(host) => tracing::info!("Resource Host: {} -> {}", config.model.placeholder_host, host),
        None => tracing::info!("Resource Host: not rewritten"),
    }
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Database Max Connections: {}", config.database.max_connections);
    tracing::info!("Log Level: {} (json: {})", config.log.level, config.log.json);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamBackend;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_default_config() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = AppConfig::default();
        config.stream.consumers = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.model.max_attempts = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.stream.group = String::new();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.database.path = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("minio:9000").as_deref(), Some("minio"));
        assert_eq!(strip_port("10.0.0.5").as_deref(), Some("10.0.0.5"));
        assert_eq!(strip_port("http://minio:9000/").as_deref(), Some("minio"));
        assert_eq!(strip_port(""), None);
    }

    #[test]
    fn test_resource_host_prefers_explicit_setting() {
        let mut config = AppConfig::default();
        resolve_resource_host(&mut config, Some("minio:9000"));
        assert_eq!(config.model.resource_host.as_deref(), Some("minio"));

        let mut config = AppConfig::default();
        config.model.resource_host = Some("storage".into());
        resolve_resource_host(&mut config, Some("minio:9000"));
        assert_eq!(config.model.resource_host.as_deref(), Some("storage"));

        let mut config = AppConfig::default();
        resolve_resource_host(&mut config, None);
        assert_eq!(config.model.resource_host, None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[stream]
backend = "memory"
consumers = 4

[model]
timeout_secs = 30
resource_host = "storage"

[log]
json = true
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.stream.backend, StreamBackend::Memory);
        assert_eq!(config.stream.consumers, 4);
        assert_eq!(config.stream.batch_size, 1);
        assert_eq!(config.model.timeout_secs, 30);
        assert_eq!(config.model.max_attempts, 3);
        assert_eq!(config.model.resource_host.as_deref(), Some("storage"));
        assert!(config.log.json);
        assert_eq!(config.database.path, "data/modelrun.db");
    }

    #[test]
    fn test_invalid_file_values_fail_validation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[stream]\nbatch_size = 0").unwrap();

        let err = load_config_from_path(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
