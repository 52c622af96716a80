//! ModelRun - 模型推理结果流水线
//!
//! 启动流程：配置 -> 日志 -> 数据库 -> 推理客户端 -> Handler 注册表 -> 消费者

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use modelrun::application::handlers::{HandlerContext, HandlerRegistry};
use modelrun::application::ports::JobStreamPort;
use modelrun::config::{load_config, print_config, AppConfig, StreamBackend};
use modelrun::infrastructure::adapters::model::HttpModelCaller;
use modelrun::infrastructure::memory::InMemoryJobStream;
use modelrun::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, DbPool, SqliteAnnotationStore,
    SqliteJobStream, SqliteModelClassRepository, SqliteModelRunRepository,
};
use modelrun::infrastructure::worker::JobDispatcher;

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.filter_directive()));
    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_stream(config: &AppConfig, pool: &DbPool) -> Arc<dyn JobStreamPort> {
    let stream = &config.stream;
    match stream.backend {
        StreamBackend::Memory => Arc::new(InMemoryJobStream::new(stream.redelivery_idle())),
        StreamBackend::Sqlite => Arc::new(SqliteJobStream::new(
            pool.clone(),
            stream.key.clone(),
            stream.group.clone(),
            stream.redelivery_idle(),
        )),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    tracing::info!("ModelRun - 模型推理结果流水线");
    print_config(&config);

    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    let caller = HttpModelCaller::new(config.model.caller_config())?;
    let ctx = HandlerContext {
        caller: Arc::new(caller),
        annotation_store: Arc::new(SqliteAnnotationStore::new(pool.clone())),
        run_repo: Arc::new(SqliteModelRunRepository::new(pool.clone())),
        class_repo: Arc::new(SqliteModelClassRepository::new(pool.clone())),
        retry: config.model.retry_policy(),
    };

    // 重复注册在这里失败，而不是在分派时
    let registry = Arc::new(HandlerRegistry::with_defaults(&ctx)?);
    tracing::info!(model_codes = ?registry.model_codes(), "Handler registry built");

    let stream = build_stream(&config, &pool);
    let dispatcher = Arc::new(JobDispatcher::new(
        stream,
        registry,
        config.stream.dispatcher_config(),
    ));

    let prefix = config
        .stream
        .consumer_name
        .clone()
        .unwrap_or_else(|| format!("modelrun-{}", &Uuid::new_v4().simple().to_string()[..8]));

    let cancel = CancellationToken::new();
    let consumers = dispatcher.spawn_consumers(&prefix, config.stream.consumers, &cancel);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal, finishing in-flight records");
    cancel.cancel();

    for consumer in consumers {
        if let Err(e) = consumer.await {
            tracing::error!(error = %e, "Consumer task panicked");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
