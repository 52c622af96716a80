//! Job Dispatcher - 流消费者
//!
//! 从消费组流读取任务消息，按模型代码路由到 Handler，并根据处理结果确认记录。
//! 每个消费者顺序处理记录；并发度由消费者数量决定。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::error::PipelineError;
use crate::application::handlers::{HandlerRegistry, ModelHandler};
use crate::application::ports::{JobStreamPort, StreamRecord};
use crate::domain::job::JobMessage;

/// Dispatcher 配置
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// 每次读取的最大记录数
    pub batch_size: usize,
    /// 无记录时的阻塞时间
    pub block: Duration,
    /// 读取失败后的等待时间
    pub error_backoff: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            block: Duration::from_secs(2),
            error_backoff: Duration::from_secs(1),
        }
    }
}

/// 单条记录的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handler 成功
    Succeeded,
    /// Handler 失败，记录留待重新投递
    Failed,
    /// 无法处理（解码失败 / 无 Handler），确认后丢弃
    Discarded(String),
}

impl DispatchOutcome {
    pub fn should_ack(&self) -> bool {
        !matches!(self, Self::Failed)
    }
}

pub struct JobDispatcher {
    stream: Arc<dyn JobStreamPort>,
    registry: Arc<HandlerRegistry>,
    config: DispatcherConfig,
}

impl JobDispatcher {
    pub fn new(
        stream: Arc<dyn JobStreamPort>,
        registry: Arc<HandlerRegistry>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            stream,
            registry,
            config,
        }
    }

    fn route(&self, payload: &str) -> Result<(JobMessage, &Arc<dyn ModelHandler>), PipelineError> {
        let message = JobMessage::decode(payload).map_err(|e| PipelineError::Decode(e.to_string()))?;
        let handler = self
            .registry
            .get(message.model_code)
            .ok_or(PipelineError::UnroutableModelCode(message.model_code))?;
        Ok((message, handler))
    }

    /// 处理一条记录并按结果确认
    pub async fn dispatch(&self, record: &StreamRecord) -> DispatchOutcome {
        let outcome = match self.route(&record.payload) {
            Ok((message, handler)) => {
                tracing::info!(
                    record_id = %record.id,
                    data_id = message.data_id,
                    model_code = %message.model_code,
                    delivery_count = record.delivery_count,
                    "Dispatching job"
                );
                if handler.handle_data_model_run(&message).await {
                    DispatchOutcome::Succeeded
                } else {
                    DispatchOutcome::Failed
                }
            }
            Err(e) => {
                tracing::error!(
                    record_id = %record.id,
                    error = %e,
                    ack = e.should_ack(),
                    "Unprocessable stream record"
                );
                DispatchOutcome::Discarded(e.to_string())
            }
        };

        if !outcome.should_ack() {
            tracing::warn!(
                record_id = %record.id,
                delivery_count = record.delivery_count,
                "Job failed, leaving record for redelivery"
            );
            return outcome;
        }

        match self.stream.ack(&record.id).await {
            Ok(true) => tracing::debug!(record_id = %record.id, "Record acked"),
            Ok(false) => tracing::warn!(record_id = %record.id, "Record was not pending when acked"),
            // 未确认的记录会被重新投递，Handler 写入幂等
            Err(e) => tracing::error!(record_id = %record.id, error = %e, "Failed to ack record"),
        }
        outcome
    }

    /// 消费循环，直到取消
    ///
    /// 取消只在读取之间生效，已读取的记录会处理完毕。
    pub async fn run(&self, consumer: &str, cancel: &CancellationToken) {
        tracing::info!(
            consumer,
            batch_size = self.config.batch_size,
            model_codes = ?self.registry.model_codes(),
            "Dispatcher started"
        );

        let mut processed = 0u64;
        let mut failed = 0u64;
        loop {
            let read = tokio::select! {
                _ = cancel.cancelled() => break,
                read = self.stream.read(consumer, self.config.batch_size, self.config.block) => read,
            };

            match read {
                Ok(records) => {
                    for record in records {
                        match self.dispatch(&record).await {
                            DispatchOutcome::Failed => failed += 1,
                            _ => processed += 1,
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(consumer, error = %e, "Failed to read from stream");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.error_backoff) => {}
                    }
                }
            }
        }

        tracing::info!(consumer, processed, failed, "Dispatcher stopped");
    }

    /// 启动 `count` 个消费者，名称为 `{prefix}-{n}`
    pub fn spawn_consumers(
        self: &Arc<Self>,
        prefix: &str,
        count: usize,
        cancel: &CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        (0..count)
            .map(|n| {
                let dispatcher = Arc::clone(self);
                let cancel = cancel.clone();
                let consumer = format!("{}-{}", prefix, n);
                tokio::spawn(async move { dispatcher.run(&consumer, &cancel).await })
            })
            .collect()
    }
}
