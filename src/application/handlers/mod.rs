//! Model Handlers - 按模型代码分派的推理处理器
//!
//! 每个模型代码一个实现；公共流程（重试调用、结果记录、标注同步）
//! 由 `ModelHandler` 的默认方法提供。

mod detection;
mod interactive;
mod registry;
mod tracking;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::application::dto::{ModelRequest, RawModelResponse};
use crate::application::error::PipelineError;
use crate::application::ports::{
    AnnotationStorePort, ModelCallerPort, ModelClass, ModelClassRepositoryPort, ModelDatasetResult,
    ModelRunRepositoryPort, RepositoryError,
};
use crate::application::retry::{retry_with_backoff, RetryPolicy};
use crate::domain::annotation::{generate_dedup_key, AnnotationObject, AnnotationResult};
use crate::domain::job::{JobMessage, ModelCode};

pub use detection::DetectionHandler;
pub use interactive::ImageInteractiveHandler;
pub use registry::{default_factories, HandlerFactory, HandlerRegistry, RegistryError};
pub use tracking::ImageTrackingHandler;

/// Handler 共享依赖（全部只读，可跨 Handler 克隆）
#[derive(Clone)]
pub struct HandlerContext {
    pub caller: Arc<dyn ModelCallerPort>,
    pub annotation_store: Arc<dyn AnnotationStorePort>,
    pub run_repo: Arc<dyn ModelRunRepositoryPort>,
    pub class_repo: Arc<dyn ModelClassRepositoryPort>,
    pub retry: RetryPolicy,
}

impl HandlerContext {
    /// 单次远程调用
    pub async fn invoke(&self, request: &ModelRequest, url: &str) -> Result<RawModelResponse, PipelineError> {
        Ok(self.caller.invoke(request, url).await?)
    }
}

/// 评估输入（JSON Lines）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsInput {
    pub ground_truth: Vec<String>,
    pub predictions: Vec<String>,
}

fn is_transient(error: &PipelineError) -> bool {
    matches!(error, PipelineError::Rpc(e) if e.is_transient())
}

/// Model Handler
///
/// 实现必须可并发调用（不同 JobMessage 之间不共享可变状态）
#[async_trait]
pub trait ModelHandler: Send + Sync {
    fn model_code(&self) -> ModelCode;

    fn context(&self) -> &HandlerContext;

    /// 单次远程调用；远端非成功状态作为错误返回
    async fn call_remote_service(&self, message: &JobMessage) -> Result<RawModelResponse, PipelineError>;

    /// 调用远程服务（带重试）并转换为标注结果
    async fn model_run(&self, message: &JobMessage) -> Result<AnnotationResult, PipelineError>;

    /// 由推理结果生成评估输入；默认不实现
    fn assemble_metrics_input(
        &self,
        _results: &[ModelDatasetResult],
        _annotations: &[AnnotationObject],
    ) -> MetricsInput {
        MetricsInput::default()
    }

    /// 带退避重试的远程调用，只重试瞬时错误
    async fn call_with_retry(&self, message: &JobMessage) -> Result<RawModelResponse, PipelineError> {
        retry_with_backoff(&self.context().retry, || self.call_remote_service(message), is_transient).await
    }

    /// 加载类别映射；失败时降级为空映射
    async fn load_class_map(&self, model_id: i64) -> HashMap<String, ModelClass> {
        match self.context().class_repo.class_map(model_id).await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(model_id, error = %e, "Failed to load model classes, objects stay unlabeled");
                HashMap::new()
            }
        }
    }

    /// 持久化标注对象，对象为空时不做任何事，返回新写入数量
    async fn sync_annotation_result(
        &self,
        result: &AnnotationResult,
        message: &JobMessage,
    ) -> Result<usize, PipelineError> {
        if result.objects.is_empty() {
            return Ok(0);
        }
        let ctx = self.context();
        let run = ctx
            .run_repo
            .find_by_serial_no(message.model_serial_no)
            .await?
            .ok_or_else(|| {
                PipelineError::validation(format!("model run record {} not found", message.model_serial_no))
            })?;

        let data_id = result.data_id.unwrap_or(message.data_id);
        let objects = result
            .objects
            .iter()
            .enumerate()
            .map(|(index, object)| {
                AnnotationObject::from_model(
                    message.dataset_id,
                    data_id,
                    run.id,
                    generate_dedup_key(message.model_serial_no, data_id, index),
                    object,
                )
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let inserted = ctx.annotation_store.save_batch(&objects).await?;
        tracing::info!(
            data_id,
            model_serial_no = message.model_serial_no,
            total = objects.len(),
            inserted,
            "Annotation objects persisted"
        );
        Ok(inserted)
    }

    /// 记录单条数据的推理结果，(serial no, data id) 幂等
    async fn save_dataset_result(
        &self,
        message: &JobMessage,
        result: &AnnotationResult,
    ) -> Result<(), PipelineError> {
        let record = ModelDatasetResult {
            model_id: message.model_id,
            model_serial_no: message.model_serial_no,
            data_id: message.data_id,
            dataset_id: message.dataset_id,
            result_filter_param: message.result_filter_param.clone().map(serde_json::Value::Object),
            model_result: serde_json::to_value(result)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            is_success: result.is_success(),
            error_message: (!result.is_success()).then(|| result.message.clone()),
            updated_at: Utc::now(),
        };
        self.context().run_repo.save_dataset_result(&record).await?;
        Ok(())
    }

    /// 处理一条任务消息，返回是否成功（决定是否确认流记录）
    ///
    /// 远端业务失败（200 响应中的非成功代码）视为已处理：结果以失败记录，返回 true。
    async fn handle_data_model_run(&self, message: &JobMessage) -> bool {
        let result = match self.model_run(message).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    data_id = message.data_id,
                    model_code = %self.model_code(),
                    error = %e,
                    "Model run failed"
                );
                let failure = AnnotationResult::failure(e.to_string());
                if let Err(e) = self.save_dataset_result(message, &failure).await {
                    tracing::warn!(data_id = message.data_id, error = %e, "Failed to record model run failure");
                }
                return false;
            }
        };

        if !result.is_success() {
            tracing::warn!(
                data_id = message.data_id,
                model_code = %self.model_code(),
                message = %result.message,
                "Model service reported failure"
            );
        }

        if let Err(e) = self.save_dataset_result(message, &result).await {
            tracing::error!(data_id = message.data_id, error = %e, "Failed to save model dataset result");
            return false;
        }

        match self.sync_annotation_result(&result, message).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(data_id = message.data_id, error = %e, "Failed to sync annotation result");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Handler 测试用的内存存储

    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::application::ports::ModelRunRecord;
    use crate::infrastructure::adapters::model::FakeModelCaller;

    #[derive(Default)]
    pub struct StubAnnotationStore {
        pub objects: Mutex<Vec<AnnotationObject>>,
    }

    #[async_trait]
    impl AnnotationStorePort for StubAnnotationStore {
        async fn save_batch(&self, objects: &[AnnotationObject]) -> Result<usize, RepositoryError> {
            let mut stored = self.objects.lock().unwrap();
            let mut inserted = 0;
            for object in objects {
                if stored.iter().all(|o| o.dedup_key != object.dedup_key) {
                    stored.push(object.clone());
                    inserted += 1;
                }
            }
            Ok(inserted)
        }

        async fn find_by_data_id(&self, data_id: i64) -> Result<Vec<AnnotationObject>, RepositoryError> {
            Ok(self.objects.lock().unwrap().iter().filter(|o| o.data_id == data_id).cloned().collect())
        }
    }

    #[derive(Default)]
    pub struct StubRunRepository {
        next_id: AtomicI64,
        pub runs: Mutex<Vec<ModelRunRecord>>,
        pub results: Mutex<Vec<ModelDatasetResult>>,
    }

    #[async_trait]
    impl ModelRunRepositoryPort for StubRunRepository {
        async fn create_run(&self, model_id: i64, model_serial_no: i64, dataset_id: i64) -> Result<ModelRunRecord, RepositoryError> {
            let record = ModelRunRecord {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                model_id,
                model_serial_no,
                dataset_id,
                created_at: Utc::now(),
            };
            self.runs.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn find_by_serial_no(&self, model_serial_no: i64) -> Result<Option<ModelRunRecord>, RepositoryError> {
            Ok(self.runs.lock().unwrap().iter().find(|r| r.model_serial_no == model_serial_no).cloned())
        }

        async fn save_dataset_result(&self, result: &ModelDatasetResult) -> Result<(), RepositoryError> {
            let mut results = self.results.lock().unwrap();
            results.retain(|r| !(r.model_serial_no == result.model_serial_no && r.data_id == result.data_id));
            results.push(result.clone());
            Ok(())
        }

        async fn find_dataset_results(&self, model_serial_no: i64) -> Result<Vec<ModelDatasetResult>, RepositoryError> {
            Ok(self.results.lock().unwrap().iter().filter(|r| r.model_serial_no == model_serial_no).cloned().collect())
        }
    }

    #[derive(Default)]
    pub struct StubClassRepository {
        pub classes: Mutex<Vec<ModelClass>>,
    }

    #[async_trait]
    impl ModelClassRepositoryPort for StubClassRepository {
        async fn save(&self, class: &ModelClass) -> Result<(), RepositoryError> {
            self.classes.lock().unwrap().push(class.clone());
            Ok(())
        }

        async fn class_map(&self, model_id: i64) -> Result<HashMap<String, ModelClass>, RepositoryError> {
            Ok(self
                .classes
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.model_id == model_id)
                .map(|c| (c.code.clone(), c.clone()))
                .collect())
        }
    }

    pub struct Fixture {
        pub caller: Arc<FakeModelCaller>,
        pub store: Arc<StubAnnotationStore>,
        pub runs: Arc<StubRunRepository>,
        pub classes: Arc<StubClassRepository>,
        pub ctx: HandlerContext,
    }

    pub fn fixture() -> Fixture {
        let caller = Arc::new(FakeModelCaller::new());
        let store = Arc::new(StubAnnotationStore::default());
        let runs = Arc::new(StubRunRepository::default());
        let classes = Arc::new(StubClassRepository::default());
        let ctx = HandlerContext {
            caller: caller.clone(),
            annotation_store: store.clone(),
            run_repo: runs.clone(),
            class_repo: classes.clone(),
            retry: RetryPolicy {
                max_attempts: 3,
                initial_delay: std::time::Duration::from_millis(1),
                max_delay: std::time::Duration::from_millis(2),
                multiplier: 2.0,
            },
        };
        Fixture { caller, store, runs, classes, ctx }
    }

    pub fn job(model_code: &str, filter: serde_json::Value) -> JobMessage {
        serde_json::from_value(serde_json::json!({
            "dataId": 11,
            "modelId": 2,
            "modelSerialNo": 9001,
            "modelCode": model_code,
            "datasetId": 5,
            "url": "http://model/predict",
            "resultFilterParam": filter,
            "dataInfo": {"id": 11, "content": [{"type": "file", "file": {"id": 1, "url": "http://localhost:9000/a.jpg"}}]}
        }))
        .unwrap()
    }
}
