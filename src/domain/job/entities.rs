//! Job Context - Entities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{JobError, ModelCode};

/// 文件节点类型：直接文件引用
pub const FILE_NODE_TYPE: &str = "file";

/// 推理任务消息 - 上游生产者写入流的工作单元
///
/// 不变量:
/// - 创建后不可变
/// - 每次投递尝试只被消费一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMessage {
    pub data_id: i64,
    pub model_id: i64,
    pub model_serial_no: i64,
    pub model_code: ModelCode,
    #[serde(default)]
    pub dataset_id: i64,
    /// 模型服务地址
    #[serde(default)]
    pub url: String,
    /// 结果过滤参数（置信度范围、交互提示数据等），结构不固定
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_filter_param: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_info: Option<DataInfo>,
}

impl JobMessage {
    /// 从流记录的 JSON 负载解码
    pub fn decode(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// 过滤参数，缺失时视为空对象
    pub fn filter_param(&self) -> Map<String, Value> {
        self.result_filter_param.clone().unwrap_or_default()
    }

    /// 获取源数据信息
    pub fn require_data_info(&self) -> Result<&DataInfo, JobError> {
        self.data_info
            .as_ref()
            .ok_or(JobError::DataNotFound(self.data_id))
    }
}

/// 源数据信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataInfo {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Vec<FileNode>,
}

impl DataInfo {
    /// 解析主文件 URL
    ///
    /// 取第一个内容节点：若是文件节点则使用其 URL，否则使用其第一个子文件的 URL
    pub fn primary_file_url(&self) -> Result<&str, JobError> {
        let node = self.content.first().ok_or(JobError::FileNotFound)?;
        let url = node.resolve_url().ok_or(JobError::FileNotFound)?;
        if url.is_empty() {
            return Err(JobError::EmptyFileUrl);
        }
        Ok(url)
    }

    /// 解析所有内容节点的文件（用于帧序列）
    ///
    /// 返回 (文件 ID, URL)，跳过无法解析或 URL 为空的节点
    pub fn frame_files(&self) -> Vec<(Option<i64>, &str)> {
        self.content
            .iter()
            .filter_map(|node| {
                let file = node.resolve_file()?;
                let url = file.url.as_deref().filter(|u| !u.is_empty())?;
                Some((file.id, url))
            })
            .collect()
    }
}

/// 内容节点：文件或目录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileNode>,
}

impl FileNode {
    pub fn is_file(&self) -> bool {
        self.node_type.eq_ignore_ascii_case(FILE_NODE_TYPE)
    }

    fn resolve_file(&self) -> Option<&FileRef> {
        if self.is_file() {
            self.file.as_ref()
        } else {
            self.files.first().and_then(|child| child.file.as_ref())
        }
    }

    fn resolve_url(&self) -> Option<&str> {
        self.resolve_file().map(|f| f.url.as_deref().unwrap_or_default())
    }
}

/// 文件引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
