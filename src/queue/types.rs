use std::path::PathBuf;
use std::sync::{LazyLock, Mutex};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::timestamp::context::ContextV7;
use uuid::{Timestamp, Uuid};
use super::errors::Result;

// 共享计数器，保证同一毫秒内生成的 id 仍然单调
static UUID_CONTEXT: LazyLock<Mutex<ContextV7>> =
    LazyLock::new(|| Mutex::new(ContextV7::new()));

/// 上传项唯一标识，同时作为本地文件名与远端 key 的一部分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct UploadId(Uuid);

impl UploadId {
    /// v7 是按时间排序的，目录按文件名排序即按入队顺序排序
    pub fn new() -> Self {
        Self(Uuid::new_v7(Timestamp::now(&*UUID_CONTEXT)))
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 等待上传的持久化项
#[derive(Debug, Clone)]
pub struct PendingUpload {
    /// 标识（本地文件名去掉扩展名）
    pub id: String,
    /// 本地持久化路径
    pub local_path: PathBuf,
    /// 远端对象 key
    pub remote_key: String,
    /// 入队时间（来自文件修改时间，尽力而为）
    pub enqueued_at: DateTime<Utc>,
}

/// 单个上传项的终态状态
#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus {
    /// 开始上传
    Started,
    /// 上传失败，带原因
    Failed(String),
    /// 上传完成，带剩余待传数量
    Finished(usize),
}

/// 队列对外广播的事件
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// 进度更新（0.0 ~ 1.0，严格递增）
    Progress(f32),
    /// 状态变更
    Status(UploadStatus),
    /// 一轮排空结束（每轮只发一次）
    QueueFinished,
}

/// 队列配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// 远端目录前缀
    pub remote_folder: String,
    /// 远端 key 的固定扩展名（与本地存储扩展名无关）
    pub remote_extension: String,
    /// 上传的 Content-Type
    pub content_type: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            remote_folder: "uploads".to_string(),
            remote_extension: ".png".to_string(),
            content_type: "image/png".to_string(),
        }
    }
}

impl QueueConfig {
    /// Builds the remote object key for an item id.
    pub fn remote_key_for(&self, id: &str) -> String {
        format!(
            "{}/{}{}",
            self.remote_folder.trim_end_matches('/'),
            id,
            self.remote_extension
        )
    }
}

/// 队列命令
pub enum QueueCommand {
    /// 批量入队
    Enqueue {
        payloads: Vec<Bytes>,
        reply: oneshot::Sender<Result<Vec<String>>>,
    },

    /// 恢复未完成的上传
    ResumePending,

    /// 取消当前传输（尽力而为）
    CancelCurrent {
        reply: oneshot::Sender<bool>,
    },

    /// 关闭队列
    Shutdown,
}
