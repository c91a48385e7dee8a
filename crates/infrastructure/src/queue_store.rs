//! 离线队列的文件存储
//!
//! 单个 JSON 文件承载整个队列，追加/清空为写穿操作，
//! 进程重启后队列原样恢复。

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use domain::{QueueError, QueueStore, QueuedAction};

/// JSON 文件队列存储
pub struct JsonFileQueueStore {
    path: PathBuf,
}

impl JsonFileQueueStore {
    /// 创建文件存储；文件不存在视为空队列
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_all(&self) -> Result<Vec<QueuedAction>, QueueError> {
        match fs::read(&self.path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| QueueError::Serde(e.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(QueueError::Store(e.to_string())),
        }
    }

    async fn write_all(&self, actions: &[QueuedAction]) -> Result<(), QueueError> {
        let bytes =
            serde_json::to_vec_pretty(actions).map_err(|e| QueueError::Serde(e.to_string()))?;
        fs::write(&self.path, bytes)
            .await
            .map_err(|e| QueueError::Store(e.to_string()))
    }
}

#[async_trait]
impl QueueStore for JsonFileQueueStore {
    async fn load(&self) -> Result<Vec<QueuedAction>, QueueError> {
        self.read_all().await
    }

    async fn append(&self, action: &QueuedAction) -> Result<(), QueueError> {
        let mut actions = self.read_all().await?;
        actions.push(action.clone());
        self.write_all(&actions).await
    }

    async fn clear(&self) -> Result<(), QueueError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QueueError::Store(e.to_string())),
        }
    }
}
