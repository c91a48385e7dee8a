//! 离线队列存储接口
//!
//! 追加/清空式的持久化结构，跨进程重启保留。

use async_trait::async_trait;
use thiserror::Error;

use crate::entities::queued_action::QueuedAction;

/// 队列存储错误
#[derive(Error, Debug)]
pub enum QueueError {
    /// 底层存储错误
    #[error("store error: {0}")]
    Store(String),

    /// 序列化错误
    #[error("serde error: {0}")]
    Serde(String),
}

/// 离线队列存储接口
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// 按入队顺序加载全部动作
    async fn load(&self) -> Result<Vec<QueuedAction>, QueueError>;

    /// 追加一个动作
    async fn append(&self, action: &QueuedAction) -> Result<(), QueueError>;

    /// 清空队列
    async fn clear(&self) -> Result<(), QueueError>;
}
