//! 离线动作实体定义
//!
//! 断线期间发起的写操作会以 FIFO 顺序进入持久化队列，
//! 恢复连接后按原顺序重放。

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::value_objects::{ActionId, Timestamp};

/// 离线动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// 保存房源
    SaveListing,
    /// 发送消息
    SendMessage,
    /// 创建预订
    CreateBooking,
    /// 提交评价
    SubmitReview,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::SaveListing => write!(f, "save-listing"),
            ActionKind::SendMessage => write!(f, "send-message"),
            ActionKind::CreateBooking => write!(f, "create-booking"),
            ActionKind::SubmitReview => write!(f, "submit-review"),
        }
    }
}

/// 离线动作实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedAction {
    /// 动作ID
    pub id: ActionId,
    /// 动作类型
    pub kind: ActionKind,
    /// 动作负载，重放时原样提交给协作方 API
    pub payload: JsonValue,
    /// 入队时间
    pub timestamp: Timestamp,
}

impl QueuedAction {
    /// 创建新的离线动作
    pub fn new(id: ActionId, kind: ActionKind, payload: JsonValue, timestamp: Timestamp) -> Self {
        Self {
            id,
            kind,
            payload,
            timestamp,
        }
    }
}
