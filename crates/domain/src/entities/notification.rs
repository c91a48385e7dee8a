//! 通知实体定义

use serde::{Deserialize, Serialize};

use crate::value_objects::{NotificationId, Timestamp, UserId};

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// 聊天消息
    Message,
    /// 预订相关
    Booking,
    /// 举报相关
    Report,
    /// 管理员警告
    Warning,
    /// 封禁
    Ban,
    /// 其它
    Generic,
}

impl Default for NotificationKind {
    fn default() -> Self {
        Self::Generic
    }
}

/// 通知优先级 (low, medium, high, urgent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for NotificationPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationPriority::Low => write!(f, "low"),
            NotificationPriority::Medium => write!(f, "medium"),
            NotificationPriority::High => write!(f, "high"),
            NotificationPriority::Urgent => write!(f, "urgent"),
        }
    }
}

/// 通知实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// 通知ID
    pub id: NotificationId,
    /// 通知类型
    pub kind: NotificationKind,
    /// 标题
    pub title: String,
    /// 内容
    pub message: String,
    /// 优先级
    pub priority: NotificationPriority,
    /// 是否已读
    pub is_read: bool,
    /// 来源用户（可选，聊天通知携带发送者）
    pub source: Option<UserId>,
    /// 创建时间
    pub created_at: Timestamp,
}

impl Notification {
    /// 创建新通知
    pub fn new(
        id: NotificationId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        priority: NotificationPriority,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            message: message.into(),
            priority,
            is_read: false,
            source: None,
            created_at,
        }
    }

    /// 标记为已读
    pub fn mark_as_read(&mut self) {
        self.is_read = true;
    }

    /// 是否为高优先级
    pub fn is_high_priority(&self) -> bool {
        matches!(
            self.priority,
            NotificationPriority::High | NotificationPriority::Urgent
        )
    }
}
