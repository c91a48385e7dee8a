//! 消息实体定义
//!
//! 包含消息的核心信息、附件与送达状态生命周期。

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{ConversationId, MessageId, Timestamp, UserId};

/// 消息送达状态
///
/// 状态只能单向推进：sent -> delivered -> seen，永不回退。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// 已发送
    Sent,
    /// 已送达
    Delivered,
    /// 已读
    Seen,
}

impl Default for DeliveryStatus {
    fn default() -> Self {
        Self::Sent
    }
}

/// 消息附件信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// 文件名
    pub filename: String,
    /// 文件URL
    pub url: String,
    /// MIME类型
    pub mime_type: String,
}

/// 消息实体
///
/// 字段名与服务端推送的 JSON 负载保持 camelCase 对应。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// 消息唯一ID
    pub id: MessageId,
    /// 所属会话ID
    pub conversation_id: ConversationId,
    /// 发送者ID
    pub sender_id: UserId,
    /// 文本内容（有附件时可为空）
    pub content: Option<String>,
    /// 附件（可选）
    pub attachment: Option<Attachment>,
    /// 发送时间
    pub created_at: Timestamp,
    /// 送达状态
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
}

impl Message {
    /// 创建纯文本消息
    pub fn new_text(
        id: MessageId,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: impl Into<String>,
        created_at: Timestamp,
    ) -> DomainResult<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::validation_error("content", "消息内容不能为空"));
        }
        Ok(Self {
            id,
            conversation_id,
            sender_id,
            content: Some(content),
            attachment: None,
            created_at,
            delivery_status: DeliveryStatus::Sent,
        })
    }

    /// 创建带附件的消息，文本内容可选
    pub fn new_with_attachment(
        id: MessageId,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: Option<String>,
        attachment: Attachment,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            conversation_id,
            sender_id,
            content: content.filter(|c| !c.trim().is_empty()),
            attachment: Some(attachment),
            created_at,
            delivery_status: DeliveryStatus::Sent,
        }
    }

    /// 推进送达状态
    ///
    /// 只接受更高的状态，回退请求会被忽略。
    pub fn advance_delivery(&mut self, next: DeliveryStatus) {
        if next > self.delivery_status {
            self.delivery_status = next;
        }
    }

    /// 摘要文本，用于会话列表展示
    pub fn summary(&self) -> String {
        match (&self.content, &self.attachment) {
            (Some(content), _) => content.clone(),
            (None, Some(attachment)) => attachment.filename.clone(),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_message() -> Message {
        Message::new_text(
            MessageId::from(Uuid::new_v4()),
            ConversationId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            "你好",
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_text_rejected() {
        let result = Message::new_text(
            MessageId::from(Uuid::new_v4()),
            ConversationId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            "   ",
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_delivery_status_is_monotonic() {
        let mut message = sample_message();
        assert_eq!(message.delivery_status, DeliveryStatus::Sent);

        message.advance_delivery(DeliveryStatus::Delivered);
        assert_eq!(message.delivery_status, DeliveryStatus::Delivered);

        // 回退被忽略
        message.advance_delivery(DeliveryStatus::Sent);
        assert_eq!(message.delivery_status, DeliveryStatus::Delivered);

        message.advance_delivery(DeliveryStatus::Seen);
        assert_eq!(message.delivery_status, DeliveryStatus::Seen);

        message.advance_delivery(DeliveryStatus::Delivered);
        assert_eq!(message.delivery_status, DeliveryStatus::Seen);
    }

    #[test]
    fn test_attachment_message_summary() {
        let message = Message::new_with_attachment(
            MessageId::from(Uuid::new_v4()),
            ConversationId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            None,
            Attachment {
                filename: "floorplan.png".to_string(),
                url: "https://cdn.example.com/floorplan.png".to_string(),
                mime_type: "image/png".to_string(),
            },
            Utc::now(),
        );
        assert_eq!(message.summary(), "floorplan.png");
        assert!(message.content.is_none());
    }

    #[test]
    fn test_delivery_status_wire_format() {
        let json = serde_json::to_string(&DeliveryStatus::Seen).unwrap();
        assert_eq!(json, "\"seen\"");
        let parsed: DeliveryStatus = serde_json::from_str("\"delivered\"").unwrap();
        assert_eq!(parsed, DeliveryStatus::Delivered);
    }
}
