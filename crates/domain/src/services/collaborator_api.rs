//! 协作方请求/响应 API 接口
//!
//! 会话列表、历史消息、通知历史以及各类写操作都走这里；
//! 二进制附件通过 multipart 上传，不走持久连接。

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::entities::conversation::Conversation;
use crate::entities::message::Message;
use crate::entities::notification::Notification;
use crate::value_objects::{ConversationId, NotificationId};

/// 协作方 API 错误
#[derive(Error, Debug)]
pub enum ApiError {
    /// 请求层错误（网络、超时）
    #[error("http error: {0}")]
    Http(String),

    /// 非 2xx 响应
    #[error("unexpected status: {code}")]
    Status { code: u16 },

    /// 响应体解析失败
    #[error("decode error: {0}")]
    Decode(String),
}

/// 待上传的附件
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentUpload {
    /// 文件名
    pub filename: String,
    /// MIME类型
    pub mime_type: String,
    /// 文件内容
    pub bytes: Vec<u8>,
}

/// 发送消息请求
///
/// 文本与附件至少有其一。
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub content: Option<String>,
    pub attachment: Option<AttachmentUpload>,
}

/// 协作方 API 接口
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait CollaboratorApi: Send + Sync {
    /// 拉取当前用户的会话列表
    async fn fetch_conversations(&self) -> Result<Vec<Conversation>, ApiError>;

    /// 拉取会话历史消息
    async fn fetch_messages(&self, conversation_id: ConversationId)
        -> Result<Vec<Message>, ApiError>;

    /// 发送消息（含附件时为 multipart），返回服务端确认后的消息
    async fn send_message(&self, message: NewMessage) -> Result<Message, ApiError>;

    /// 批量标记会话内消息为已读
    async fn mark_seen(&self, conversation_id: ConversationId) -> Result<(), ApiError>;

    /// 拉取通知历史
    async fn fetch_notifications(&self) -> Result<Vec<Notification>, ApiError>;

    /// 标记单条通知已读
    async fn mark_notification_read(&self, id: NotificationId) -> Result<(), ApiError>;

    /// 标记全部通知已读
    async fn mark_all_notifications_read(&self) -> Result<(), ApiError>;

    /// 保存房源
    async fn save_listing(&self, payload: JsonValue) -> Result<(), ApiError>;

    /// 创建预订
    async fn create_booking(&self, payload: JsonValue) -> Result<(), ApiError>;

    /// 提交评价
    async fn submit_review(&self, payload: JsonValue) -> Result<(), ApiError>;
}
