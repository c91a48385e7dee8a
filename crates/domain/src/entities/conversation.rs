//! 会话实体定义
//!
//! 双方聊天会话，登录时从协作方 API 拉取，之后随消息推送更新，
//! 客户端侧永不删除。

use serde::{Deserialize, Serialize};

use crate::entities::message::Message;
use crate::value_objects::{ConversationId, UserId};

/// 会话实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// 会话ID
    pub id: ConversationId,
    /// 对方参与者
    pub participant: UserId,
    /// 最近一条消息摘要
    pub last_message_summary: Option<String>,
    /// 未读消息数
    pub unread_count: u32,
}

impl Conversation {
    /// 创建新会话
    pub fn new(id: ConversationId, participant: UserId) -> Self {
        Self {
            id,
            participant,
            last_message_summary: None,
            unread_count: 0,
        }
    }

    /// 记录一条消息：刷新摘要，非本人消息累加未读
    pub fn record_message(&mut self, message: &Message, own_identity: UserId) {
        self.last_message_summary = Some(message.summary());
        if message.sender_id != own_identity {
            self.unread_count = self.unread_count.saturating_add(1);
        }
    }

    /// 会话获得焦点时清零未读
    pub fn mark_focused(&mut self) {
        self.unread_count = 0;
    }
}
