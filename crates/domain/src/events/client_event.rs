//! 客户端发出的事件

use serde_json::{json, Value as JsonValue};

use crate::events::event_name::EventName;
use crate::events::resource::ResourceKind;
use crate::value_objects::{ConversationId, MessageId, UserId};

/// 客户端向服务端发送的事件
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// 连接建立后宣告身份，服务端据此路由推送
    Join { user_id: UserId },
    /// 加入会话，开始接收该会话范围内的事件
    JoinChat { conversation_id: ConversationId },
    /// 输入状态变化
    Typing {
        conversation_id: ConversationId,
        is_typing: bool,
    },
    /// 发送文本消息
    SendMessage {
        conversation_id: ConversationId,
        content: String,
    },
    /// 收到对方消息后的送达确认
    MessageDelivered {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
    /// 请求资源全量快照，服务端以同名事件回推
    RequestSnapshot { kind: ResourceKind },
}

impl ClientEvent {
    /// 事件名
    pub fn name(&self) -> EventName {
        match self {
            ClientEvent::Join { .. } => EventName::Join,
            ClientEvent::JoinChat { .. } => EventName::JoinChat,
            ClientEvent::Typing { .. } => EventName::Typing,
            ClientEvent::SendMessage { .. } => EventName::SendMessage,
            ClientEvent::MessageDelivered { .. } => EventName::MessageDelivered,
            ClientEvent::RequestSnapshot { kind } => EventName::ResourceUpdate(*kind),
        }
    }

    /// 线上负载
    pub fn payload(&self) -> JsonValue {
        match self {
            ClientEvent::Join { user_id } => json!({ "userId": user_id }),
            ClientEvent::JoinChat { conversation_id } => {
                json!({ "conversationId": conversation_id })
            }
            ClientEvent::Typing {
                conversation_id,
                is_typing,
            } => json!({ "conversationId": conversation_id, "isTyping": is_typing }),
            ClientEvent::SendMessage {
                conversation_id,
                content,
            } => json!({ "conversationId": conversation_id, "content": content }),
            ClientEvent::MessageDelivered {
                conversation_id,
                message_id,
            } => json!({ "conversationId": conversation_id, "messageId": message_id }),
            ClientEvent::RequestSnapshot { .. } => JsonValue::Null,
        }
    }
}
