//! 服务端推送事件
//!
//! 每个事件名对应一个封闭的负载类型，处理方可以穷举匹配，
//! 不需要防御性地探测字段。

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::entities::message::Message;
use crate::entities::notification::{Notification, NotificationKind, NotificationPriority};
use crate::errors::{DomainError, DomainResult};
use crate::events::event_name::EventName;
use crate::events::resource::ResourceKind;
use crate::value_objects::{ConversationId, MessageId, NotificationId, Timestamp, UserId};

/// 输入状态负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub is_typing: bool,
}

/// 送达确认负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPayload {
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
}

/// 批量已读负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenPayload {
    pub conversation_id: ConversationId,
    pub seen_by: UserId,
}

/// 在线状态负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub user_id: UserId,
}

/// 通知推送负载
///
/// 服务端推送的通知字段不完整时使用本地兜底值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPush {
    #[serde(default)]
    pub id: Option<NotificationId>,
    #[serde(rename = "type", default)]
    pub kind: Option<NotificationKind>,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: Option<NotificationPriority>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl NotificationPush {
    /// 转换为通知实体，缺失字段用本地值补齐
    pub fn into_notification(self, now: Timestamp) -> Notification {
        Notification::new(
            self.id
                .unwrap_or_else(|| NotificationId::from(Uuid::new_v4())),
            self.kind.unwrap_or_default(),
            self.title,
            self.message,
            self.priority.unwrap_or_default(),
            self.created_at.unwrap_or(now),
        )
    }
}

/// 管理员警告负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminWarningPayload {
    #[serde(default)]
    pub title: Option<String>,
    pub message: String,
}

/// 强制下线负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceLogoutPayload {
    pub reason: String,
}

/// 实时统计快照负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatsPayload {
    #[serde(default)]
    pub online_users: u64,
    #[serde(default)]
    pub active_listings: u64,
    #[serde(default)]
    pub bookings_today: u64,
}

/// 实时活动负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPayload {
    pub action: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

/// 用户状态变化负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusPayload {
    pub user_id: UserId,
    pub online: bool,
}

/// 服务端推送事件
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// 连接建立（本地合成）
    Connect,
    /// 连接断开（本地合成）
    Disconnect { reason: Option<String> },
    /// 连接失败（本地合成）
    ConnectError { description: String },
    /// 对方输入状态
    UserTyping(TypingPayload),
    /// 新消息
    ReceiveMessage(Message),
    /// 消息送达确认
    MessageDelivered(DeliveryPayload),
    /// 消息批量已读
    MessagesSeen(SeenPayload),
    /// 参与者上线
    UserOnline(PresencePayload),
    /// 参与者下线
    UserOffline(PresencePayload),
    /// 新通知
    NewNotification(NotificationPush),
    /// 管理员警告
    AdminWarning(AdminWarningPayload),
    /// 全局广播通知
    GlobalNotification(NotificationPush),
    /// 强制下线
    ForceLogout(ForceLogoutPayload),
    /// 资源全量替换（数组负载）或单项更新（对象负载）
    ResourceUpdate {
        kind: ResourceKind,
        payload: JsonValue,
    },
    /// 资源新建
    ResourceCreated { kind: ResourceKind, item: JsonValue },
    /// 资源删除
    ResourceDeleted { kind: ResourceKind, id: String },
    /// 实时统计快照
    LiveStats(LiveStatsPayload),
    /// 实时活动
    RealtimeActivity(ActivityPayload),
    /// 用户状态变化
    UserStatusUpdate(UserStatusPayload),
}

fn decode_payload<T: serde::de::DeserializeOwned>(
    name: EventName,
    data: JsonValue,
) -> DomainResult<T> {
    serde_json::from_value(data)
        .map_err(|e| DomainError::event_decode_error(name.as_str(), e.to_string()))
}

impl ServerEvent {
    /// 事件对应的事件名
    pub fn name(&self) -> EventName {
        match self {
            ServerEvent::Connect => EventName::Connect,
            ServerEvent::Disconnect { .. } => EventName::Disconnect,
            ServerEvent::ConnectError { .. } => EventName::ConnectError,
            ServerEvent::UserTyping(_) => EventName::UserTyping,
            ServerEvent::ReceiveMessage(_) => EventName::ReceiveMessage,
            ServerEvent::MessageDelivered(_) => EventName::MessageDelivered,
            ServerEvent::MessagesSeen(_) => EventName::MessagesSeen,
            ServerEvent::UserOnline(_) => EventName::UserOnline,
            ServerEvent::UserOffline(_) => EventName::UserOffline,
            ServerEvent::NewNotification(_) => EventName::NewNotification,
            ServerEvent::AdminWarning(_) => EventName::AdminWarning,
            ServerEvent::GlobalNotification(_) => EventName::GlobalNotification,
            ServerEvent::ForceLogout(_) => EventName::ForceLogout,
            ServerEvent::ResourceUpdate { kind, .. } => EventName::ResourceUpdate(*kind),
            ServerEvent::ResourceCreated { kind, .. } => EventName::ResourceCreated(*kind),
            ServerEvent::ResourceDeleted { kind, .. } => EventName::ResourceDeleted(*kind),
            ServerEvent::LiveStats(_) => EventName::LiveStats,
            ServerEvent::RealtimeActivity(_) => EventName::RealtimeActivity,
            ServerEvent::UserStatusUpdate(_) => EventName::UserStatusUpdate,
        }
    }

    /// 按事件名解码负载
    pub fn decode(name: EventName, data: JsonValue) -> DomainResult<ServerEvent> {
        let event = match name {
            EventName::Connect => ServerEvent::Connect,
            EventName::Disconnect => ServerEvent::Disconnect {
                reason: data.as_str().map(|s| s.to_string()),
            },
            EventName::ConnectError => ServerEvent::ConnectError {
                description: data
                    .as_str()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| data.to_string()),
            },
            EventName::UserTyping => ServerEvent::UserTyping(decode_payload(name, data)?),
            EventName::ReceiveMessage => ServerEvent::ReceiveMessage(decode_payload(name, data)?),
            EventName::MessageDelivered => {
                ServerEvent::MessageDelivered(decode_payload(name, data)?)
            }
            EventName::MessagesSeen => ServerEvent::MessagesSeen(decode_payload(name, data)?),
            EventName::UserOnline => ServerEvent::UserOnline(decode_payload(name, data)?),
            EventName::UserOffline => ServerEvent::UserOffline(decode_payload(name, data)?),
            EventName::NewNotification => {
                ServerEvent::NewNotification(decode_payload(name, data)?)
            }
            EventName::AdminWarning => ServerEvent::AdminWarning(decode_payload(name, data)?),
            EventName::GlobalNotification => {
                ServerEvent::GlobalNotification(decode_payload(name, data)?)
            }
            EventName::ForceLogout => ServerEvent::ForceLogout(decode_payload(name, data)?),
            EventName::ResourceUpdate(kind) => ServerEvent::ResourceUpdate {
                kind,
                payload: data,
            },
            EventName::ResourceCreated(kind) => ServerEvent::ResourceCreated { kind, item: data },
            EventName::ResourceDeleted(kind) => {
                let id = match &data {
                    JsonValue::String(id) => id.clone(),
                    JsonValue::Object(map) => map
                        .get("id")
                        .map(|v| match v {
                            JsonValue::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .ok_or_else(|| {
                            DomainError::event_decode_error(name.as_str(), "missing id")
                        })?,
                    _ => {
                        return Err(DomainError::event_decode_error(
                            name.as_str(),
                            "unsupported payload",
                        ))
                    }
                };
                ServerEvent::ResourceDeleted { kind, id }
            }
            EventName::LiveStats => ServerEvent::LiveStats(decode_payload(name, data)?),
            EventName::RealtimeActivity => {
                ServerEvent::RealtimeActivity(decode_payload(name, data)?)
            }
            EventName::UserStatusUpdate => {
                ServerEvent::UserStatusUpdate(decode_payload(name, data)?)
            }
            // 纯客户端事件名不会作为服务端事件出现
            EventName::Join
            | EventName::JoinChat
            | EventName::Typing
            | EventName::SendMessage => {
                return Err(DomainError::event_decode_error(
                    name.as_str(),
                    "client-only event",
                ))
            }
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_receive_message() {
        let conversation_id = Uuid::new_v4();
        let sender_id = Uuid::new_v4();
        let message_id = Uuid::new_v4();
        let data = json!({
            "id": message_id,
            "conversationId": conversation_id,
            "senderId": sender_id,
            "content": "周六可以看房吗",
            "attachment": null,
            "createdAt": "2025-06-01T10:00:00Z",
            "deliveryStatus": "sent"
        });

        let event = ServerEvent::decode(EventName::ReceiveMessage, data).unwrap();
        match event {
            ServerEvent::ReceiveMessage(message) => {
                assert_eq!(message.id, MessageId::from(message_id));
                assert_eq!(message.conversation_id, ConversationId::from(conversation_id));
                assert_eq!(message.content.as_deref(), Some("周六可以看房吗"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_typing() {
        let data = json!({
            "conversationId": Uuid::new_v4(),
            "userId": Uuid::new_v4(),
            "isTyping": true
        });
        let event = ServerEvent::decode(EventName::UserTyping, data).unwrap();
        assert!(matches!(
            event,
            ServerEvent::UserTyping(TypingPayload { is_typing: true, .. })
        ));
    }

    #[test]
    fn test_decode_resource_deleted_variants() {
        let by_object = ServerEvent::decode(
            EventName::ResourceDeleted(ResourceKind::Listing),
            json!({ "id": "42" }),
        )
        .unwrap();
        assert_eq!(
            by_object,
            ServerEvent::ResourceDeleted {
                kind: ResourceKind::Listing,
                id: "42".to_string()
            }
        );

        let by_string = ServerEvent::decode(
            EventName::ResourceDeleted(ResourceKind::Booking),
            json!("abc"),
        )
        .unwrap();
        assert_eq!(
            by_string,
            ServerEvent::ResourceDeleted {
                kind: ResourceKind::Booking,
                id: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_notification_push_fallbacks() {
        let now = chrono::Utc::now();
        let push: NotificationPush = serde_json::from_value(json!({
            "title": "系统维护",
            "message": "今晚 23:00 停机维护"
        }))
        .unwrap();
        let notification = push.into_notification(now);
        assert_eq!(notification.kind, NotificationKind::Generic);
        assert_eq!(notification.priority, NotificationPriority::Medium);
        assert_eq!(notification.created_at, now);
        assert!(!notification.is_read);
    }

    #[test]
    fn test_decode_malformed_payload_is_error() {
        let result = ServerEvent::decode(EventName::MessagesSeen, json!({ "bogus": 1 }));
        assert!(result.is_err());
    }
}
