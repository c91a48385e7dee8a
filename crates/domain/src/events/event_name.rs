//! 事件名枚举
//!
//! 封闭的事件名集合，订阅与分发都以它为键。

use crate::events::resource::ResourceKind;

/// 线上契约中的事件名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// 传输层：连接建立
    Connect,
    /// 传输层：连接断开
    Disconnect,
    /// 传输层：连接失败
    ConnectError,
    /// 客户端：身份宣告握手
    Join,
    /// 客户端：加入会话
    JoinChat,
    /// 客户端：输入状态变化
    Typing,
    /// 客户端：发送文本消息
    SendMessage,
    /// 服务端：对方输入状态
    UserTyping,
    /// 服务端：新消息
    ReceiveMessage,
    /// 服务端：消息送达确认
    MessageDelivered,
    /// 服务端：消息批量已读
    MessagesSeen,
    /// 服务端：参与者上线
    UserOnline,
    /// 服务端：参与者下线
    UserOffline,
    /// 服务端：新通知
    NewNotification,
    /// 服务端：管理员警告
    AdminWarning,
    /// 服务端：全局广播通知
    GlobalNotification,
    /// 服务端：强制下线
    ForceLogout,
    /// 服务端：资源全量/单项更新
    ResourceUpdate(ResourceKind),
    /// 服务端：资源新建
    ResourceCreated(ResourceKind),
    /// 服务端：资源删除
    ResourceDeleted(ResourceKind),
    /// 服务端：实时统计快照
    LiveStats,
    /// 服务端：实时活动流
    RealtimeActivity,
    /// 服务端：用户状态变化
    UserStatusUpdate,
}

impl EventName {
    /// 线上事件名
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::Connect => "connect",
            EventName::Disconnect => "disconnect",
            EventName::ConnectError => "connect_error",
            EventName::Join => "join",
            EventName::JoinChat => "joinChat",
            EventName::Typing => "typing",
            EventName::SendMessage => "sendMessage",
            EventName::UserTyping => "userTyping",
            EventName::ReceiveMessage => "receiveMessage",
            EventName::MessageDelivered => "messageDelivered",
            EventName::MessagesSeen => "messagesSeen",
            EventName::UserOnline => "userOnline",
            EventName::UserOffline => "userOffline",
            EventName::NewNotification => "newNotification",
            EventName::AdminWarning => "adminWarning",
            EventName::GlobalNotification => "globalNotification",
            EventName::ForceLogout => "forceLogout",
            EventName::ResourceUpdate(kind) => kind.update_event(),
            EventName::ResourceCreated(kind) => kind.created_event(),
            EventName::ResourceDeleted(kind) => kind.deleted_event(),
            EventName::LiveStats => "liveStats",
            EventName::RealtimeActivity => "realtimeActivity",
            EventName::UserStatusUpdate => "userStatusUpdate",
        }
    }

    /// 从线上事件名解析，未知名字返回 None
    pub fn parse(name: &str) -> Option<Self> {
        let parsed = match name {
            "connect" => EventName::Connect,
            "disconnect" => EventName::Disconnect,
            "connect_error" => EventName::ConnectError,
            "join" => EventName::Join,
            "joinChat" => EventName::JoinChat,
            "typing" => EventName::Typing,
            "sendMessage" => EventName::SendMessage,
            "userTyping" => EventName::UserTyping,
            "receiveMessage" => EventName::ReceiveMessage,
            "messageDelivered" => EventName::MessageDelivered,
            "messagesSeen" => EventName::MessagesSeen,
            "userOnline" => EventName::UserOnline,
            "userOffline" => EventName::UserOffline,
            "newNotification" => EventName::NewNotification,
            "adminWarning" => EventName::AdminWarning,
            "globalNotification" => EventName::GlobalNotification,
            "forceLogout" => EventName::ForceLogout,
            "liveStats" => EventName::LiveStats,
            "realtimeActivity" => EventName::RealtimeActivity,
            "userStatusUpdate" => EventName::UserStatusUpdate,
            other => {
                for kind in ResourceKind::ALL {
                    if other == kind.update_event() {
                        return Some(EventName::ResourceUpdate(kind));
                    }
                    if other == kind.created_event() {
                        return Some(EventName::ResourceCreated(kind));
                    }
                    if other == kind.deleted_event() {
                        return Some(EventName::ResourceDeleted(kind));
                    }
                }
                return None;
            }
        };
        Some(parsed)
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
