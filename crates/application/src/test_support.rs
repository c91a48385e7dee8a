//! 应用层测试工具
//!
//! 手写的传输层与协作方 API 替身，测试中直接注入事件。

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use domain::{
    ApiError, ClientEvent, CollaboratorApi, Conversation, ConversationId, EventName, Message,
    MessageId, NewMessage, Notification, NotificationId, ServerEvent, Timestamp, Transport,
    TransportError, TransportState, UserId,
};

use crate::clock::Clock;

/// 固定时钟
pub struct FixedClock(Timestamp);

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self(now)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// 传输层替身：记录发出的事件，状态可控
pub struct FakeTransport {
    connected: AtomicBool,
    fail_emit: AtomicBool,
    emitted: Mutex<Vec<ClientEvent>>,
    state_tx: watch::Sender<TransportState>,
}

impl FakeTransport {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(TransportState::Connected);
        Self {
            connected: AtomicBool::new(true),
            fail_emit: AtomicBool::new(false),
            emitted: Mutex::new(Vec::new()),
            state_tx,
        }
    }

    pub fn emitted(&self) -> Vec<ClientEvent> {
        self.emitted.lock().unwrap().clone()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
        self.state_tx.send_replace(if connected {
            TransportState::Connected
        } else {
            TransportState::Disconnected
        });
    }

    pub fn set_fail_emit(&self, fail: bool) {
        self.fail_emit.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, _identity: UserId) -> Result<(), TransportError> {
        self.set_connected(true);
        Ok(())
    }

    async fn disconnect(&self) {
        self.set_connected(false);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn emit(&self, event: ClientEvent) -> Result<(), TransportError> {
        if self.fail_emit.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.emitted.lock().unwrap().push(event);
        Ok(())
    }

    async fn subscribe(&self, _event: EventName) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (_tx, rx) = mpsc::unbounded_channel();
        rx
    }

    async fn unsubscribe(&self, _event: EventName) {}

    fn state(&self) -> watch::Receiver<TransportState> {
        self.state_tx.subscribe()
    }
}

/// 协作方 API 替身：可配置响应并记录调用
pub struct FakeApi {
    conversations: Mutex<Vec<Conversation>>,
    messages: Mutex<Vec<Message>>,
    notifications: Mutex<Vec<Notification>>,
    sent: Mutex<Vec<NewMessage>>,
    seen: Mutex<Vec<ConversationId>>,
    read: Mutex<Vec<NotificationId>>,
    read_all_calls: Mutex<u32>,
    failing: Mutex<HashSet<&'static str>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            conversations: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            seen: Mutex::new(Vec::new()),
            read: Mutex::new(Vec::new()),
            read_all_calls: Mutex::new(0),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn set_conversations(&self, conversations: Vec<Conversation>) {
        *self.conversations.lock().unwrap() = conversations;
    }

    pub fn set_notifications(&self, notifications: Vec<Notification>) {
        *self.notifications.lock().unwrap() = notifications;
    }

    pub fn fail_on(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn sent_messages(&self) -> Vec<NewMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn seen_calls(&self) -> Vec<ConversationId> {
        self.seen.lock().unwrap().clone()
    }

    pub fn read_calls(&self) -> Vec<NotificationId> {
        self.read.lock().unwrap().clone()
    }

    pub fn read_all_calls(&self) -> u32 {
        *self.read_all_calls.lock().unwrap()
    }

    fn check(&self, operation: &'static str) -> Result<(), ApiError> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(ApiError::Status { code: 500 });
        }
        Ok(())
    }
}

#[async_trait]
impl CollaboratorApi for FakeApi {
    async fn fetch_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.check("fetch_conversations")?;
        Ok(self.conversations.lock().unwrap().clone())
    }

    async fn fetch_messages(
        &self,
        _conversation_id: ConversationId,
    ) -> Result<Vec<Message>, ApiError> {
        self.check("fetch_messages")?;
        Ok(self.messages.lock().unwrap().clone())
    }

    async fn send_message(&self, message: NewMessage) -> Result<Message, ApiError> {
        self.check("send_message")?;
        self.sent.lock().unwrap().push(message.clone());
        let confirmed = match message.attachment {
            Some(upload) => Message::new_with_attachment(
                MessageId::from(Uuid::new_v4()),
                message.conversation_id,
                UserId::from(Uuid::new_v4()),
                message.content,
                domain::Attachment {
                    filename: upload.filename,
                    url: format!("https://cdn.example.com/{}", Uuid::new_v4()),
                    mime_type: upload.mime_type,
                },
                chrono::Utc::now(),
            ),
            None => Message::new_text(
                MessageId::from(Uuid::new_v4()),
                message.conversation_id,
                UserId::from(Uuid::new_v4()),
                message.content.unwrap_or_default(),
                chrono::Utc::now(),
            )
            .map_err(|e| ApiError::Decode(e.to_string()))?,
        };
        Ok(confirmed)
    }

    async fn mark_seen(&self, conversation_id: ConversationId) -> Result<(), ApiError> {
        self.check("mark_seen")?;
        self.seen.lock().unwrap().push(conversation_id);
        Ok(())
    }

    async fn fetch_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.check("fetch_notifications")?;
        Ok(self.notifications.lock().unwrap().clone())
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<(), ApiError> {
        self.check("mark_notification_read")?;
        self.read.lock().unwrap().push(id);
        Ok(())
    }

    async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        self.check("mark_all_notifications_read")?;
        *self.read_all_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn save_listing(&self, _payload: serde_json::Value) -> Result<(), ApiError> {
        self.check("save_listing")
    }

    async fn create_booking(&self, _payload: serde_json::Value) -> Result<(), ApiError> {
        self.check("create_booking")
    }

    async fn submit_review(&self, _payload: serde_json::Value) -> Result<(), ApiError> {
        self.check("submit_review")
    }
}
