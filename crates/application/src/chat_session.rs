//! 会话控制器
//!
//! 每个会话一条状态机：idle -> joined -> idle。
//! 负责消息排序、送达状态追踪、输入指示与在线集合，
//! 并把状态以快照形式发布给 UI。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, warn};

use config::ChatConfig;
use domain::{
    AttachmentUpload, ClientEvent, CollaboratorApi, Conversation, ConversationId, DeliveryStatus,
    DomainError, Message, NewMessage, ServerEvent, Transport, UserId,
};

use crate::errors::ChatResult;

/// 会话状态快照，UI 直接渲染
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    /// 按 created_at 非降序排列的消息列表
    pub messages: Vec<Message>,
    /// 正在输入的用户
    pub typing: Vec<UserId>,
    /// 在线的参与者
    pub online: Vec<UserId>,
}

/// 已加入会话的内部状态
struct SessionState {
    messages: Vec<Message>,
    /// 用户 -> 输入代次，过期定时器据此判断是否仍然有效
    typing: HashMap<UserId, u64>,
    online: HashSet<UserId>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

/// 会话控制器依赖
pub struct ChatSessionDependencies {
    pub transport: Arc<dyn Transport>,
    pub api: Arc<dyn CollaboratorApi>,
    pub identity: UserId,
    pub config: ChatConfig,
    /// 非焦点会话的来件通知出口（由通知扇出层消费）
    pub message_notices: mpsc::UnboundedSender<Message>,
}

/// 会话控制器
#[derive(Clone)]
pub struct ChatSessionController {
    transport: Arc<dyn Transport>,
    api: Arc<dyn CollaboratorApi>,
    identity: UserId,
    config: ChatConfig,
    message_notices: mpsc::UnboundedSender<Message>,
    conversations: Arc<RwLock<Vec<Conversation>>>,
    conversations_tx: Arc<watch::Sender<Vec<Conversation>>>,
    sessions: Arc<RwLock<HashMap<ConversationId, SessionState>>>,
    focused: Arc<RwLock<Option<ConversationId>>>,
    /// 输入代次计数器，入站与出站的过期定时器共用
    generation: Arc<AtomicU64>,
    /// 出站输入状态的最新代次
    outbound_typing: Arc<RwLock<HashMap<ConversationId, u64>>>,
}

/// 按时间序插入，相同时间戳按到达顺序排在后面
fn insert_ordered(messages: &mut Vec<Message>, message: Message) {
    let idx = messages.partition_point(|m| m.created_at <= message.created_at);
    messages.insert(idx, message);
}

impl ChatSessionController {
    /// 创建会话控制器
    pub fn new(deps: ChatSessionDependencies) -> Self {
        let (conversations_tx, _) = watch::channel(Vec::new());
        Self {
            transport: deps.transport,
            api: deps.api,
            identity: deps.identity,
            config: deps.config,
            message_notices: deps.message_notices,
            conversations: Arc::new(RwLock::new(Vec::new())),
            conversations_tx: Arc::new(conversations_tx),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            focused: Arc::new(RwLock::new(None)),
            generation: Arc::new(AtomicU64::new(1)),
            outbound_typing: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 登录后从协作方 API 拉取会话列表
    pub async fn bootstrap(&self) {
        match self.api.fetch_conversations().await {
            Ok(list) => {
                let mut conversations = self.conversations.write().await;
                *conversations = list;
                self.conversations_tx.send_replace(conversations.clone());
            }
            Err(e) => warn!("conversation bootstrap failed: {}", e),
        }
    }

    /// 会话列表观察端
    pub fn conversations(&self) -> watch::Receiver<Vec<Conversation>> {
        self.conversations_tx.subscribe()
    }

    /// 加入会话：订阅会话范围内的事件并拉取历史消息
    ///
    /// 重复加入返回同一份快照流。
    pub async fn join(&self, conversation_id: ConversationId) -> watch::Receiver<SessionSnapshot> {
        let receiver = {
            let mut sessions = self.sessions.write().await;
            if let Some(state) = sessions.get(&conversation_id) {
                return state.snapshot_tx.subscribe();
            }
            let (snapshot_tx, receiver) = watch::channel(SessionSnapshot::default());
            sessions.insert(
                conversation_id,
                SessionState {
                    messages: Vec::new(),
                    typing: HashMap::new(),
                    online: HashSet::new(),
                    snapshot_tx,
                },
            );
            receiver
        };

        if let Err(e) = self
            .transport
            .emit(ClientEvent::JoinChat { conversation_id })
            .await
        {
            debug!("joinChat emit skipped for {}: {}", conversation_id, e);
        }

        match self.api.fetch_messages(conversation_id).await {
            Ok(history) => {
                let mut sessions = self.sessions.write().await;
                if let Some(state) = sessions.get_mut(&conversation_id) {
                    for message in history {
                        if state.messages.iter().any(|m| m.id == message.id) {
                            continue;
                        }
                        insert_ordered(&mut state.messages, message);
                    }
                    Self::publish(state);
                }
            }
            Err(e) => warn!("history fetch failed for {}: {}", conversation_id, e),
        }

        receiver
    }

    /// 离开会话：退订并释放会话状态
    pub async fn leave(&self, conversation_id: ConversationId) {
        self.sessions.write().await.remove(&conversation_id);
        let mut focused = self.focused.write().await;
        if *focused == Some(conversation_id) {
            *focused = None;
        }
    }

    /// 会话获得焦点：清零未读并批量标记已读
    pub async fn focus(&self, conversation_id: ConversationId) {
        *self.focused.write().await = Some(conversation_id);
        {
            let mut conversations = self.conversations.write().await;
            if let Some(conversation) =
                conversations.iter_mut().find(|c| c.id == conversation_id)
            {
                conversation.mark_focused();
            }
            self.conversations_tx.send_replace(conversations.clone());
        }
        self.spawn_mark_seen(conversation_id);
    }

    /// 取消焦点（切换到其它页面）
    pub async fn clear_focus(&self) {
        *self.focused.write().await = None;
    }

    /// 发送消息：文本走持久连接，含附件时走 multipart API
    ///
    /// 本地只追加服务端确认后的消息，不做乐观占位。
    pub async fn send_message(
        &self,
        conversation_id: ConversationId,
        content: Option<String>,
        attachment: Option<AttachmentUpload>,
    ) -> ChatResult<()> {
        let content = content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        match (content, attachment) {
            (None, None) => Err(DomainError::validation_error(
                "message",
                "文本与附件至少填写其一",
            )
            .into()),
            (content, Some(attachment)) => {
                // 二进制负载不经过持久连接
                let message = self
                    .api
                    .send_message(NewMessage {
                        conversation_id,
                        content,
                        attachment: Some(attachment),
                    })
                    .await?;
                self.append_confirmed(message).await;
                Ok(())
            }
            (Some(content), None) => {
                self.transport
                    .emit(ClientEvent::SendMessage {
                        conversation_id,
                        content,
                    })
                    .await?;
                // 服务端回推 receiveMessage 时追加确认后的消息
                Ok(())
            }
        }
    }

    /// 输入框在空/非空之间切换时调用
    ///
    /// 发出输入状态，并在静默窗口后自动补发停止信号，
    /// 防止停止事件丢失时对方的指示器悬挂。
    pub async fn notify_typing(&self, conversation_id: ConversationId, has_text: bool) {
        if let Err(e) = self
            .transport
            .emit(ClientEvent::Typing {
                conversation_id,
                is_typing: has_text,
            })
            .await
        {
            debug!("typing signal skipped: {}", e);
            return;
        }

        let generation = self.next_generation();
        self.outbound_typing
            .write()
            .await
            .insert(conversation_id, generation);

        if has_text {
            let controller = self.clone();
            let window = Duration::from_secs(self.config.typing_expiry_secs);
            tokio::spawn(async move {
                tokio::time::sleep(window).await;
                let current = controller
                    .outbound_typing
                    .read()
                    .await
                    .get(&conversation_id)
                    .copied();
                if current == Some(generation) {
                    let _ = controller
                        .transport
                        .emit(ClientEvent::Typing {
                            conversation_id,
                            is_typing: false,
                        })
                        .await;
                }
            });
        }
    }

    /// 重连后为仍然打开的会话补发 joinChat
    pub async fn rejoin_all(&self) {
        let conversation_ids: Vec<ConversationId> =
            self.sessions.read().await.keys().copied().collect();
        for conversation_id in conversation_ids {
            if let Err(e) = self
                .transport
                .emit(ClientEvent::JoinChat { conversation_id })
                .await
            {
                debug!("rejoin emit skipped for {}: {}", conversation_id, e);
            }
        }
    }

    /// 处理会话命名空间内的服务端事件
    pub async fn handle_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::ReceiveMessage(message) => self.on_receive_message(message).await,
            ServerEvent::MessageDelivered(payload) => {
                let mut sessions = self.sessions.write().await;
                if let Some(state) = sessions.get_mut(&payload.conversation_id) {
                    if let Some(message) = state
                        .messages
                        .iter_mut()
                        .find(|m| m.id == payload.message_id)
                    {
                        message.advance_delivery(DeliveryStatus::Delivered);
                        Self::publish(state);
                    }
                }
            }
            ServerEvent::MessagesSeen(payload) => {
                if payload.seen_by == self.identity {
                    return;
                }
                let mut sessions = self.sessions.write().await;
                if let Some(state) = sessions.get_mut(&payload.conversation_id) {
                    for message in state
                        .messages
                        .iter_mut()
                        .filter(|m| m.sender_id == self.identity)
                    {
                        message.advance_delivery(DeliveryStatus::Seen);
                    }
                    Self::publish(state);
                }
            }
            ServerEvent::UserTyping(payload) => {
                if payload.user_id == self.identity {
                    return;
                }
                let generation = self.next_generation();
                let mut sessions = self.sessions.write().await;
                if let Some(state) = sessions.get_mut(&payload.conversation_id) {
                    if payload.is_typing {
                        state.typing.insert(payload.user_id, generation);
                        Self::publish(state);
                        drop(sessions);
                        self.spawn_typing_expiry(
                            payload.conversation_id,
                            payload.user_id,
                            generation,
                        );
                    } else {
                        state.typing.remove(&payload.user_id);
                        Self::publish(state);
                    }
                }
            }
            ServerEvent::UserOnline(payload) => self.set_presence(payload.user_id, true).await,
            ServerEvent::UserOffline(payload) => self.set_presence(payload.user_id, false).await,
            other => debug!("chat controller ignoring {}", other.name()),
        }
    }

    async fn on_receive_message(&self, message: Message) {
        let conversation_id = message.conversation_id;
        let from_peer = message.sender_id != self.identity;
        let focused = *self.focused.read().await == Some(conversation_id);

        {
            let mut conversations = self.conversations.write().await;
            match conversations.iter_mut().find(|c| c.id == conversation_id) {
                Some(conversation) => {
                    conversation.record_message(&message, self.identity);
                    if focused {
                        conversation.mark_focused();
                    }
                }
                None if from_peer => {
                    // 对方发起的新会话，本地补一条会话记录
                    let mut conversation =
                        Conversation::new(conversation_id, message.sender_id);
                    conversation.record_message(&message, self.identity);
                    conversations.push(conversation);
                }
                None => {}
            }
            self.conversations_tx.send_replace(conversations.clone());
        }

        let appended = {
            let mut sessions = self.sessions.write().await;
            match sessions.get_mut(&conversation_id) {
                Some(state) => {
                    if state.messages.iter().any(|m| m.id == message.id) {
                        false
                    } else {
                        state.typing.remove(&message.sender_id);
                        insert_ordered(&mut state.messages, message.clone());
                        Self::publish(state);
                        true
                    }
                }
                None => false,
            }
        };

        if from_peer && appended {
            // 收到即确认送达
            if let Err(e) = self
                .transport
                .emit(ClientEvent::MessageDelivered {
                    conversation_id,
                    message_id: message.id,
                })
                .await
            {
                debug!("delivery ack skipped: {}", e);
            }
            if focused {
                self.spawn_mark_seen(conversation_id);
            }
        }
        if from_peer && !focused {
            let _ = self.message_notices.send(message);
        }
    }

    /// 追加服务端确认后的本方消息
    async fn append_confirmed(&self, message: Message) {
        let conversation_id = message.conversation_id;
        {
            let mut conversations = self.conversations.write().await;
            if let Some(conversation) =
                conversations.iter_mut().find(|c| c.id == conversation_id)
            {
                conversation.record_message(&message, self.identity);
            }
            self.conversations_tx.send_replace(conversations.clone());
        }
        let mut sessions = self.sessions.write().await;
        if let Some(state) = sessions.get_mut(&conversation_id) {
            if !state.messages.iter().any(|m| m.id == message.id) {
                insert_ordered(&mut state.messages, message);
                Self::publish(state);
            }
        }
    }

    async fn set_presence(&self, user_id: UserId, online: bool) {
        if user_id == self.identity {
            return;
        }
        let conversation_ids: Vec<ConversationId> = self
            .conversations
            .read()
            .await
            .iter()
            .filter(|c| c.participant == user_id)
            .map(|c| c.id)
            .collect();
        let mut sessions = self.sessions.write().await;
        for conversation_id in conversation_ids {
            if let Some(state) = sessions.get_mut(&conversation_id) {
                if online {
                    state.online.insert(user_id);
                } else {
                    state.online.remove(&user_id);
                }
                Self::publish(state);
            }
        }
    }

    fn spawn_typing_expiry(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        generation: u64,
    ) {
        let sessions = self.sessions.clone();
        let window = Duration::from_secs(self.config.typing_expiry_secs);
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let mut sessions = sessions.write().await;
            if let Some(state) = sessions.get_mut(&conversation_id) {
                // 静默窗口内没有新的输入信号才清除
                if state.typing.get(&user_id) == Some(&generation) {
                    state.typing.remove(&user_id);
                    Self::publish(state);
                }
            }
        });
    }

    fn spawn_mark_seen(&self, conversation_id: ConversationId) {
        let api = self.api.clone();
        tokio::spawn(async move {
            if let Err(e) = api.mark_seen(conversation_id).await {
                warn!("mark seen failed for {}: {}", conversation_id, e);
            }
        });
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    fn publish(state: &SessionState) {
        state.snapshot_tx.send_replace(SessionSnapshot {
            messages: state.messages.clone(),
            typing: state.typing.keys().copied().collect(),
            online: state.online.iter().copied().collect(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeApi, FakeTransport};
    use chrono::{Duration as ChronoDuration, Utc};
    use domain::{DeliveryPayload, MessageId, SeenPayload, TypingPayload};
    use uuid::Uuid;

    struct Harness {
        controller: ChatSessionController,
        transport: Arc<FakeTransport>,
        api: Arc<FakeApi>,
        identity: UserId,
        _notices: mpsc::UnboundedReceiver<Message>,
    }

    fn harness() -> Harness {
        let transport = Arc::new(FakeTransport::new());
        let api = Arc::new(FakeApi::new());
        let identity = UserId::from(Uuid::new_v4());
        let (notice_tx, notices) = mpsc::unbounded_channel();
        let controller = ChatSessionController::new(ChatSessionDependencies {
            transport: transport.clone(),
            api: api.clone(),
            identity,
            config: ChatConfig::default(),
            message_notices: notice_tx,
        });
        Harness {
            controller,
            transport,
            api,
            identity,
            _notices: notices,
        }
    }

    fn message_at(
        conversation_id: ConversationId,
        sender_id: UserId,
        content: &str,
        created_at: domain::Timestamp,
    ) -> Message {
        Message::new_text(
            MessageId::from(Uuid::new_v4()),
            conversation_id,
            sender_id,
            content,
            created_at,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_messages_stay_sorted_with_stable_ties() {
        let h = harness();
        let conversation_id = ConversationId::from(Uuid::new_v4());
        let peer = UserId::from(Uuid::new_v4());
        let rx = h.controller.join(conversation_id).await;

        let base = Utc::now();
        let m1 = message_at(conversation_id, peer, "第一条", base);
        let m2 = message_at(conversation_id, peer, "乱序的早消息", base - ChronoDuration::seconds(10));
        let m3 = message_at(conversation_id, peer, "并列时间戳", base);

        for m in [m1.clone(), m2.clone(), m3.clone()] {
            h.controller
                .handle_event(ServerEvent::ReceiveMessage(m))
                .await;
        }

        let snapshot = rx.borrow().clone();
        let contents: Vec<_> = snapshot
            .messages
            .iter()
            .map(|m| m.content.clone().unwrap())
            .collect();
        // 非降序排列；相同时间戳按到达顺序
        assert_eq!(contents, vec!["乱序的早消息", "第一条", "并列时间戳"]);
    }

    #[tokio::test]
    async fn test_duplicate_messages_are_dropped() {
        let h = harness();
        let conversation_id = ConversationId::from(Uuid::new_v4());
        let peer = UserId::from(Uuid::new_v4());
        let rx = h.controller.join(conversation_id).await;

        let m = message_at(conversation_id, peer, "重复推送", Utc::now());
        h.controller
            .handle_event(ServerEvent::ReceiveMessage(m.clone()))
            .await;
        h.controller
            .handle_event(ServerEvent::ReceiveMessage(m))
            .await;

        assert_eq!(rx.borrow().messages.len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_status_progression() {
        let h = harness();
        let conversation_id = ConversationId::from(Uuid::new_v4());
        let peer = UserId::from(Uuid::new_v4());
        let rx = h.controller.join(conversation_id).await;

        // 本方消息（回推确认）
        let own = message_at(conversation_id, h.identity, "Hi", Utc::now());
        h.controller
            .handle_event(ServerEvent::ReceiveMessage(own.clone()))
            .await;
        assert_eq!(
            rx.borrow().messages[0].delivery_status,
            DeliveryStatus::Sent
        );

        h.controller
            .handle_event(ServerEvent::MessageDelivered(DeliveryPayload {
                conversation_id,
                message_id: own.id,
            }))
            .await;
        assert_eq!(
            rx.borrow().messages[0].delivery_status,
            DeliveryStatus::Delivered
        );

        h.controller
            .handle_event(ServerEvent::MessagesSeen(SeenPayload {
                conversation_id,
                seen_by: peer,
            }))
            .await;
        assert_eq!(
            rx.borrow().messages[0].delivery_status,
            DeliveryStatus::Seen
        );

        // 已读之后的送达确认不产生回退
        h.controller
            .handle_event(ServerEvent::MessageDelivered(DeliveryPayload {
                conversation_id,
                message_id: own.id,
            }))
            .await;
        assert_eq!(
            rx.borrow().messages[0].delivery_status,
            DeliveryStatus::Seen
        );
    }

    #[tokio::test]
    async fn test_inbound_message_triggers_delivery_ack() {
        let h = harness();
        let conversation_id = ConversationId::from(Uuid::new_v4());
        let peer = UserId::from(Uuid::new_v4());
        let _rx = h.controller.join(conversation_id).await;

        let inbound = message_at(conversation_id, peer, "在吗", Utc::now());
        h.controller
            .handle_event(ServerEvent::ReceiveMessage(inbound.clone()))
            .await;

        let emitted = h.transport.emitted();
        assert!(emitted.iter().any(|e| matches!(
            e,
            ClientEvent::MessageDelivered { message_id, .. } if *message_id == inbound.id
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_indicator_expires_without_stop_event() {
        let h = harness();
        let conversation_id = ConversationId::from(Uuid::new_v4());
        let peer = UserId::from(Uuid::new_v4());
        let rx = h.controller.join(conversation_id).await;

        h.controller
            .handle_event(ServerEvent::UserTyping(TypingPayload {
                conversation_id,
                user_id: peer,
                is_typing: true,
            }))
            .await;
        assert_eq!(rx.borrow().typing, vec![peer]);

        // 静默窗口耗尽后自动清除
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(rx.borrow().typing.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_refresh_keeps_indicator_alive() {
        let h = harness();
        let conversation_id = ConversationId::from(Uuid::new_v4());
        let peer = UserId::from(Uuid::new_v4());
        let rx = h.controller.join(conversation_id).await;

        let typing = TypingPayload {
            conversation_id,
            user_id: peer,
            is_typing: true,
        };
        h.controller
            .handle_event(ServerEvent::UserTyping(typing.clone()))
            .await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        // 窗口内刷新，旧定时器失效
        h.controller
            .handle_event(ServerEvent::UserTyping(typing))
            .await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.borrow().typing, vec![peer]);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.borrow().typing.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_stop_clears_typing() {
        let h = harness();
        let conversation_id = ConversationId::from(Uuid::new_v4());
        let peer = UserId::from(Uuid::new_v4());
        let rx = h.controller.join(conversation_id).await;

        h.controller
            .handle_event(ServerEvent::UserTyping(TypingPayload {
                conversation_id,
                user_id: peer,
                is_typing: true,
            }))
            .await;
        h.controller
            .handle_event(ServerEvent::UserTyping(TypingPayload {
                conversation_id,
                user_id: peer,
                is_typing: false,
            }))
            .await;
        assert!(rx.borrow().typing.is_empty());
    }

    #[tokio::test]
    async fn test_send_requires_content_or_attachment() {
        let h = harness();
        let conversation_id = ConversationId::from(Uuid::new_v4());
        let result = h
            .controller
            .send_message(conversation_id, Some("   ".to_string()), None)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_text_send_goes_over_transport() {
        let h = harness();
        let conversation_id = ConversationId::from(Uuid::new_v4());
        h.controller
            .send_message(conversation_id, Some("你好".to_string()), None)
            .await
            .unwrap();

        let emitted = h.transport.emitted();
        assert!(emitted.iter().any(|e| matches!(
            e,
            ClientEvent::SendMessage { content, .. } if content == "你好"
        )));
        assert!(h.api.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn test_attachment_send_goes_over_api() {
        let h = harness();
        let conversation_id = ConversationId::from(Uuid::new_v4());
        let rx = h.controller.join(conversation_id).await;

        h.controller
            .send_message(
                conversation_id,
                None,
                Some(AttachmentUpload {
                    filename: "lease.pdf".to_string(),
                    mime_type: "application/pdf".to_string(),
                    bytes: vec![1, 2, 3],
                }),
            )
            .await
            .unwrap();

        assert_eq!(h.api.sent_messages().len(), 1);
        // 追加的是服务端确认后的消息
        assert_eq!(rx.borrow().messages.len(), 1);
        assert!(rx.borrow().messages[0].attachment.is_some());
    }

    #[tokio::test]
    async fn test_presence_tracks_conversation_participant() {
        let h = harness();
        let peer = UserId::from(Uuid::new_v4());
        let conversation_id = ConversationId::from(Uuid::new_v4());
        h.api
            .set_conversations(vec![Conversation::new(conversation_id, peer)]);
        h.controller.bootstrap().await;
        let rx = h.controller.join(conversation_id).await;

        h.controller
            .handle_event(ServerEvent::UserOnline(domain::PresencePayload {
                user_id: peer,
            }))
            .await;
        assert_eq!(rx.borrow().online, vec![peer]);

        h.controller
            .handle_event(ServerEvent::UserOffline(domain::PresencePayload {
                user_id: peer,
            }))
            .await;
        assert!(rx.borrow().online.is_empty());
    }

    #[tokio::test]
    async fn test_unread_counts_follow_focus() {
        let h = harness();
        let peer = UserId::from(Uuid::new_v4());
        let conversation_id = ConversationId::from(Uuid::new_v4());
        h.api
            .set_conversations(vec![Conversation::new(conversation_id, peer)]);
        h.controller.bootstrap().await;
        let conversations = h.controller.conversations();

        let inbound = message_at(conversation_id, peer, "有空吗", Utc::now());
        h.controller
            .handle_event(ServerEvent::ReceiveMessage(inbound))
            .await;
        assert_eq!(conversations.borrow()[0].unread_count, 1);

        h.controller.focus(conversation_id).await;
        assert_eq!(conversations.borrow()[0].unread_count, 0);
        // 焦点会话批量标记已读
        tokio::task::yield_now().await;
        assert!(h.api.seen_calls().contains(&conversation_id));
    }

    #[tokio::test]
    async fn test_leave_releases_session_state() {
        let h = harness();
        let conversation_id = ConversationId::from(Uuid::new_v4());
        let peer = UserId::from(Uuid::new_v4());
        let rx = h.controller.join(conversation_id).await;
        h.controller.leave(conversation_id).await;

        let inbound = message_at(conversation_id, peer, "离开后的消息", Utc::now());
        h.controller
            .handle_event(ServerEvent::ReceiveMessage(inbound))
            .await;
        // 已离开的会话不再接收消息流
        assert!(rx.borrow().messages.is_empty());
    }
}
