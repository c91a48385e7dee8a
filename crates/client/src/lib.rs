//! 实时层门面
//!
//! 把传输管理、重连监督、会话控制、资源同步、通知扇出
//! 与离线队列装配成一个客户端句柄，向 UI 层暴露响应式
//! 状态与命令式操作。

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use application::{
    ChatError, ChatSessionController, ChatSessionDependencies, LiveFeed, NotificationCenter,
    NotificationCenterDependencies, OfflineActionQueue, OfflineQueueDependencies, SessionCommand,
    SessionSnapshot, SystemClock, ToastEvent, ToastSeverity,
};
use config::RealtimeConfig;
use domain::{
    ActionId, ActionKind, ApiError, AttachmentUpload, CollaboratorApi, Connection, Conversation,
    ConversationId, EventName, NotificationId, QueueError, ResourceKind, Transport,
    TransportState, UserId,
};
use infrastructure::{HttpApiClient, JsonFileQueueStore, ReconnectSupervisor, WsConnectionManager};

pub use application::{
    NotificationSnapshot, ResourceSnapshot, SessionSnapshot as ChatSnapshot,
};
pub use infrastructure::ReconnectState;

/// 门面操作错误
#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    /// 断线时无法受理的操作（如离线上传附件）
    #[error("operation unavailable while disconnected: {0}")]
    Unavailable(String),
}

/// 写操作结果：在线完成，或断线期间已入队等待重放
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Completed,
    Queued(ActionId),
}

/// UI 呈现面出口：toast 流与会话级命令流
pub struct RealtimeSurfaces {
    pub toasts: mpsc::UnboundedReceiver<ToastEvent>,
    pub session_commands: mpsc::UnboundedReceiver<SessionCommand>,
}

/// 实时层客户端
///
/// 每个登录身份只创建一个实例；实例独占持有底层连接，
/// sign_out 之后整个句柄作废。
pub struct RealtimeClient {
    config: RealtimeConfig,
    identity: UserId,
    transport: Arc<WsConnectionManager>,
    api: Arc<HttpApiClient>,
    supervisor: ReconnectSupervisor,
    chat: ChatSessionController,
    notifications: NotificationCenter,
    resources: HashMap<ResourceKind, application::ResourceSyncEngine>,
    queue: OfflineActionQueue,
    live_feed: LiveFeed,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RealtimeClient {
    /// 登录后装配并启动实时层
    ///
    /// 首次连接失败不视为致命：重连监督器会按退避继续尝试，
    /// UI 通过状态观察端得知进展。
    pub async fn start(
        config: RealtimeConfig,
        identity: UserId,
    ) -> (Arc<Self>, RealtimeSurfaces) {
        let transport = Arc::new(WsConnectionManager::new(config.transport.clone()));
        let api = Arc::new(HttpApiClient::new(&config.api));
        let clock = Arc::new(SystemClock);
        let store = Arc::new(JsonFileQueueStore::new(config.queue.store_path.clone()));

        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let chat = ChatSessionController::new(ChatSessionDependencies {
            transport: transport.clone(),
            api: api.clone(),
            identity,
            config: config.chat,
            message_notices: notice_tx,
        });
        let (notifications, toasts, session_commands) =
            NotificationCenter::new(NotificationCenterDependencies {
                api: api.clone(),
                clock: clock.clone(),
                config: config.notifications,
            });
        let mut resources = HashMap::new();
        for kind in ResourceKind::ALL {
            resources.insert(
                kind,
                application::ResourceSyncEngine::new(kind, transport.clone()),
            );
        }
        let queue = OfflineActionQueue::new(OfflineQueueDependencies {
            store,
            api: api.clone(),
            clock,
        });
        let live_feed = LiveFeed::new();
        let supervisor = ReconnectSupervisor::new(transport.clone(), identity, config.reconnect);

        let client = Arc::new(Self {
            config: config.clone(),
            identity,
            transport,
            api,
            supervisor,
            chat,
            notifications,
            resources,
            queue,
            live_feed,
            tasks: Mutex::new(Vec::new()),
        });

        Self::spawn_pumps(&client, notice_rx).await;

        // 首次连接；失败交给监督器恢复
        if let Err(e) = client.transport.connect(identity).await {
            warn!("initial connect failed, supervisor takes over: {}", e);
        }
        {
            let mut tasks = client.tasks.lock().await;
            tasks.push(client.supervisor.start());
        }

        // 协作方 API 引导
        client.chat.bootstrap().await;
        client.notifications.bootstrap().await;
        if let Err(e) = client.queue.restore().await {
            warn!("offline queue restore failed: {}", e);
        }
        for engine in client.resources.values() {
            engine.refetch().await;
        }

        (client, RealtimeSurfaces {
            toasts,
            session_commands,
        })
    }

    /// 启动事件泵
    ///
    /// 各子系统消费互不相交的事件命名空间；泵本身走传输层的
    /// 全量有序流，保证同一会话内的事件按到达顺序应用。
    async fn spawn_pumps(client: &Arc<Self>, mut notice_rx: mpsc::UnboundedReceiver<domain::Message>) {
        let this = client;
        let mut tasks = this.tasks.lock().await;

        {
            let chat = this.chat.clone();
            let notifications = this.notifications.clone();
            let resources = this.resources.clone();
            let live_feed = this.live_feed.clone();
            let mut events = this.transport.events();
            tasks.push(tokio::spawn(async move {
                loop {
                    let event = match events.recv().await {
                        Ok(event) => event,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("event pump lagged, {} event(s) skipped", skipped);
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    };
                    match event.name() {
                        EventName::ReceiveMessage
                        | EventName::MessageDelivered
                        | EventName::MessagesSeen
                        | EventName::UserTyping
                        | EventName::UserOnline
                        | EventName::UserOffline => chat.handle_event(event).await,
                        EventName::NewNotification
                        | EventName::AdminWarning
                        | EventName::GlobalNotification
                        | EventName::ForceLogout => notifications.handle_event(event).await,
                        EventName::ResourceUpdate(kind)
                        | EventName::ResourceCreated(kind)
                        | EventName::ResourceDeleted(kind) => {
                            if let Some(engine) = resources.get(&kind) {
                                engine.handle_event(event).await;
                            }
                        }
                        EventName::LiveStats
                        | EventName::RealtimeActivity
                        | EventName::UserStatusUpdate => live_feed.handle_event(event).await,
                        // 连接生命周期事件由连接健康泵按状态处理
                        _ => {}
                    }
                }
            }));
        }

        // 非焦点会话来件 -> 本地合成通知
        {
            let notifications = this.notifications.clone();
            tasks.push(tokio::spawn(async move {
                while let Some(message) = notice_rx.recv().await {
                    notifications.notify_message(&message).await;
                }
            }));
        }

        // 连接健康泵：恢复后重放队列、重进会话、刷新资源；
        // 状态切换只提示一次，不随重试重复
        {
            let client = this.clone();
            let mut transport_state = this.transport.state();
            tasks.push(tokio::spawn(async move {
                let mut last = *transport_state.borrow();
                loop {
                    if transport_state.changed().await.is_err() {
                        break;
                    }
                    let current = *transport_state.borrow();
                    if current == last {
                        continue;
                    }
                    match (last, current) {
                        (_, TransportState::Connected) => {
                            info!("connection restored, replaying offline state");
                            client.on_reconnected().await;
                        }
                        // 只在活跃连接真正掉线时提示一次，
                        // 重试失败引起的 Connecting -> Disconnected 不重复提示
                        (TransportState::Connected, TransportState::Disconnected) => {
                            client.on_connection_lost().await;
                        }
                        _ => {}
                    }
                    last = current;
                }
            }));
        }

        // 重连耗尽的终态提示（一次性，不再重试）
        {
            let notifications = this.notifications.clone();
            let mut reconnect_state = this.supervisor.state();
            let toast_secs = this.config.notifications.toast_secs;
            tasks.push(tokio::spawn(async move {
                while reconnect_state.changed().await.is_ok() {
                    if *reconnect_state.borrow() == ReconnectState::Failed {
                        notifications.announce(ToastEvent {
                            severity: ToastSeverity::Error,
                            title: "连接已中断".to_string(),
                            message: "自动重连失败，请刷新页面".to_string(),
                            duration: std::time::Duration::from_secs(toast_secs),
                            blocking: true,
                        });
                        break;
                    }
                }
            }));
        }
    }

    async fn on_reconnected(&self) {
        match self.queue.drain().await {
            Ok(report) if report.replayed + report.skipped > 0 => {
                info!(
                    "offline queue drained: {} replayed, {} skipped",
                    report.replayed, report.skipped
                );
            }
            Ok(_) => {}
            Err(e) => warn!("offline queue drain failed: {}", e),
        }
        self.chat.rejoin_all().await;
        for engine in self.resources.values() {
            engine.refetch().await;
        }
    }

    async fn on_connection_lost(&self) {
        self.notifications.announce(ToastEvent {
            severity: ToastSeverity::Warning,
            title: "连接已断开".to_string(),
            message: "正在尝试恢复实时连接".to_string(),
            duration: std::time::Duration::from_secs(self.config.notifications.toast_secs),
            blocking: false,
        });
        for engine in self.resources.values() {
            engine
                .record_transport_error(&domain::TransportError::Closed(
                    "connection lost".to_string(),
                ))
                .await;
        }
    }

    /// 当前身份
    pub fn identity(&self) -> UserId {
        self.identity
    }

    /// 连接状态观察端
    pub fn transport_state(&self) -> watch::Receiver<TransportState> {
        self.transport.state()
    }

    /// 重连状态观察端
    pub fn reconnect_state(&self) -> watch::Receiver<ReconnectState> {
        self.supervisor.state()
    }

    /// 连接实体快照
    pub async fn connection(&self) -> Option<Connection> {
        self.transport.connection().await
    }

    /// 会话列表观察端
    pub fn conversations(&self) -> watch::Receiver<Vec<Conversation>> {
        self.chat.conversations()
    }

    /// 加入会话并获得其快照流
    pub async fn join_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> watch::Receiver<SessionSnapshot> {
        self.chat.join(conversation_id).await
    }

    /// 离开会话
    pub async fn leave_conversation(&self, conversation_id: ConversationId) {
        self.chat.leave(conversation_id).await
    }

    /// 会话获得焦点（打开聊天窗口）
    pub async fn focus_conversation(&self, conversation_id: ConversationId) {
        self.chat.focus(conversation_id).await
    }

    /// 输入框空/非空切换
    pub async fn notify_typing(&self, conversation_id: ConversationId, has_text: bool) {
        self.chat.notify_typing(conversation_id, has_text).await
    }

    /// 发送消息；断线时文本消息转入离线队列
    pub async fn send_message(
        &self,
        conversation_id: ConversationId,
        content: Option<String>,
        attachment: Option<AttachmentUpload>,
    ) -> Result<WriteOutcome, RealtimeError> {
        let content = content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if content.is_none() && attachment.is_none() {
            return Err(RealtimeError::Chat(ChatError::Domain(
                domain::DomainError::validation_error("message", "文本与附件至少填写其一"),
            )));
        }
        if self.transport.is_connected() {
            self.chat
                .send_message(conversation_id, content, attachment)
                .await?;
            return Ok(WriteOutcome::Completed);
        }
        if attachment.is_some() {
            // 二进制附件不入持久化队列
            return Err(RealtimeError::Unavailable(
                "attachment upload requires a live connection".to_string(),
            ));
        }
        let outcome = self
            .queue
            .enqueue(
                ActionKind::SendMessage,
                json!({ "conversationId": conversation_id, "content": content }),
            )
            .await?;
        let application::EnqueueOutcome::Pending(id) = outcome;
        Ok(WriteOutcome::Queued(id))
    }

    /// 保存房源；断线时入队
    pub async fn save_listing(&self, payload: JsonValue) -> Result<WriteOutcome, RealtimeError> {
        self.write_or_queue(ActionKind::SaveListing, payload).await
    }

    /// 创建预订；断线时入队
    pub async fn create_booking(&self, payload: JsonValue) -> Result<WriteOutcome, RealtimeError> {
        self.write_or_queue(ActionKind::CreateBooking, payload).await
    }

    /// 提交评价；断线时入队
    pub async fn submit_review(&self, payload: JsonValue) -> Result<WriteOutcome, RealtimeError> {
        self.write_or_queue(ActionKind::SubmitReview, payload).await
    }

    async fn write_or_queue(
        &self,
        kind: ActionKind,
        payload: JsonValue,
    ) -> Result<WriteOutcome, RealtimeError> {
        if self.transport.is_connected() {
            match kind {
                ActionKind::SaveListing => self.api.save_listing(payload).await?,
                ActionKind::CreateBooking => self.api.create_booking(payload).await?,
                ActionKind::SubmitReview => self.api.submit_review(payload).await?,
                ActionKind::SendMessage => {
                    // 消息走 send_message 入口
                    return Err(RealtimeError::Unavailable(
                        "use send_message for chat writes".to_string(),
                    ));
                }
            }
            return Ok(WriteOutcome::Completed);
        }
        let application::EnqueueOutcome::Pending(id) =
            self.queue.enqueue(kind, payload).await?;
        Ok(WriteOutcome::Queued(id))
    }

    /// 通知账本观察端
    pub fn notifications(&self) -> watch::Receiver<NotificationSnapshot> {
        self.notifications.snapshot()
    }

    /// 标记单条通知已读
    pub async fn mark_read(&self, id: NotificationId) {
        self.notifications.mark_read(id).await
    }

    /// 标记全部通知已读
    pub async fn mark_all_read(&self) {
        self.notifications.mark_all_read().await
    }

    /// 指定资源类型的集合观察端
    pub fn resource(&self, kind: ResourceKind) -> Option<watch::Receiver<ResourceSnapshot>> {
        self.resources.get(&kind).map(|engine| engine.snapshot())
    }

    /// 主动刷新指定资源类型
    pub async fn refetch(&self, kind: ResourceKind) {
        if let Some(engine) = self.resources.get(&kind) {
            engine.refetch().await;
        }
    }

    /// 指定资源的本地乐观操作入口
    pub fn resource_engine(&self, kind: ResourceKind) -> Option<&application::ResourceSyncEngine> {
        self.resources.get(&kind)
    }

    /// 仪表盘实时流
    pub fn live_feed(&self) -> &LiveFeed {
        &self.live_feed
    }

    /// 等待重放的离线动作数
    pub fn pending_actions(&self) -> watch::Receiver<usize> {
        self.queue.pending()
    }

    /// 登出：取消重连、断开连接、停掉全部事件泵
    ///
    /// 先关停监督器再断开，保证不会有迟到的重试。
    pub async fn sign_out(&self) {
        self.supervisor.shutdown();
        self.transport.disconnect().await;
        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            task.abort();
        }
        info!("realtime client signed out");
    }
}
