//! WebSocket 传输连接管理器
//!
//! 持有每个登录身份唯一的持久连接：建立/断开、身份宣告、
//! 按事件名订阅与原始事件分发。重复 connect 会先拆除旧连接。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use config::TransportConfig;
use domain::{
    ClientEvent, Connection, EventName, ServerEvent, Transport, TransportError, TransportState,
    UserId, WireFrame,
};

/// 活跃连接内部句柄
struct ActiveConnection {
    writer_tx: mpsc::UnboundedSender<WsMessage>,
    reader_task: tokio::task::JoinHandle<()>,
}

/// WebSocket 连接管理器
pub struct WsConnectionManager {
    config: TransportConfig,
    /// 连接代次，旧连接的读任务据此避免覆盖新连接的状态
    generation: Arc<AtomicU64>,
    /// 连接实体，独占持有
    connection: Arc<RwLock<Option<Connection>>>,
    active: Arc<RwLock<Option<ActiveConnection>>>,
    /// 按事件名的订阅表
    registry: Arc<RwLock<HashMap<EventName, mpsc::UnboundedSender<ServerEvent>>>>,
    state_tx: Arc<watch::Sender<TransportState>>,
    /// 全量事件流（事件泵使用）
    events_tx: broadcast::Sender<ServerEvent>,
}

impl WsConnectionManager {
    /// 创建连接管理器（尚未连接）
    pub fn new(config: TransportConfig) -> Self {
        let (state_tx, _) = watch::channel(TransportState::Disconnected);
        let (events_tx, _) = broadcast::channel(1024);
        Self {
            config,
            generation: Arc::new(AtomicU64::new(0)),
            connection: Arc::new(RwLock::new(None)),
            active: Arc::new(RwLock::new(None)),
            registry: Arc::new(RwLock::new(HashMap::new())),
            state_tx: Arc::new(state_tx),
            events_tx,
        }
    }

    /// 当前连接实体快照
    pub async fn connection(&self) -> Option<Connection> {
        self.connection.read().await.clone()
    }

    /// 全量事件流订阅（不区分事件名）
    pub fn events(&self) -> broadcast::Receiver<ServerEvent> {
        self.events_tx.subscribe()
    }

    /// 向订阅方分发一个事件
    async fn dispatch(
        registry: &RwLock<HashMap<EventName, mpsc::UnboundedSender<ServerEvent>>>,
        events_tx: &broadcast::Sender<ServerEvent>,
        event: ServerEvent,
    ) {
        let name = event.name();
        if let Some(sender) = registry.read().await.get(&name) {
            if sender.send(event.clone()).is_err() {
                debug!("subscriber for {} dropped", name);
            }
        }
        let _ = events_tx.send(event);
    }

    /// 拆除当前活跃连接（如存在）
    async fn teardown(&self) {
        // 代次先行推进，旧读任务不再触碰状态
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(active) = self.active.write().await.take() {
            active.reader_task.abort();
            info!("previous transport connection torn down");
        }
    }
}

#[async_trait]
impl Transport for WsConnectionManager {
    /// 建立（或重建）连接并宣告身份
    async fn connect(&self, identity: UserId) -> Result<(), TransportError> {
        self.teardown().await;
        {
            let mut connection = self.connection.write().await;
            match connection.as_mut() {
                Some(existing) if existing.identity == identity => existing.mark_connecting(),
                _ => *connection = Some(Connection::new(identity)),
            }
        }
        self.state_tx.send_replace(TransportState::Connecting);

        let (ws_stream, _response) =
            match tokio_tungstenite::connect_async(self.config.url.as_str()).await {
                Ok(pair) => pair,
                Err(e) => {
                    let description = e.to_string();
                    if let Some(connection) = self.connection.write().await.as_mut() {
                        connection.record_retry();
                        connection.mark_disconnected();
                    }
                    self.state_tx.send_replace(TransportState::Disconnected);
                    Self::dispatch(
                        &self.registry,
                        &self.events_tx,
                        ServerEvent::ConnectError {
                            description: description.clone(),
                        },
                    )
                    .await;
                    return Err(TransportError::ConnectFailed(description));
                }
            };

        let (mut sink, mut stream) = ws_stream.split();

        // 身份宣告握手，服务端据此路由推送
        let join_frame = WireFrame::from_client(&ClientEvent::Join { user_id: identity })
            .encode()
            .map_err(|e| TransportError::Codec(e.to_string()))?;
        if let Err(e) = sink.send(WsMessage::Text(join_frame.into())).await {
            if let Some(connection) = self.connection.write().await.as_mut() {
                connection.record_retry();
                connection.mark_disconnected();
            }
            self.state_tx.send_replace(TransportState::Disconnected);
            return Err(TransportError::ConnectFailed(e.to_string()));
        }

        // 写任务：序列化后的帧经通道交给 sink
        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<WsMessage>();
        tokio::spawn(async move {
            while let Some(frame) = writer_rx.recv().await {
                if let Err(e) = sink.send(frame).await {
                    warn!("transport write failed: {}", e);
                    break;
                }
            }
        });

        // 读任务：解码帧并分发给订阅方
        let my_generation = self.generation.load(Ordering::SeqCst);
        let generation = self.generation.clone();
        let registry = self.registry.clone();
        let events_tx = self.events_tx.clone();
        let state_tx = self.state_tx.clone();
        let connection_slot = self.connection.clone();
        let active_slot = self.active.clone();
        let reader_task = tokio::spawn(async move {
            let reason = loop {
                match stream.next().await {
                    Some(Ok(WsMessage::Text(text))) => {
                        match WireFrame::decode(&text).and_then(WireFrame::into_server_event) {
                            Ok(Some(event)) => {
                                Self::dispatch(&registry, &events_tx, event).await;
                            }
                            Ok(None) => debug!("unknown event dropped: {}", text),
                            Err(e) => warn!("frame decode failed: {}", e),
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) => break Some("closed by server".to_string()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Some(e.to_string()),
                    None => break None,
                }
            };
            // 仅当仍是当前代次时才宣布断线
            if generation.load(Ordering::SeqCst) == my_generation {
                info!("transport connection dropped: {:?}", reason);
                // 释放写端，后续 emit 直接报 NotConnected
                drop(active_slot.write().await.take());
                if let Some(connection) = connection_slot.write().await.as_mut() {
                    connection.mark_disconnected();
                }
                state_tx.send_replace(TransportState::Disconnected);
                Self::dispatch(&registry, &events_tx, ServerEvent::Disconnect { reason }).await;
            }
        });

        *self.active.write().await = Some(ActiveConnection {
            writer_tx,
            reader_task,
        });
        if let Some(connection) = self.connection.write().await.as_mut() {
            connection.mark_connected();
        }
        self.state_tx.send_replace(TransportState::Connected);
        Self::dispatch(&self.registry, &self.events_tx, ServerEvent::Connect).await;
        info!("transport connected as {}", identity);
        Ok(())
    }

    /// 主动断开：拆除连接并清空订阅
    async fn disconnect(&self) {
        self.teardown().await;
        self.registry.write().await.clear();
        if let Some(connection) = self.connection.write().await.as_mut() {
            connection.mark_disconnected();
        }
        self.state_tx.send_replace(TransportState::Disconnected);
        info!("transport disconnected");
    }

    fn is_connected(&self) -> bool {
        *self.state_tx.borrow() == TransportState::Connected
    }

    /// 发送客户端事件；没有活跃连接时报 NotConnected
    async fn emit(&self, event: ClientEvent) -> Result<(), TransportError> {
        let active = self.active.read().await;
        let Some(active) = active.as_ref() else {
            return Err(TransportError::NotConnected);
        };
        let frame = WireFrame::from_client(&event)
            .encode()
            .map_err(|e| TransportError::Codec(e.to_string()))?;
        active
            .writer_tx
            .send(WsMessage::Text(frame.into()))
            .map_err(|e| TransportError::Closed(e.to_string()))
    }

    async fn subscribe(&self, event: EventName) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.write().await.insert(event, tx);
        rx
    }

    async fn unsubscribe(&self, event: EventName) {
        self.registry.write().await.remove(&event);
    }

    fn state(&self) -> watch::Receiver<TransportState> {
        self.state_tx.subscribe()
    }
}
