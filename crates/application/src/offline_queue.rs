//! 离线动作队列
//!
//! 断线期间的用户写操作全部进入持久化 FIFO 队列，
//! 恢复连接后按入队顺序经由协作方写 API 重放。

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use domain::{
    ActionId, ActionKind, ApiError, CollaboratorApi, ConversationId, NewMessage, QueueError,
    QueueStore, QueuedAction,
};

use crate::clock::Clock;

/// 入队结果：动作处于等待重放状态，而不是失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Pending(ActionId),
}

/// 一轮重放的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// 成功重放的动作数
    pub replayed: usize,
    /// 失败被跳过的动作数
    pub skipped: usize,
}

/// 离线动作队列依赖
pub struct OfflineQueueDependencies {
    pub store: Arc<dyn QueueStore>,
    pub api: Arc<dyn CollaboratorApi>,
    pub clock: Arc<dyn Clock>,
}

/// 离线动作队列
#[derive(Clone)]
pub struct OfflineActionQueue {
    store: Arc<dyn QueueStore>,
    api: Arc<dyn CollaboratorApi>,
    clock: Arc<dyn Clock>,
    /// 入队与重放互斥；同一时刻最多一轮重放在进行
    drain_lock: Arc<Mutex<()>>,
    pending_tx: Arc<watch::Sender<usize>>,
}

impl OfflineActionQueue {
    /// 创建离线队列
    pub fn new(deps: OfflineQueueDependencies) -> Self {
        let (pending_tx, _) = watch::channel(0);
        Self {
            store: deps.store,
            api: deps.api,
            clock: deps.clock,
            drain_lock: Arc::new(Mutex::new(())),
            pending_tx: Arc::new(pending_tx),
        }
    }

    /// 等待重放的动作数观察端
    pub fn pending(&self) -> watch::Receiver<usize> {
        self.pending_tx.subscribe()
    }

    /// 启动时从持久化存储恢复计数（队列跨重启保留）
    pub async fn restore(&self) -> Result<usize, QueueError> {
        let actions = self.store.load().await?;
        self.pending_tx.send_replace(actions.len());
        Ok(actions.len())
    }

    /// 断线期间捕获一个写操作
    ///
    /// 与重放持同一把锁，入队永远不会夹在一轮重放中间。
    pub async fn enqueue(
        &self,
        kind: ActionKind,
        payload: JsonValue,
    ) -> Result<EnqueueOutcome, QueueError> {
        let _guard = self.drain_lock.lock().await;
        let action = QueuedAction::new(
            ActionId::from(Uuid::new_v4()),
            kind,
            payload,
            self.clock.now(),
        );
        self.store.append(&action).await?;
        let count = self.store.load().await?.len();
        self.pending_tx.send_replace(count);
        info!("queued offline action {} ({})", action.id, action.kind);
        Ok(EnqueueOutcome::Pending(action.id))
    }

    /// 恢复连接后重放整个队列
    ///
    /// 严格按入队顺序派发；单个失败只记录并跳过，不阻塞后续。
    /// 一轮结束后无条件清空队列。
    pub async fn drain(&self) -> Result<DrainReport, QueueError> {
        let _guard = self.drain_lock.lock().await;
        let actions = self.store.load().await?;
        if actions.is_empty() {
            return Ok(DrainReport::default());
        }
        info!("draining {} offline action(s)", actions.len());

        let mut report = DrainReport::default();
        for action in actions {
            match self.dispatch(&action).await {
                Ok(()) => report.replayed += 1,
                Err(e) => {
                    warn!("offline action {} ({}) skipped: {}", action.id, action.kind, e);
                    report.skipped += 1;
                }
            }
        }

        self.store.clear().await?;
        self.pending_tx.send_replace(0);
        Ok(report)
    }

    /// 把动作派发到在线时使用的同一写 API
    async fn dispatch(&self, action: &QueuedAction) -> Result<(), ApiError> {
        match action.kind {
            ActionKind::SaveListing => self.api.save_listing(action.payload.clone()).await,
            ActionKind::CreateBooking => self.api.create_booking(action.payload.clone()).await,
            ActionKind::SubmitReview => self.api.submit_review(action.payload.clone()).await,
            ActionKind::SendMessage => {
                let conversation_id = action
                    .payload
                    .get("conversationId")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse::<Uuid>().ok())
                    .map(ConversationId::from)
                    .ok_or_else(|| ApiError::Decode("missing conversationId".to_string()))?;
                let content = action
                    .payload
                    .get("content")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                self.api
                    .send_message(NewMessage {
                        conversation_id,
                        content,
                        attachment: None,
                    })
                    .await
                    .map(|_| ())
            }
        }
    }
}
