//! 通知扇出层
//!
//! 接收服务端推送的异类事件，按优先级分类，维护未读账本，
//! 并驱动 toast、铃铛与强制下线三个呈现面。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, RwLock};
use tracing::{info, warn};

use config::NotificationConfig;
use domain::{
    CollaboratorApi, Message, Notification, NotificationId, NotificationKind,
    NotificationPriority, ServerEvent,
};

use crate::clock::Clock;

/// toast 严重级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastSeverity {
    Info,
    Warning,
    Error,
}

/// toast 事件
#[derive(Debug, Clone, PartialEq)]
pub struct ToastEvent {
    pub severity: ToastSeverity,
    pub title: String,
    pub message: String,
    /// 展示时长；阻塞型 toast 由呈现层决定驻留
    pub duration: Duration,
    pub blocking: bool,
}

/// 会话级命令（强制下线）
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// 跳转到未登录入口，使所有在途状态失效
    RedirectToEntry { reason: String },
}

/// 通知账本快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationSnapshot {
    /// UI 展示的最近 N 条
    pub visible: Vec<Notification>,
    /// 未读数，恒等于账本中 is_read = false 的条数
    pub unread_count: usize,
    /// 账本总条数
    pub total: usize,
}

/// 通知扇出层依赖
pub struct NotificationCenterDependencies {
    pub api: Arc<dyn CollaboratorApi>,
    pub clock: Arc<dyn Clock>,
    pub config: NotificationConfig,
}

/// 通知扇出层
#[derive(Clone)]
pub struct NotificationCenter {
    api: Arc<dyn CollaboratorApi>,
    clock: Arc<dyn Clock>,
    config: NotificationConfig,
    /// 账本按最近优先排列，只增不删
    ledger: Arc<RwLock<Vec<Notification>>>,
    snapshot_tx: Arc<watch::Sender<NotificationSnapshot>>,
    toast_tx: mpsc::UnboundedSender<ToastEvent>,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
}

impl NotificationCenter {
    /// 创建通知扇出层，返回 toast 与会话命令两个呈现面出口
    pub fn new(
        deps: NotificationCenterDependencies,
    ) -> (
        Self,
        mpsc::UnboundedReceiver<ToastEvent>,
        mpsc::UnboundedReceiver<SessionCommand>,
    ) {
        let (snapshot_tx, _) = watch::channel(NotificationSnapshot::default());
        let (toast_tx, toast_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        (
            Self {
                api: deps.api,
                clock: deps.clock,
                config: deps.config,
                ledger: Arc::new(RwLock::new(Vec::new())),
                snapshot_tx: Arc::new(snapshot_tx),
                toast_tx,
                command_tx,
            },
            toast_rx,
            command_rx,
        )
    }

    /// 账本快照观察端
    pub fn snapshot(&self) -> watch::Receiver<NotificationSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// 登录后从协作方 API 拉取通知历史
    pub async fn bootstrap(&self) {
        match self.api.fetch_notifications().await {
            Ok(mut history) => {
                history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                let mut ledger = self.ledger.write().await;
                *ledger = history;
                self.publish(&ledger);
            }
            Err(e) => warn!("notification bootstrap failed: {}", e),
        }
    }

    /// 处理通知命名空间内的服务端事件
    pub async fn handle_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::NewNotification(push) | ServerEvent::GlobalNotification(push) => {
                let notification = push.into_notification(self.clock.now());
                self.append(notification).await;
            }
            ServerEvent::AdminWarning(payload) => {
                // 管理员警告无条件按紧急处理，忽略负载上的优先级
                let notification = Notification::new(
                    NotificationId::from(uuid::Uuid::new_v4()),
                    NotificationKind::Warning,
                    payload.title.unwrap_or_else(|| "管理员警告".to_string()),
                    payload.message,
                    NotificationPriority::Urgent,
                    self.clock.now(),
                );
                self.append(notification).await;
            }
            ServerEvent::ForceLogout(payload) => {
                // 不进账本：终态 toast，宽限期后跳转登录入口
                info!("force logout pushed: {}", payload.reason);
                self.send_toast(ToastEvent {
                    severity: ToastSeverity::Error,
                    title: "账号已被下线".to_string(),
                    message: payload.reason.clone(),
                    duration: Duration::from_secs(self.config.toast_secs),
                    blocking: true,
                });
                let command_tx = self.command_tx.clone();
                let grace = Duration::from_secs(self.config.logout_grace_secs);
                tokio::spawn(async move {
                    tokio::time::sleep(grace).await;
                    let _ = command_tx.send(SessionCommand::RedirectToEntry {
                        reason: payload.reason,
                    });
                });
            }
            other => tracing::debug!("notification center ignoring {}", other.name()),
        }
    }

    /// 由聊天消息本地合成一条通知（非焦点会话的来件）
    pub async fn notify_message(&self, message: &Message) {
        let mut notification = Notification::new(
            NotificationId::from(uuid::Uuid::new_v4()),
            NotificationKind::Message,
            "新消息".to_string(),
            message.summary(),
            NotificationPriority::Medium,
            self.clock.now(),
        );
        notification.source = Some(message.sender_id);
        self.append(notification).await;
    }

    /// 标记单条通知已读：本地乐观更新，写失败只记录不回滚
    pub async fn mark_read(&self, id: NotificationId) {
        {
            let mut ledger = self.ledger.write().await;
            if let Some(notification) = ledger.iter_mut().find(|n| n.id == id) {
                if notification.is_read {
                    return;
                }
                notification.mark_as_read();
            } else {
                return;
            }
            self.publish(&ledger);
        }
        let api = self.api.clone();
        tokio::spawn(async move {
            if let Err(e) = api.mark_notification_read(id).await {
                warn!("mark read failed for {}: {}", id, e);
            }
        });
    }

    /// 标记全部已读：未读数清零
    pub async fn mark_all_read(&self) {
        {
            let mut ledger = self.ledger.write().await;
            for notification in ledger.iter_mut() {
                notification.mark_as_read();
            }
            self.publish(&ledger);
        }
        let api = self.api.clone();
        tokio::spawn(async move {
            if let Err(e) = api.mark_all_notifications_read().await {
                warn!("mark all read failed: {}", e);
            }
        });
    }

    /// 直接向 toast 面发布一条提示（不进账本）
    ///
    /// 连接健康提示等门面级消息使用。
    pub fn announce(&self, toast: ToastEvent) {
        self.send_toast(toast);
    }

    async fn append(&self, notification: Notification) {
        let toast = ToastEvent {
            severity: match notification.priority {
                NotificationPriority::Urgent => ToastSeverity::Error,
                NotificationPriority::High => ToastSeverity::Warning,
                _ => ToastSeverity::Info,
            },
            title: notification.title.clone(),
            message: notification.message.clone(),
            duration: Duration::from_secs(self.config.toast_secs),
            blocking: notification.priority == NotificationPriority::Urgent,
        };
        {
            let mut ledger = self.ledger.write().await;
            ledger.insert(0, notification);
            self.publish(&ledger);
        }
        self.send_toast(toast);
    }

    fn send_toast(&self, toast: ToastEvent) {
        if self.toast_tx.send(toast).is_err() {
            tracing::debug!("toast surface detached");
        }
    }

    /// 未读数永远由账本推导，不单独维护计数器
    fn publish(&self, ledger: &[Notification]) {
        self.snapshot_tx.send_replace(NotificationSnapshot {
            visible: ledger
                .iter()
                .take(self.config.display_cap)
                .cloned()
                .collect(),
            unread_count: ledger.iter().filter(|n| !n.is_read).count(),
            total: ledger.len(),
        });
    }
}
