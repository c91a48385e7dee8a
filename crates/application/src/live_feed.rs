//! 仪表盘实时流
//!
//! 管理端仪表盘消费的三类推送：统计快照、活动流与用户状态。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::debug;

use domain::{ActivityPayload, LiveStatsPayload, ServerEvent, UserId};

/// 活动流保留的条数上限
const MAX_ACTIVITY_ENTRIES: usize = 20;

/// 仪表盘实时流
#[derive(Clone)]
pub struct LiveFeed {
    stats_tx: Arc<watch::Sender<Option<LiveStatsPayload>>>,
    activity: Arc<RwLock<Vec<ActivityPayload>>>,
    activity_tx: Arc<watch::Sender<Vec<ActivityPayload>>>,
    statuses: Arc<RwLock<HashMap<UserId, bool>>>,
    statuses_tx: Arc<watch::Sender<HashMap<UserId, bool>>>,
}

impl LiveFeed {
    pub fn new() -> Self {
        let (stats_tx, _) = watch::channel(None);
        let (activity_tx, _) = watch::channel(Vec::new());
        let (statuses_tx, _) = watch::channel(HashMap::new());
        Self {
            stats_tx: Arc::new(stats_tx),
            activity: Arc::new(RwLock::new(Vec::new())),
            activity_tx: Arc::new(activity_tx),
            statuses: Arc::new(RwLock::new(HashMap::new())),
            statuses_tx: Arc::new(statuses_tx),
        }
    }

    /// 最近一份统计快照
    pub fn stats(&self) -> watch::Receiver<Option<LiveStatsPayload>> {
        self.stats_tx.subscribe()
    }

    /// 最近的活动条目（最新在前）
    pub fn activity(&self) -> watch::Receiver<Vec<ActivityPayload>> {
        self.activity_tx.subscribe()
    }

    /// 用户在线状态表
    pub fn statuses(&self) -> watch::Receiver<HashMap<UserId, bool>> {
        self.statuses_tx.subscribe()
    }

    /// 处理仪表盘命名空间内的服务端事件
    pub async fn handle_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::LiveStats(stats) => {
                self.stats_tx.send_replace(Some(stats));
            }
            ServerEvent::RealtimeActivity(entry) => {
                let mut activity = self.activity.write().await;
                activity.insert(0, entry);
                activity.truncate(MAX_ACTIVITY_ENTRIES);
                self.activity_tx.send_replace(activity.clone());
            }
            ServerEvent::UserStatusUpdate(payload) => {
                let mut statuses = self.statuses.write().await;
                statuses.insert(payload.user_id, payload.online);
                self.statuses_tx.send_replace(statuses.clone());
            }
            other => debug!("live feed ignoring {}", other.name()),
        }
    }
}

impl Default for LiveFeed {
    fn default() -> Self {
        Self::new()
    }
}
