//! 资源同步引擎
//!
//! 为指定资源类型维护一份实时有序集合：全量替换、单项更新、
//! 新建前插与按标识删除，外加乐观 UI 用的本地操作。

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::{watch, RwLock};
use tracing::debug;

use domain::{ClientEvent, ResourceKind, ServerEvent, Transport, TransportError};

/// 资源集合快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSnapshot {
    /// 当前集合
    pub items: Vec<JsonValue>,
    /// 是否在等待快照
    pub loading: bool,
    /// 最近一次传输层错误；断线期间集合保持原样（陈旧但可用）
    pub error: Option<String>,
}

/// 从资源负载中提取标识
fn item_id(item: &JsonValue) -> Option<String> {
    for key in ["id", "_id"] {
        match item.get(key) {
            Some(JsonValue::String(s)) => return Some(s.clone()),
            Some(JsonValue::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// 资源同步引擎，每种资源类型一个实例
#[derive(Clone)]
pub struct ResourceSyncEngine {
    kind: ResourceKind,
    transport: Arc<dyn Transport>,
    state: Arc<RwLock<ResourceSnapshot>>,
    snapshot_tx: Arc<watch::Sender<ResourceSnapshot>>,
}

impl ResourceSyncEngine {
    /// 创建引擎，初始处于 loading 状态直到第一份快照到达
    pub fn new(kind: ResourceKind, transport: Arc<dyn Transport>) -> Self {
        let initial = ResourceSnapshot {
            items: Vec::new(),
            loading: true,
            error: None,
        };
        let (snapshot_tx, _) = watch::channel(initial.clone());
        Self {
            kind,
            transport,
            state: Arc::new(RwLock::new(initial)),
            snapshot_tx: Arc::new(snapshot_tx),
        }
    }

    /// 资源类型
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// 集合快照观察端
    pub fn snapshot(&self) -> watch::Receiver<ResourceSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// 通过持久连接请求一份全量快照
    pub async fn refetch(&self) {
        {
            let mut state = self.state.write().await;
            state.loading = true;
            self.snapshot_tx.send_replace(state.clone());
        }
        if let Err(e) = self
            .transport
            .emit(ClientEvent::RequestSnapshot { kind: self.kind })
            .await
        {
            self.record_transport_error(&e).await;
        }
    }

    /// 传输层故障：记录错误但保留集合
    pub async fn record_transport_error(&self, error: &TransportError) {
        let mut state = self.state.write().await;
        state.loading = false;
        state.error = Some(error.to_string());
        self.snapshot_tx.send_replace(state.clone());
    }

    /// 处理本资源类型命名空间内的服务端事件
    pub async fn handle_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::ResourceUpdate { kind, payload } if kind == self.kind => {
                match payload {
                    // 数组负载：全量替换
                    JsonValue::Array(items) => {
                        let mut state = self.state.write().await;
                        state.items = items;
                        state.loading = false;
                        state.error = None;
                        self.snapshot_tx.send_replace(state.clone());
                    }
                    // 对象负载：按标识更新已有条目，未知条目忽略（不是插入路径）
                    JsonValue::Object(_) => {
                        let Some(id) = item_id(&payload) else {
                            debug!("{} update without id dropped", self.kind);
                            return;
                        };
                        let mut state = self.state.write().await;
                        if let Some(existing) = state
                            .items
                            .iter_mut()
                            .find(|item| item_id(item).as_deref() == Some(id.as_str()))
                        {
                            *existing = payload;
                            self.snapshot_tx.send_replace(state.clone());
                        }
                    }
                    other => debug!("{} update with unsupported payload: {}", self.kind, other),
                }
            }
            ServerEvent::ResourceCreated { kind, item } if kind == self.kind => {
                let mut state = self.state.write().await;
                state.items.insert(0, item);
                state.loading = false;
                self.snapshot_tx.send_replace(state.clone());
            }
            ServerEvent::ResourceDeleted { kind, id } if kind == self.kind => {
                let mut state = self.state.write().await;
                state
                    .items
                    .retain(|item| item_id(item).as_deref() != Some(id.as_str()));
                self.snapshot_tx.send_replace(state.clone());
            }
            other => debug!("{} engine ignoring {}", self.kind, other.name()),
        }
    }

    /// 本地前插（乐观 UI，等待服务端确认前）
    pub async fn add_item(&self, item: JsonValue) {
        let mut state = self.state.write().await;
        state.items.insert(0, item);
        self.snapshot_tx.send_replace(state.clone());
    }

    /// 本地按标识替换；找不到时不做任何事
    pub async fn update_item(&self, item: JsonValue) {
        let Some(id) = item_id(&item) else {
            return;
        };
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .items
            .iter_mut()
            .find(|existing| item_id(existing).as_deref() == Some(id.as_str()))
        {
            *existing = item;
            self.snapshot_tx.send_replace(state.clone());
        }
    }

    /// 本地按标识删除
    pub async fn remove_item(&self, id: &str) {
        let mut state = self.state.write().await;
        state.items.retain(|item| item_id(item).as_deref() != Some(id));
        self.snapshot_tx.send_replace(state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTransport;
    use serde_json::json;

    fn engine() -> (ResourceSyncEngine, Arc<FakeTransport>) {
        let transport = Arc::new(FakeTransport::new());
        (
            ResourceSyncEngine::new(ResourceKind::Listing, transport.clone()),
            transport,
        )
    }

    #[tokio::test]
    async fn test_full_replace_clears_loading() {
        let (engine, _) = engine();
        let rx = engine.snapshot();
        assert!(rx.borrow().loading);

        engine
            .handle_event(ServerEvent::ResourceUpdate {
                kind: ResourceKind::Listing,
                payload: json!([{ "id": "1", "title": "两居室" }, { "id": "2", "title": "一居室" }]),
            })
            .await;

        let snapshot = rx.borrow().clone();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.items.len(), 2);
    }

    #[tokio::test]
    async fn test_item_upsert_only_updates_existing() {
        let (engine, _) = engine();
        let rx = engine.snapshot();
        engine
            .handle_event(ServerEvent::ResourceUpdate {
                kind: ResourceKind::Listing,
                payload: json!([{ "id": "1", "title": "旧标题" }]),
            })
            .await;

        engine
            .handle_event(ServerEvent::ResourceUpdate {
                kind: ResourceKind::Listing,
                payload: json!({ "id": "1", "title": "新标题" }),
            })
            .await;
        assert_eq!(rx.borrow().items[0]["title"], "新标题");

        // 未知条目的单项更新被忽略，而不是插入
        engine
            .handle_event(ServerEvent::ResourceUpdate {
                kind: ResourceKind::Listing,
                payload: json!({ "id": "99", "title": "幽灵房源" }),
            })
            .await;
        assert_eq!(rx.borrow().items.len(), 1);
    }

    #[tokio::test]
    async fn test_created_always_prepends_and_delete_removes() {
        let (engine, _) = engine();
        let rx = engine.snapshot();
        engine
            .handle_event(ServerEvent::ResourceUpdate {
                kind: ResourceKind::Listing,
                payload: json!([{ "id": "1" }]),
            })
            .await;

        engine
            .handle_event(ServerEvent::ResourceCreated {
                kind: ResourceKind::Listing,
                item: json!({ "id": "2" }),
            })
            .await;
        assert_eq!(rx.borrow().items[0]["id"], "2");

        engine
            .handle_event(ServerEvent::ResourceDeleted {
                kind: ResourceKind::Listing,
                id: "1".to_string(),
            })
            .await;
        let ids: Vec<_> = rx
            .borrow()
            .items
            .iter()
            .map(|i| i["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[tokio::test]
    async fn test_other_kind_events_are_ignored() {
        let (engine, _) = engine();
        let rx = engine.snapshot();
        engine
            .handle_event(ServerEvent::ResourceCreated {
                kind: ResourceKind::Booking,
                item: json!({ "id": "b1" }),
            })
            .await;
        assert!(rx.borrow().items.is_empty());
    }

    #[tokio::test]
    async fn test_refetch_emits_snapshot_request() {
        let (engine, transport) = engine();
        engine.refetch().await;
        let emitted = transport.emitted();
        assert!(emitted.iter().any(|e| matches!(
            e,
            ClientEvent::RequestSnapshot { kind: ResourceKind::Listing }
        )));
        assert!(engine.snapshot().borrow().loading);
    }

    #[tokio::test]
    async fn test_transport_error_keeps_stale_collection() {
        let (engine, transport) = engine();
        let rx = engine.snapshot();
        engine
            .handle_event(ServerEvent::ResourceUpdate {
                kind: ResourceKind::Listing,
                payload: json!([{ "id": "1" }]),
            })
            .await;

        transport.set_fail_emit(true);
        engine.refetch().await;

        let snapshot = rx.borrow().clone();
        assert!(snapshot.error.is_some());
        // 断线期间集合保持原样
        assert_eq!(snapshot.items.len(), 1);
    }

    #[tokio::test]
    async fn test_local_helpers() {
        let (engine, _) = engine();
        let rx = engine.snapshot();
        engine.add_item(json!({ "id": "1", "title": "草稿" })).await;
        engine
            .update_item(json!({ "id": "1", "title": "已编辑" }))
            .await;
        assert_eq!(rx.borrow().items[0]["title"], "已编辑");

        engine.update_item(json!({ "id": "404" })).await;
        assert_eq!(rx.borrow().items.len(), 1);

        engine.remove_item("1").await;
        assert!(rx.borrow().items.is_empty());
    }
}
