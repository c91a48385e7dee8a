//! 线上帧编解码
//!
//! 每个帧是一条 JSON 文本：`{"event": <名字>, "data": <负载>}`。

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::errors::{DomainError, DomainResult};
use crate::events::client_event::ClientEvent;
use crate::events::event_name::EventName;
use crate::events::server_event::ServerEvent;

/// 线上帧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFrame {
    /// 事件名
    pub event: String,
    /// 负载
    #[serde(default)]
    pub data: JsonValue,
}

impl WireFrame {
    /// 由客户端事件构造帧
    pub fn from_client(event: &ClientEvent) -> Self {
        Self {
            event: event.name().as_str().to_string(),
            data: event.payload(),
        }
    }

    /// 编码为 JSON 文本
    pub fn encode(&self) -> DomainResult<String> {
        serde_json::to_string(self)
            .map_err(|e| DomainError::event_decode_error(self.event.clone(), e.to_string()))
    }

    /// 从 JSON 文本解码
    pub fn decode(text: &str) -> DomainResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| DomainError::event_decode_error("frame", e.to_string()))
    }

    /// 解析为服务端事件
    ///
    /// 未知事件名返回 Ok(None)，由调用方丢弃。
    pub fn into_server_event(self) -> DomainResult<Option<ServerEvent>> {
        match EventName::parse(&self.event) {
            Some(name) => ServerEvent::decode(name, self.data).map(Some),
            None => Ok(None),
        }
    }
}
