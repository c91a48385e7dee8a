//! 连接实体定义
//!
//! 每个已登录身份只允许一个活跃连接，由连接管理器独占持有。

use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// 传输层连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    /// 未连接
    Disconnected,
    /// 连接建立中
    Connecting,
    /// 已连接
    Connected,
}

impl Default for TransportState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportState::Disconnected => write!(f, "disconnected"),
            TransportState::Connecting => write!(f, "connecting"),
            TransportState::Connected => write!(f, "connected"),
        }
    }
}

/// 连接实体
///
/// 记录当前连接归属的身份、传输状态与重试次数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// 连接归属的用户
    pub identity: UserId,
    /// 传输状态
    pub transport_state: TransportState,
    /// 连续重连次数
    pub retry_count: u32,
}

impl Connection {
    /// 为指定身份创建新连接（初始为连接中）
    pub fn new(identity: UserId) -> Self {
        Self {
            identity,
            transport_state: TransportState::Connecting,
            retry_count: 0,
        }
    }

    /// 标记连接已建立，并清零重试计数
    pub fn mark_connected(&mut self) {
        self.transport_state = TransportState::Connected;
        self.retry_count = 0;
    }

    /// 标记连接正在建立
    pub fn mark_connecting(&mut self) {
        self.transport_state = TransportState::Connecting;
    }

    /// 标记连接已断开
    pub fn mark_disconnected(&mut self) {
        self.transport_state = TransportState::Disconnected;
    }

    /// 记录一次失败的连接尝试
    pub fn record_retry(&mut self) {
        self.retry_count = self.retry_count.saturating_add(1);
    }

    /// 是否处于已连接状态
    pub fn is_connected(&self) -> bool {
        self.transport_state == TransportState::Connected
    }
}
