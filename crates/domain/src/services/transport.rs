//! 传输层接口
//!
//! 封装持久化双向连接：连接生命周期、身份宣告、
//! 事件订阅与原始事件分发。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::entities::connection::TransportState;
use crate::events::client_event::ClientEvent;
use crate::events::event_name::EventName;
use crate::events::server_event::ServerEvent;
use crate::value_objects::UserId;

/// 传输层错误
///
/// 只在调用侧以 Result 出现，从不以 panic 形式进入上层；
/// UI 通过状态字段观察连接健康度。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// 连接建立失败
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// 当前没有活跃连接
    #[error("not connected")]
    NotConnected,

    /// 连接已关闭
    #[error("connection closed: {0}")]
    Closed(String),

    /// 帧编解码失败
    #[error("codec error: {0}")]
    Codec(String),
}

/// 传输层连接管理器接口
///
/// 每个已登录身份只允许一个活跃连接；重复 connect 会先
/// 拆除旧连接。
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// 建立（或重建）连接，成功后向服务端宣告身份
    async fn connect(&self, identity: UserId) -> Result<(), TransportError>;

    /// 主动断开连接并清空订阅
    async fn disconnect(&self);

    /// 是否处于已连接状态
    fn is_connected(&self) -> bool;

    /// 发送客户端事件
    async fn emit(&self, event: ClientEvent) -> Result<(), TransportError>;

    /// 订阅指定事件名，返回该事件的接收端
    async fn subscribe(&self, event: EventName) -> mpsc::UnboundedReceiver<ServerEvent>;

    /// 取消订阅；没有活跃订阅时安静地不做任何事
    async fn unsubscribe(&self, event: EventName);

    /// 连接状态观察端
    fn state(&self) -> watch::Receiver<TransportState>;
}
