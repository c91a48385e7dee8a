//! 实时层基础设施实现
//!
//! WebSocket 传输管理、重连监督、协作方 HTTP 客户端
//! 与离线队列的文件存储。

pub mod api_client;
pub mod queue_store;
pub mod reconnect;
pub mod transport;

pub use api_client::*;
pub use queue_store::*;
pub use reconnect::*;
pub use transport::*;
