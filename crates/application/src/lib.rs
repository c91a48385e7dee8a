//! 实时层应用服务
//!
//! 把传输层推送的原始事件投影为 UI 可直接消费的状态：
//! 会话控制、资源同步、通知扇出、离线动作队列与仪表盘实时流。

pub mod chat_session;
pub mod clock;
pub mod errors;
pub mod live_feed;
pub mod notification_center;
pub mod offline_queue;
pub mod resource_sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use chat_session::*;
pub use clock::*;
pub use errors::*;
pub use live_feed::*;
pub use notification_center::*;
pub use offline_queue::*;
pub use resource_sync::*;
