//! 实时事件定义
//!
//! 事件名是客户端与服务端之间的线上契约，必须逐字符一致。

pub mod client_event;
pub mod event_name;
pub mod resource;
pub mod server_event;
pub mod wire;

pub use client_event::*;
pub use event_name::*;
pub use resource::*;
pub use server_event::*;
pub use wire::*;
