//! 租房平台实时层核心领域模型
//!
//! 包含连接、会话、消息、通知等核心实体，实时事件定义，
//! 以及传输层与协作方 API 的服务接口。

pub mod entities;
pub mod errors;
pub mod events;
pub mod services;
pub mod value_objects;

// 重新导出常用类型
pub use entities::*;
pub use errors::*;
pub use events::*;
pub use services::*;
pub use value_objects::*;
