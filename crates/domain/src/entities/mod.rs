//! 实时层核心实体

pub mod connection;
pub mod conversation;
pub mod message;
pub mod notification;
pub mod queued_action;

pub use connection::*;
pub use conversation::*;
pub use message::*;
pub use notification::*;
pub use queued_action::*;
