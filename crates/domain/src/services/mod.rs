//! 实时层服务接口
//!
//! 传输层、协作方 API 与离线队列存储的抽象，
//! 具体实现位于 infrastructure。

pub mod collaborator_api;
pub mod queue_store;
pub mod transport;

pub use collaborator_api::*;
pub use queue_store::*;
pub use transport::*;
