//! 应用层错误定义

use domain::{ApiError, DomainError, TransportError};
use thiserror::Error;

/// 聊天操作错误
///
/// 写调用失败以 Result 交还调用方（由其负责用户反馈），
/// 不会以 panic 形式向上传播。
#[derive(Error, Debug)]
pub enum ChatError {
    /// 领域校验失败
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// 协作方 API 写失败
    #[error(transparent)]
    Api(#[from] ApiError),

    /// 传输层发送失败
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// 聊天操作结果类型
pub type ChatResult<T> = Result<T, ChatError>;
