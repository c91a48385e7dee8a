//! 领域模型错误定义
//!
//! 定义了实时层中所有可能的错误类型，提供清晰的错误上下文。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 消息相关错误
    #[error("消息错误: {message}")]
    MessageError { message: String },

    /// 会话相关错误
    #[error("会话错误: {message}")]
    ConversationError { message: String },

    /// 事件解码错误
    #[error("事件解码失败: {event}: {message}")]
    EventDecodeError { event: String, message: String },

    /// 验证错误
    #[error("验证失败: {field}: {message}")]
    ValidationError { field: String, message: String },
}

impl DomainError {
    /// 创建消息错误
    pub fn message_error(message: impl Into<String>) -> Self {
        Self::MessageError {
            message: message.into(),
        }
    }

    /// 创建会话错误
    pub fn conversation_error(message: impl Into<String>) -> Self {
        Self::ConversationError {
            message: message.into(),
        }
    }

    /// 创建事件解码错误
    pub fn event_decode_error(event: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EventDecodeError {
            event: event.into(),
            message: message.into(),
        }
    }

    /// 创建验证错误
    pub fn validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
