//! 统一配置中心
//!
//! 提供实时层的全局配置管理，包括：
//! - 传输层连接
//! - 协作方 API
//! - 重连退避
//! - 聊天与通知的时间窗口
//! - 离线队列存储

use serde::{Deserialize, Serialize};
use std::env;

/// 实时层全局配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// 传输层配置
    pub transport: TransportConfig,
    /// 协作方 API 配置
    pub api: ApiConfig,
    /// 重连配置
    pub reconnect: ReconnectConfig,
    /// 聊天配置
    pub chat: ChatConfig,
    /// 通知配置
    pub notifications: NotificationConfig,
    /// 离线队列配置
    pub queue: QueueConfig,
}

/// 传输层配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// WebSocket 地址
    pub url: String,
}

/// 协作方 API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// REST 基地址
    pub base_url: String,
}

/// 重连配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// 最大尝试次数，超出后进入终态
    pub max_attempts: u32,
    /// 退避基数（秒）
    pub base_delay_secs: u64,
    /// 退避上限（秒）
    pub cap_secs: u64,
}

/// 聊天配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChatConfig {
    /// 输入状态静默窗口（秒），超时自动清除
    pub typing_expiry_secs: u64,
}

/// 通知配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// toast 展示时长（秒）
    pub toast_secs: u64,
    /// 强制下线前的宽限时长（秒）
    pub logout_grace_secs: u64,
    /// UI 展示的通知条数上限，完整账本仍然保留
    pub display_cap: usize,
}

/// 离线队列配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// 持久化文件路径
    pub store_path: String,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 1,
            cap_secs: 30,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            typing_expiry_secs: 3,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            toast_secs: 5,
            logout_grace_secs: 3,
            display_cap: 50,
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig {
                url: "ws://127.0.0.1:4000/socket".to_string(),
            },
            api: ApiConfig {
                base_url: "http://127.0.0.1:4000/api".to_string(),
            },
            reconnect: ReconnectConfig::default(),
            chat: ChatConfig::default(),
            notifications: NotificationConfig::default(),
            queue: QueueConfig {
                store_path: ".offline-queue.json".to_string(),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl RealtimeConfig {
    /// 从环境变量加载配置，缺省值可直接用于本地开发
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            transport: TransportConfig {
                url: env::var("REALTIME_WS_URL").unwrap_or(defaults.transport.url),
            },
            api: ApiConfig {
                base_url: env::var("REALTIME_API_URL").unwrap_or(defaults.api.base_url),
            },
            reconnect: ReconnectConfig {
                max_attempts: env_parse(
                    "REALTIME_RECONNECT_MAX_ATTEMPTS",
                    defaults.reconnect.max_attempts,
                ),
                base_delay_secs: env_parse(
                    "REALTIME_RECONNECT_BASE_DELAY_SECS",
                    defaults.reconnect.base_delay_secs,
                ),
                cap_secs: env_parse("REALTIME_RECONNECT_CAP_SECS", defaults.reconnect.cap_secs),
            },
            chat: ChatConfig {
                typing_expiry_secs: env_parse(
                    "REALTIME_TYPING_EXPIRY_SECS",
                    defaults.chat.typing_expiry_secs,
                ),
            },
            notifications: NotificationConfig {
                toast_secs: env_parse("REALTIME_TOAST_SECS", defaults.notifications.toast_secs),
                logout_grace_secs: env_parse(
                    "REALTIME_LOGOUT_GRACE_SECS",
                    defaults.notifications.logout_grace_secs,
                ),
                display_cap: env_parse(
                    "REALTIME_NOTIFICATION_DISPLAY_CAP",
                    defaults.notifications.display_cap,
                ),
            },
            queue: QueueConfig {
                store_path: env::var("REALTIME_QUEUE_PATH").unwrap_or(defaults.queue.store_path),
            },
        }
    }
}
