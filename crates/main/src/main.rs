//! 实时层演示入口
//!
//! 以环境变量中的身份连接实时服务，把各呈现面的事件
//! 打到日志，Ctrl-C 登出退出。

use std::env;

use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use client::RealtimeClient;
use config::RealtimeConfig;
use domain::UserId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 读取环境变量配置
    let config = RealtimeConfig::from_env();
    let identity = env::var("REALTIME_IDENTITY")
        .ok()
        .and_then(|s| s.parse::<Uuid>().ok())
        .map(UserId::from)
        .unwrap_or_else(|| UserId::from(Uuid::new_v4()));

    tracing::info!("starting realtime client as {}", identity);
    tracing::info!("transport: {}", config.transport.url);

    let (realtime, mut surfaces) = RealtimeClient::start(config, identity).await;

    let mut transport_state = realtime.transport_state();
    let mut notifications = realtime.notifications();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("signing out");
                realtime.sign_out().await;
                break;
            }
            changed = transport_state.changed() => {
                if changed.is_err() {
                    break;
                }
                tracing::info!("transport state: {}", *transport_state.borrow());
            }
            changed = notifications.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = notifications.borrow().clone();
                tracing::info!(
                    "notifications: {} total, {} unread",
                    snapshot.total,
                    snapshot.unread_count
                );
            }
            Some(toast) = surfaces.toasts.recv() => {
                tracing::info!("toast [{:?}] {}: {}", toast.severity, toast.title, toast.message);
            }
            Some(command) = surfaces.session_commands.recv() => {
                tracing::warn!("session command: {:?}", command);
                realtime.sign_out().await;
                break;
            }
        }
    }

    Ok(())
}
