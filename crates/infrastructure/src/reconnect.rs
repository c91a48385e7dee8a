//! 重连监督器
//!
//! 非自愿断线后按指数退避自动恢复连接，调用方无需参与。
//! 状态机：Idle -> Waiting(attempt) -> Connecting -> Connected | Failed，
//! 取消是结构化的：主动断开后不会再有任何重试触发。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use config::ReconnectConfig;
use domain::{Transport, TransportState, UserId};

/// 退避策略
#[derive(Clone, Debug)]
pub enum Backoff {
    Exponential { base: Duration, cap: Duration },
}

impl Backoff {
    pub fn exponential(base: Duration, cap: Duration) -> Self {
        Backoff::Exponential { base, cap }
    }

    /// 第 attempt 次尝试前的等待时长：min(base * 2^attempt, cap)
    fn delay_at(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Exponential { base, cap } => {
                let exp = std::cmp::min(attempt, 20);
                let factor = 1u32 << exp;
                std::cmp::min(base.saturating_mul(factor), *cap)
            }
        }
    }
}

/// 重连状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectState {
    /// 未在恢复流程中
    Idle,
    /// 等待第 attempt 次尝试的退避窗口
    Waiting { attempt: u32 },
    /// 第 attempt 次尝试进行中
    Connecting { attempt: u32 },
    /// 恢复成功
    Connected,
    /// 尝试次数耗尽，终态；需要用户手动刷新
    Failed,
}

/// 重连监督器
#[derive(Clone)]
pub struct ReconnectSupervisor {
    transport: Arc<dyn Transport>,
    identity: UserId,
    config: ReconnectConfig,
    backoff: Backoff,
    state_tx: Arc<watch::Sender<ReconnectState>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

/// 等待关停信号翻转
async fn shutdown_signal(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

impl ReconnectSupervisor {
    /// 创建重连监督器
    pub fn new(transport: Arc<dyn Transport>, identity: UserId, config: ReconnectConfig) -> Self {
        let (state_tx, _) = watch::channel(ReconnectState::Idle);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            transport,
            identity,
            backoff: Backoff::exponential(
                Duration::from_secs(config.base_delay_secs),
                Duration::from_secs(config.cap_secs),
            ),
            config,
            state_tx: Arc::new(state_tx),
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// 重连状态观察端
    pub fn state(&self) -> watch::Receiver<ReconnectState> {
        self.state_tx.subscribe()
    }

    /// 主动关停：取消任何排定中的重试
    ///
    /// 显式登出时必须先调用本方法再断开传输层。
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        self.state_tx.send_replace(ReconnectState::Idle);
    }

    /// 启动监督循环
    pub fn start(&self) -> JoinHandle<()> {
        let supervisor = self.clone();
        tokio::spawn(async move { supervisor.supervise().await })
    }

    async fn supervise(&self) {
        let mut transport_state = self.transport.state();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            // 等待断线
            loop {
                if *shutdown_rx.borrow() {
                    return;
                }
                if *transport_state.borrow() == TransportState::Disconnected {
                    break;
                }
                tokio::select! {
                    changed = transport_state.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    _ = shutdown_signal(&mut shutdown_rx) => return,
                }
            }

            if !self.recover(&mut shutdown_rx).await {
                return;
            }
            // 恢复成功，回到监听断线
        }
    }

    /// 一轮恢复流程；返回是否成功恢复
    async fn recover(&self, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
        for attempt in 1..=self.config.max_attempts {
            self.state_tx
                .send_replace(ReconnectState::Waiting { attempt });
            let delay = self.backoff.delay_at(attempt);
            info!(
                "reconnect attempt {}/{} scheduled in {:?}",
                attempt, self.config.max_attempts, delay
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_signal(shutdown_rx) => {
                    // 主动断开取消了排定中的重试
                    self.state_tx.send_replace(ReconnectState::Idle);
                    return false;
                }
            }

            self.state_tx
                .send_replace(ReconnectState::Connecting { attempt });
            match self.transport.connect(self.identity).await {
                Ok(()) => {
                    info!("reconnected after {} attempt(s)", attempt);
                    self.state_tx.send_replace(ReconnectState::Connected);
                    return true;
                }
                Err(e) => warn!("reconnect attempt {} failed: {}", attempt, e),
            }
        }

        // 终态：不再无限循环，提示用户刷新
        error!(
            "reconnect attempts exhausted after {} tries",
            self.config.max_attempts
        );
        self.state_tx.send_replace(ReconnectState::Failed);
        false
    }
}
