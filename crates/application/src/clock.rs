use chrono::Utc;
use domain::Timestamp;

/// 时间来源抽象，测试中可替换
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// 系统时钟
#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}
