//! # 冷却熔断器
//!
//! 进程级的生成流量抑制开关：上游返回 429 时触发，固定时长，
//! 到期自动失效，期间所有生成请求一律拒绝。

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;

/// 冷却熔断器
pub struct CooldownBreaker {
    duration: Duration,
    until: Mutex<Option<Instant>>,
}

impl CooldownBreaker {
    /// 创建熔断器，`duration` 为单次触发的冷却时长
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            until: Mutex::new(None),
        }
    }

    /// 熔断是否处于打开状态（打开 = 拒绝请求）
    pub fn is_open(&self, now: Instant) -> bool {
        self.until
            .lock()
            .expect("cooldown lock poisoned")
            .is_some_and(|until| now < until)
    }

    /// 触发熔断：无条件覆盖到期时间为 `now + duration`
    ///
    /// 重复触发不做叠加，始终以最近一次为准。
    pub fn trip(&self, now: Instant) {
        let until = now + self.duration;
        *self.until.lock().expect("cooldown lock poisoned") = Some(until);
        warn!(
            "冷却熔断已触发，{} 秒内拒绝所有生成请求",
            self.duration.as_secs()
        );
    }

    /// 剩余冷却时间；未触发或已到期时为 `None`
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.until
            .lock()
            .expect("cooldown lock poisoned")
            .and_then(|until| (now < until).then(|| until - now))
    }
}
