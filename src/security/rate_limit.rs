//! # 固定窗口速率限制
//!
//! 按客户端标识计数的硬性固定窗口限流。窗口边界处允许的突发
//! 最多可达限额的两倍（窗口尾部与下一窗口头部各一批），这是
//! 固定窗口方案的既有特性，按规格保留。

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// 单个标识的窗口状态
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start: Instant,
}

/// 固定窗口限流器
///
/// 检查与计数在同一把锁内同步完成，中间不跨越任何挂起点，
/// 因此并发请求不可能在计数生效前双双通过检查。
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl FixedWindowLimiter {
    /// 创建限流器，`limit` 为窗口内允许的请求数
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// 尝试放行一次请求
    ///
    /// 每次调用先清理过期窗口（机会式，无后台定时器），再做判定：
    /// 未跟踪的标识建窗放行；窗口内计数未达限额则递增放行；
    /// 已达限额则拒绝且不再递增。
    pub fn try_admit(&self, id: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");

        // 清理整张表中的过期窗口
        let window = self.window;
        windows.retain(|_, w| now.saturating_duration_since(w.window_start) <= window);

        match windows.get_mut(id) {
            None => {
                windows.insert(
                    id.to_string(),
                    RateWindow {
                        count: 1,
                        window_start: now,
                    },
                );
                true
            }
            Some(w) if w.count < self.limit => {
                w.count += 1;
                true
            }
            Some(_) => false,
        }
    }

    /// 当前被跟踪的标识数量
    pub fn tracked(&self) -> usize {
        self.windows.lock().expect("rate limiter lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> FixedWindowLimiter {
        FixedWindowLimiter::new(3, Duration::from_secs(60))
    }

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let limiter = limiter();
        let now = Instant::now();

        assert!(limiter.try_admit("203.0.113.7", now));
        assert!(limiter.try_admit("203.0.113.7", now));
        assert!(limiter.try_admit("203.0.113.7", now));
        assert!(!limiter.try_admit("203.0.113.7", now));
        // 拒绝后不递增，继续拒绝
        assert!(!limiter.try_admit("203.0.113.7", now));
    }

    #[test]
    fn identifiers_are_isolated() {
        let limiter = limiter();
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.try_admit("203.0.113.7", now));
        }
        assert!(!limiter.try_admit("203.0.113.7", now));
        assert!(limiter.try_admit("198.51.100.23", now));
    }

    #[test]
    fn window_expiry_resets_count() {
        let limiter = limiter();
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.try_admit("203.0.113.7", now));
        }
        assert!(!limiter.try_admit("203.0.113.7", now));

        // 窗口过期后重新建窗
        let later = now + Duration::from_secs(61);
        assert!(limiter.try_admit("203.0.113.7", later));
    }

    #[test]
    fn sweep_drops_stale_entries() {
        let limiter = limiter();
        let now = Instant::now();

        limiter.try_admit("203.0.113.7", now);
        limiter.try_admit("198.51.100.23", now);
        assert_eq!(limiter.tracked(), 2);

        // 任意一次调用都会清理全部过期条目
        let later = now + Duration::from_secs(61);
        limiter.try_admit("192.0.2.1", later);
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn boundary_burst_is_allowed() {
        // 固定窗口特性：窗口尾部 3 次 + 新窗口头部 3 次全部放行
        let limiter = limiter();
        let start = Instant::now();

        for _ in 0..3 {
            assert!(limiter.try_admit("203.0.113.7", start + Duration::from_secs(59)));
        }
        for _ in 0..3 {
            assert!(limiter.try_admit("203.0.113.7", start + Duration::from_secs(121)));
        }
    }
}
