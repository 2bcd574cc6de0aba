//! # 准入管道
//!
//! 以固定优先级串联全部防滥用检查，任何一道拒绝即短路返回，
//! 不会继续后续检查，更不会触达上游。
//!
//! 顺序：免检网段 → 手工封禁 → IP信誉 → 提交耗时 → 速率限制 → 冷却熔断。

use std::sync::Arc;
use std::time::Instant;

use ipnetwork::IpNetwork;
use tracing::{debug, info};

use crate::config::{SecurityConfig, ServerConfig};
use crate::error::{ProxyError, Result};
use crate::security::{
    BlocklistStore, CooldownBreaker, FixedWindowLimiter, ReputationChecker, ReputationTag,
};

/// 准入判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// 放行
    Admitted,
    /// 命中手工封禁列表
    Blocked,
    /// 命中匿名化出口（VPN / Tor / 代理 / 数据中心）
    Anonymized { reasons: Vec<ReputationTag> },
    /// 提交耗时过短，判定为自动化
    Automation,
    /// 超出窗口内速率限额
    RateLimited,
    /// 冷却熔断期间
    CoolingDown,
}

impl AdmissionDecision {
    /// 是否放行
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }

    /// 拒绝时的用户可见文案；放行时为 `None`
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Admitted => None,
            Self::Blocked => {
                Some("Spamming Or Botting Or Automating With Same Prompt".to_string())
            }
            Self::Anonymized { reasons } => {
                let tags = reasons
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!(
                    "Use of an anonymizing service ({tags}) is not permitted."
                ))
            }
            Self::Automation => Some("Request rejected as potential automation.".to_string()),
            Self::RateLimited => {
                Some("Rate limit exceeded. Please try again in a minute.".to_string())
            }
            Self::CoolingDown => Some("Rate limit hit. Cooling down for 5 minutes.".to_string()),
        }
    }
}

/// 准入管道
///
/// 持有全部防滥用共享状态；进程启动时构造一次，
/// 经 `Arc` 克隆进入各请求处理路径。
pub struct AdmissionPipeline {
    blocklist: Arc<BlocklistStore>,
    reputation: Arc<ReputationChecker>,
    limiter: FixedWindowLimiter,
    cooldown: Arc<CooldownBreaker>,
    exempt_networks: Vec<IpNetwork>,
    min_submit_seconds: f64,
}

impl AdmissionPipeline {
    /// 构造管道；免检网段解析失败视为配置错误
    pub fn new(
        security: &SecurityConfig,
        server: &ServerConfig,
        blocklist: Arc<BlocklistStore>,
        reputation: Arc<ReputationChecker>,
        cooldown: Arc<CooldownBreaker>,
    ) -> Result<Self> {
        let exempt_networks = server
            .exempt_networks
            .iter()
            .map(|raw| {
                raw.parse::<IpNetwork>().map_err(|e| {
                    ProxyError::config_with_source(format!("无效的免检网段 '{raw}'"), e)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            blocklist,
            reputation,
            limiter: FixedWindowLimiter::new(
                security.rate_limit,
                std::time::Duration::from_secs(security.rate_limit_window_secs),
            ),
            cooldown,
            exempt_networks,
            min_submit_seconds: security.min_submit_seconds,
        })
    }

    /// 标识是否属于免检网段（非IP形式的标识一律不免检）
    pub fn is_exempt(&self, id: &str) -> bool {
        id.parse::<std::net::IpAddr>().is_ok_and(|ip| {
            self.exempt_networks
                .iter()
                .any(|network| network.contains(ip))
        })
    }

    /// 全局访问筛查：封禁列表 + IP信誉
    ///
    /// 由应用级中间件对除管理页与静态资源外的所有路由执行。
    pub async fn screen_access(&self, id: &str) -> AdmissionDecision {
        if self.is_exempt(id) {
            return AdmissionDecision::Admitted;
        }

        if self.blocklist.is_blocked(id) {
            info!("拒绝已封禁标识: {id}");
            return AdmissionDecision::Blocked;
        }

        let verdict = self.reputation.check(id).await;
        if verdict.blocked {
            info!("拒绝匿名化出口 {id}: {}", verdict.reason_text());
            return AdmissionDecision::Anonymized {
                reasons: verdict.reasons,
            };
        }

        AdmissionDecision::Admitted
    }

    /// 生成请求的完整准入链
    ///
    /// `time_elapsed` 为客户端上报的表单提交耗时（秒）。
    pub async fn admit_generation(
        &self,
        id: &str,
        time_elapsed: f64,
        now: Instant,
    ) -> AdmissionDecision {
        if self.is_exempt(id) {
            debug!("免检标识放行: {id}");
            return AdmissionDecision::Admitted;
        }

        let screened = self.screen_access(id).await;
        if !screened.is_admitted() {
            return screened;
        }

        if time_elapsed < self.min_submit_seconds {
            info!("疑似自动化提交 (标识 {id}, 耗时 {time_elapsed}s)，拒绝");
            return AdmissionDecision::Automation;
        }

        if !self.limiter.try_admit(id, now) {
            info!("触发速率限制: {id}");
            return AdmissionDecision::RateLimited;
        }

        if self.cooldown.is_open(now) {
            info!("冷却熔断期间，拒绝生成请求: {id}");
            return AdmissionDecision::CoolingDown;
        }

        AdmissionDecision::Admitted
    }

    /// 冷却熔断器句柄
    pub fn cooldown(&self) -> &Arc<CooldownBreaker> {
        &self.cooldown
    }
}
