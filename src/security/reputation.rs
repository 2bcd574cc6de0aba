//! # IP 信誉检查
//!
//! 基于外部信誉服务的匿名化出口识别（VPN / Tor / 代理 / 数据中心），
//! 判定结果按 TTL 缓存。查询失败时放行（fail-open）：这是既定的可用性
//! 取舍，宁可放过可疑来源也不因上游抖动拒绝正常用户。

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ReputationConfig;

/// 匿名化类别标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReputationTag {
    Vpn,
    Tor,
    Proxy,
    Datacenter,
}

impl fmt::Display for ReputationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Vpn => "VPN",
            Self::Tor => "Tor",
            Self::Proxy => "Proxy",
            Self::Datacenter => "Datacenter",
        };
        f.write_str(text)
    }
}

/// 信誉判定结果
#[derive(Debug, Clone)]
pub struct ReputationVerdict {
    /// 是否应当拒绝该来源
    pub blocked: bool,
    /// 命中的类别标签，保持检测顺序
    pub reasons: Vec<ReputationTag>,
    /// 判定产生时间，用于 TTL 失效
    observed_at: Instant,
}

impl ReputationVerdict {
    fn from_reasons(reasons: Vec<ReputationTag>, observed_at: Instant) -> Self {
        Self {
            blocked: !reasons.is_empty(),
            reasons,
            observed_at,
        }
    }

    /// 合成放行判定（fail-open 路径）
    fn permissive(observed_at: Instant) -> Self {
        Self::from_reasons(Vec::new(), observed_at)
    }

    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.observed_at) < ttl
    }

    /// 标签列表的展示文本，如 `VPN, Datacenter`
    pub fn reason_text(&self) -> String {
        self.reasons
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// 信誉服务响应
#[derive(Debug, Deserialize)]
struct IpQueryResponse {
    #[serde(default)]
    risk: RiskFlags,
}

/// 风险标志位
#[derive(Debug, Default, Deserialize)]
struct RiskFlags {
    #[serde(default)]
    is_vpn: bool,
    #[serde(default)]
    is_tor: bool,
    #[serde(default)]
    is_proxy: bool,
    #[serde(default)]
    is_datacenter: bool,
}

impl RiskFlags {
    fn to_tags(&self) -> Vec<ReputationTag> {
        let mut tags = Vec::new();
        if self.is_vpn {
            tags.push(ReputationTag::Vpn);
        }
        if self.is_tor {
            tags.push(ReputationTag::Tor);
        }
        if self.is_proxy {
            tags.push(ReputationTag::Proxy);
        }
        if self.is_datacenter {
            tags.push(ReputationTag::Datacenter);
        }
        tags
    }
}

/// 信誉检查器：TTL 缓存 + 外部查询
///
/// 同一标识的并发首查可能重复触发外部请求（无 single-flight 去重），
/// 结果以后写入者为准，属可接受行为。
pub struct ReputationChecker {
    client: reqwest::Client,
    config: ReputationConfig,
    cache: RwLock<HashMap<String, ReputationVerdict>>,
}

impl ReputationChecker {
    /// 创建检查器
    pub fn new(client: reqwest::Client, config: ReputationConfig) -> Self {
        Self {
            client,
            config,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// 查询一个客户端标识的信誉判定
    ///
    /// 缓存命中且未过期时直接返回；否则发起外部查询。
    /// 查询失败时返回放行判定并照常缓存，避免抖动的上游被反复打爆。
    pub async fn check(&self, id: &str) -> ReputationVerdict {
        let ttl = Duration::from_secs(self.config.ttl_secs);
        let now = Instant::now();

        {
            let cache = self.cache.read().expect("reputation cache lock poisoned");
            if let Some(verdict) = cache.get(id) {
                if verdict.is_fresh(ttl, now) {
                    debug!("信誉缓存命中: {id}");
                    return verdict.clone();
                }
            }
        }

        debug!("信誉缓存未命中: {id}，查询外部服务");
        let verdict = match self.lookup(id).await {
            Ok(flags) => ReputationVerdict::from_reasons(flags.to_tags(), Instant::now()),
            Err(e) => {
                warn!("信誉查询失败: {e}，按放行处理 (fail-open)");
                ReputationVerdict::permissive(Instant::now())
            }
        };

        self.cache
            .write()
            .expect("reputation cache lock poisoned")
            .insert(id.to_string(), verdict.clone());

        verdict
    }

    async fn lookup(&self, id: &str) -> Result<RiskFlags, reqwest::Error> {
        let url = format!("{}/{id}?format=json", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?
            .error_for_status()?;
        let body: IpQueryResponse = response.json().await?;
        Ok(body.risk)
    }

    /// 缓存中的条目数（测试与诊断用）
    pub fn cached(&self) -> usize {
        self.cache
            .read()
            .expect("reputation cache lock poisoned")
            .len()
    }
}
