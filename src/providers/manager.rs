//! # 上游调度器
//!
//! 按档位分发生成请求，并承担上游失败的统一出口：429 触发冷却
//! 熔断，其余失败映射为对外文案。原始上游细节不出本层。

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error};

use super::profile::ProviderProfile;
use super::standard::StandardProvider;
use super::traits::ImageProvider;
use super::types::{GenerationOutcome, GenerationRequest};
use super::uncensored::UncensoredProvider;
use super::variant::VariantProvider;
use crate::config::ProvidersConfig;
use crate::error::{ProxyError, Result};
use crate::security::CooldownBreaker;

/// 冷却期间的对外文案
pub const COOLDOWN_MESSAGE: &str = "Rate limit hit. Cooling down for 5 minutes.";
/// 连接失败的对外文案
pub const CONNECT_ERROR_MESSAGE: &str = "Could not connect to the image generation API.";
/// 兜底失败文案
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred during the API call.";

/// 上游调度器
pub struct ProviderManager {
    uncensored: UncensoredProvider,
    variant: VariantProvider,
    standard: StandardProvider,
    cooldown: Arc<CooldownBreaker>,
}

impl ProviderManager {
    /// 创建调度器；所有适配器共享同一个 HTTP 客户端
    pub fn new(
        client: reqwest::Client,
        config: &ProvidersConfig,
        cooldown: Arc<CooldownBreaker>,
    ) -> Self {
        Self {
            uncensored: UncensoredProvider::new(client.clone(), config.infip.clone()),
            variant: VariantProvider::new(client.clone(), config.together.clone()),
            standard: StandardProvider::new(client, config.infip.clone()),
            cooldown,
        }
    }

    /// 分发一次生成请求
    ///
    /// 上游 429 在此处触发冷却熔断后原样上抛，由 HTTP 层决定状态码。
    pub async fn dispatch(&self, request: &GenerationRequest) -> Result<GenerationOutcome> {
        let profile = ProviderProfile::classify(&request.model);
        debug!(
            "分发生成请求: 模型 {}, 档位 {:?}, 数量 {}",
            request.model, profile, request.num_images
        );

        let result = match profile {
            ProviderProfile::Uncensored => self.uncensored.generate(request).await,
            ProviderProfile::MultiVariant => self.variant.generate(request).await,
            ProviderProfile::Standard => self.standard.generate(request).await,
        };

        if let Err(error) = &result {
            if matches!(error, ProxyError::UpstreamRateLimited { .. }) {
                self.cooldown.trip(Instant::now());
            }
            error!("上游调用失败 (模型 {}): {error}", request.model);
        }

        result
    }

    /// 上游失败的对外文案映射
    ///
    /// 结构化错误体的消息原样透传，其余一律归入固定文案，
    /// 不泄漏任何上游内部信息。
    pub fn user_facing_error(error: &ProxyError) -> String {
        match error {
            ProxyError::UpstreamRateLimited { .. } => COOLDOWN_MESSAGE.to_string(),
            ProxyError::UpstreamValidation { message, .. } => message.clone(),
            ProxyError::Network { .. } => CONNECT_ERROR_MESSAGE.to_string(),
            _ => UNEXPECTED_ERROR_MESSAGE.to_string(),
        }
    }
}
