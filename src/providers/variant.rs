//! # multi-variant 档位适配器
//!
//! 封闭命名模型集合，公开模型名经静态表映射为 together 上游标识。
//! 该上游不回传种子，为保持响应形状一致，按图合成伪随机种子。

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use super::profile::{
    self, ProviderProfile, forces_single_image, omits_dimensions, step_count,
};
use super::traits::ImageProvider;
use super::types::{GenerationOutcome, GenerationRequest, TogetherGenerationRequest, TogetherGenerationResponse};
use super::upstream;
use crate::config::ProviderEndpointConfig;
use crate::error::Result;

/// 合成种子的取值范围（闭区间）
const SEED_RANGE: std::ops::RangeInclusive<i64> = 1_000_000..=9_999_999;

/// 固定的方形输出边长
const SQUARE_DIMENSION: u32 = 1024;

/// multi-variant 档位适配器
pub struct VariantProvider {
    client: reqwest::Client,
    config: ProviderEndpointConfig,
}

impl VariantProvider {
    /// 创建适配器
    pub fn new(client: reqwest::Client, config: ProviderEndpointConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/images/generations", self.config.base_url)
    }

    /// 构造上游请求体
    ///
    /// flux-1-1-pro / flux-pro 强制单图；kontext 系省略宽高；
    /// flux-dev / flux-schnell 附带步数；参考图地址按需转发。
    pub(crate) fn build_payload<'a>(request: &'a GenerationRequest) -> TogetherGenerationRequest<'a> {
        let model = request.model.as_str();
        let n = if forces_single_image(model) {
            1
        } else {
            request.num_images
        };
        let (width, height) = if omits_dimensions(model) {
            (None, None)
        } else {
            (Some(SQUARE_DIMENSION), Some(SQUARE_DIMENSION))
        };

        TogetherGenerationRequest {
            model: profile::variant_upstream_model(model),
            prompt: &request.prompt,
            n,
            width,
            height,
            steps: step_count(model),
            image_url: request.image_url.as_deref(),
        }
    }

    /// 为每张返回图片合成一个种子
    fn synthesize_seeds(count: usize) -> Vec<i64> {
        let mut rng = rand::thread_rng();
        (0..count).map(|_| rng.gen_range(SEED_RANGE)).collect()
    }
}

#[async_trait]
impl ImageProvider for VariantProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile::MultiVariant
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome> {
        let payload = Self::build_payload(request);
        let response: TogetherGenerationResponse = upstream::post_json(
            &self.client,
            &self.endpoint(),
            self.config.api_key.as_deref(),
            Duration::from_secs(self.config.timeout_secs),
            &payload,
        )
        .await?;

        let image_urls: Vec<String> = response
            .data
            .into_iter()
            .filter_map(|image| image.url)
            .collect();
        let seeds = Self::synthesize_seeds(image_urls.len());
        Ok(GenerationOutcome::from_images(image_urls, seeds))
    }
}
