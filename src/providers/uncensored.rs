//! # uncensored 档位适配器
//!
//! 单一固定模型，强制单图；上游为 infip 生成接口。

use std::time::Duration;

use async_trait::async_trait;

use super::profile::{ProviderProfile, UNCENSORED_MODEL};
use super::traits::ImageProvider;
use super::types::{GenerationOutcome, GenerationRequest, InfipGenerationRequest, InfipGenerationResponse};
use super::upstream;
use crate::config::ProviderEndpointConfig;
use crate::error::Result;

/// uncensored 档位适配器
pub struct UncensoredProvider {
    client: reqwest::Client,
    config: ProviderEndpointConfig,
}

impl UncensoredProvider {
    /// 创建适配器
    pub fn new(client: reqwest::Client, config: ProviderEndpointConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/gen", self.config.base_url)
    }

    /// 构造上游请求体：图片数量恒为 1，种子恒为 0
    pub(crate) fn build_payload<'a>(request: &'a GenerationRequest) -> InfipGenerationRequest<'a> {
        InfipGenerationRequest {
            prompt: &request.prompt,
            num_images: 1,
            seed: 0,
            aspect_ratio: request.aspect_ratio,
            models: UNCENSORED_MODEL,
        }
    }
}

#[async_trait]
impl ImageProvider for UncensoredProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile::Uncensored
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome> {
        let payload = Self::build_payload(request);
        let response: InfipGenerationResponse = upstream::post_json(
            &self.client,
            &self.endpoint(),
            self.config.api_key.as_deref(),
            Duration::from_secs(self.config.timeout_secs),
            &payload,
        )
        .await?;

        // 上游对整批返回一个种子，逐图复制
        let seed = response.seed.unwrap_or_default();
        let seeds = vec![seed; response.images.len()];
        Ok(GenerationOutcome::from_images(response.images, seeds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_count(num_images: u32) -> GenerationRequest {
        serde_json::from_value(serde_json::json!({
            "prompt": "a cat",
            "num_images": num_images,
            "model": "uncen",
        }))
        .unwrap()
    }

    #[test]
    fn payload_forces_single_image() {
        let request = request_with_count(4);
        let payload = UncensoredProvider::build_payload(&request);
        assert_eq!(payload.num_images, 1);
        assert_eq!(payload.seed, 0);
        assert_eq!(payload.models, "uncen");
    }
}
