//! # standard 档位适配器
//!
//! 默认档位：模型名原样透传给 infip 上游，数量按调用方要求。

use std::time::Duration;

use async_trait::async_trait;

use super::profile::ProviderProfile;
use super::traits::ImageProvider;
use super::types::{GenerationOutcome, GenerationRequest, InfipGenerationRequest, InfipGenerationResponse};
use super::upstream;
use crate::config::ProviderEndpointConfig;
use crate::error::Result;

/// standard 档位适配器
pub struct StandardProvider {
    client: reqwest::Client,
    config: ProviderEndpointConfig,
}

impl StandardProvider {
    /// 创建适配器
    pub fn new(client: reqwest::Client, config: ProviderEndpointConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/gen", self.config.base_url)
    }

    /// 构造上游请求体：模型名与数量透传，种子恒为 0
    pub(crate) fn build_payload<'a>(request: &'a GenerationRequest) -> InfipGenerationRequest<'a> {
        InfipGenerationRequest {
            prompt: &request.prompt,
            num_images: request.num_images,
            seed: 0,
            aspect_ratio: request.aspect_ratio,
            models: &request.model,
        }
    }
}

#[async_trait]
impl ImageProvider for StandardProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile::Standard
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

        // 上游对整批回显一个种子，逐图复制
        let seed = response.seed.unwrap_or_default();
        let seeds = vec![seed; response.images.len()];
        Ok(GenerationOutcome::from_images(response.images, seeds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_passes_model_and_count_through() {
        let request: GenerationRequest = serde_json::from_value(serde_json::json!({
            "prompt": "a cat",
            "num_images": 2,
            "model": "img4",
        }))
        .unwrap();

        let payload = StandardProvider::build_payload(&request);
        assert_eq!(payload.models, "img4");
        assert_eq!(payload.num_images, 2);
        assert_eq!(payload.seed, 0);
    }
}
