//! # 适配器特征定义
//!
//! 所有上游图像生成适配器实现的通用接口

use async_trait::async_trait;

use super::profile::ProviderProfile;
use super::types::{GenerationOutcome, GenerationRequest};
use crate::error::Result;

/// 上游图像生成适配器特征
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// 适配器所属档位
    fn profile(&self) -> ProviderProfile;

    /// 调用上游生成图片并归一化结果
    ///
    /// 上游调用失败（连接失败、非 2xx、响应不可解析）返回错误，
    /// 由调用方统一映射；上游成功但未返回任何图片时返回
    /// `success = false` 的结果而非错误。
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome>;
}
