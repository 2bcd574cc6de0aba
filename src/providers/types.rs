//! # 适配器通用类型定义

use serde::{Deserialize, Serialize};

/// 未指定模型时的默认值
pub const DEFAULT_MODEL: &str = "img3";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

const fn default_num_images() -> u32 {
    4
}

/// 画幅比例
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 方形
    #[default]
    #[serde(rename = "IMAGE_ASPECT_RATIO_SQUARE")]
    Square,
    /// 竖幅
    #[serde(rename = "IMAGE_ASPECT_RATIO_PORTRAIT")]
    Portrait,
    /// 横幅
    #[serde(rename = "IMAGE_ASPECT_RATIO_LANDSCAPE")]
    Landscape,
}

/// 生成请求（对外 API 的请求体）
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    /// 提示词
    pub prompt: String,
    /// 请求的图片数量
    #[serde(default = "default_num_images")]
    pub num_images: u32,
    /// 画幅比例
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// 模型选择器
    #[serde(default = "default_model")]
    pub model: String,
    /// 客户端上报的表单提交耗时（秒），用于自动化识别
    #[serde(default)]
    pub time_elapsed: f64,
    /// 参考图地址（可选，仅 multi-variant 档位使用）
    #[serde(default)]
    pub image_url: Option<String>,
}

/// 归一化后的生成结果
///
/// `success` 当且仅当至少返回一个图片地址；HTTP 200 但图片列表为空
/// 同样视为失败结果。`seeds_used` 与 `image_urls` 等长同序。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// 是否成功
    pub success: bool,
    /// 图片地址列表
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
    /// 每张图片对应的种子
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seeds_used: Vec<i64>,
    /// 失败原因
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationOutcome {
    /// 从上游返回的图片与种子构造结果
    pub fn from_images(image_urls: Vec<String>, seeds_used: Vec<i64>) -> Self {
        Self {
            success: !image_urls.is_empty(),
            image_urls,
            seeds_used,
            error: None,
        }
    }

    /// 构造失败结果
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            image_urls: Vec::new(),
            seeds_used: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// infip 上游请求体
#[derive(Debug, Serialize)]
pub struct InfipGenerationRequest<'a> {
    /// 提示词
    pub prompt: &'a str,
    /// 图片数量
    pub num_images: u32,
    /// 种子（0 表示由上游随机）
    pub seed: i64,
    /// 画幅比例
    pub aspect_ratio: AspectRatio,
    /// 上游模型标识
    pub models: &'a str,
}

/// infip 上游响应体
#[derive(Debug, Deserialize)]
pub struct InfipGenerationResponse {
    /// 图片地址列表
    #[serde(default)]
    pub images: Vec<String>,
    /// 整批共用的种子
    #[serde(default)]
    pub seed: Option<i64>,
}

/// together 上游请求体
#[derive(Debug, Serialize)]
pub struct TogetherGenerationRequest<'a> {
    /// 上游模型标识
    pub model: &'a str,
    /// 提示词
    pub prompt: &'a str,
    /// 图片数量
    pub n: u32,
    /// 宽度（kontext 系模型省略）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// 高度（kontext 系模型省略）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// 采样步数（仅部分模型需要）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    /// 参考图地址
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<&'a str>,
}

/// together 上游响应体
#[derive(Debug, Deserialize)]
pub struct TogetherGenerationResponse {
    /// 返回的图片条目
    #[serde(default)]
    pub data: Vec<TogetherImage>,
}

/// together 响应中的单个图片条目
#[derive(Debug, Deserialize)]
pub struct TogetherImage {
    /// 图片地址
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_are_applied() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"prompt":"a cat"}"#).unwrap();
        assert_eq!(request.num_images, 4);
        assert_eq!(request.model, "img3");
        assert_eq!(request.aspect_ratio, AspectRatio::Square);
        assert!(request.image_url.is_none());
        assert_eq!(request.time_elapsed, 0.0);
    }

    #[test]
    fn aspect_ratio_serializes_to_wire_names() {
        let json = serde_json::to_string(&AspectRatio::Portrait).unwrap();
        assert_eq!(json, r#""IMAGE_ASPECT_RATIO_PORTRAIT""#);
    }

    #[test]
    fn unknown_aspect_ratio_is_rejected() {
        let result: Result<GenerationRequest, _> =
            serde_json::from_str(r#"{"prompt":"a cat","aspect_ratio":"WIDE"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn empty_image_list_is_not_success() {
        let outcome = GenerationOutcome::from_images(Vec::new(), Vec::new());
        assert!(!outcome.success);
    }

    #[test]
    fn failure_outcome_omits_empty_lists() {
        let outcome = GenerationOutcome::failure("boom");
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"boom"}"#);
    }

    #[test]
    fn together_request_omits_absent_fields() {
        let payload = TogetherGenerationRequest {
            model: "black-forest-labs/FLUX.1-kontext-max",
            prompt: "a cat",
            n: 4,
            width: None,
            height: None,
            steps: None,
            image_url: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert!(object.contains_key("model"));
        assert!(object.contains_key("prompt"));
        assert!(object.contains_key("n"));
        assert!(!object.contains_key("width"));
        assert!(!object.contains_key("steps"));
    }
}
