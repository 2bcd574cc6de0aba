//! # 档位分类与模型映射
//!
//! 按请求的模型选择器把流量划入三种上游集成档位。新增档位时
//! 扩展枚举与 `classify`，不要退回链式条件判断。

/// uncensored 档位的唯一模型标识
pub const UNCENSORED_MODEL: &str = "uncen";

/// multi-variant 档位的封闭模型集合
const VARIANT_MODELS: [&str; 6] = [
    "kontext-max",
    "kontext-pro",
    "flux-1-1-pro",
    "flux-dev",
    "flux-pro",
    "flux-schnell",
];

/// 上游集成档位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderProfile {
    /// 单一固定模型，强制单图
    Uncensored,
    /// 封闭命名模型集合，带模型名映射
    MultiVariant,
    /// 默认档位，模型名透传
    Standard,
}

impl ProviderProfile {
    /// 按模型选择器分类；未知模型一律落入 standard 档位
    pub fn classify(model: &str) -> Self {
        if model == UNCENSORED_MODEL {
            Self::Uncensored
        } else if VARIANT_MODELS.contains(&model) {
            Self::MultiVariant
        } else {
            Self::Standard
        }
    }
}

/// 公开模型名到 together 上游模型标识的静态映射
///
/// 集合之外的名字原样透传（classify 保证不会走到这里，保底行为
/// 与原样转发一致）。
pub fn variant_upstream_model(model: &str) -> &str {
    match model {
        "kontext-max" => "black-forest-labs/FLUX.1-kontext-max",
        "kontext-pro" => "black-forest-labs/FLUX.1-kontext-pro",
        "flux-1-1-pro" => "black-forest-labs/FLUX.1.1-pro",
        "flux-dev" => "black-forest-labs/FLUX.1-dev",
        "flux-pro" => "black-forest-labs/FLUX.1-pro",
        "flux-schnell" => "black-forest-labs/FLUX.1-schnell",
        other => other,
    }
}

/// 仅支持单图的 multi-variant 模型
pub fn forces_single_image(model: &str) -> bool {
    matches!(model, "flux-1-1-pro" | "flux-pro")
}

/// kontext 系模型不携带宽高
pub fn omits_dimensions(model: &str) -> bool {
    matches!(model, "kontext-max" | "kontext-pro")
}

/// 需要显式步数的模型
pub fn step_count(model: &str) -> Option<u32> {
    match model {
        "flux-schnell" => Some(4),
        "flux-dev" => Some(28),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("uncen", ProviderProfile::Uncensored)]
    #[case("kontext-max", ProviderProfile::MultiVariant)]
    #[case("kontext-pro", ProviderProfile::MultiVariant)]
    #[case("flux-1-1-pro", ProviderProfile::MultiVariant)]
    #[case("flux-dev", ProviderProfile::MultiVariant)]
    #[case("flux-pro", ProviderProfile::MultiVariant)]
    #[case("flux-schnell", ProviderProfile::MultiVariant)]
    #[case("img3", ProviderProfile::Standard)]
    #[case("img4", ProviderProfile::Standard)]
    #[case("gpt-image-1", ProviderProfile::Standard)]
    #[case("anything-else", ProviderProfile::Standard)]
    fn classify_routes_models(#[case] model: &str, #[case] expected: ProviderProfile) {
        assert_eq!(ProviderProfile::classify(model), expected);
    }

    #[rstest]
    #[case("kontext-max", "black-forest-labs/FLUX.1-kontext-max")]
    #[case("kontext-pro", "black-forest-labs/FLUX.1-kontext-pro")]
    #[case("flux-1-1-pro", "black-forest-labs/FLUX.1.1-pro")]
    #[case("flux-dev", "black-forest-labs/FLUX.1-dev")]
    #[case("flux-pro", "black-forest-labs/FLUX.1-pro")]
    #[case("flux-schnell", "black-forest-labs/FLUX.1-schnell")]
    fn upstream_model_mapping(#[case] public: &str, #[case] upstream: &str) {
        assert_eq!(variant_upstream_model(public), upstream);
    }

    #[test]
    fn single_image_forcing_is_limited_to_two_models() {
        assert!(forces_single_image("flux-1-1-pro"));
        assert!(forces_single_image("flux-pro"));
        assert!(!forces_single_image("flux-dev"));
        assert!(!forces_single_image("kontext-max"));
    }

    #[test]
    fn step_counts_match_model_family() {
        assert_eq!(step_count("flux-schnell"), Some(4));
        assert_eq!(step_count("flux-dev"), Some(28));
        assert_eq!(step_count("flux-pro"), None);
    }
}
