//! # 上游调度集成测试
//!
//! 用 wiremock 模拟两个上游，验证各档位的请求构造、响应归一化
//! 与共享错误映射（含 429 触发冷却熔断）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use imagegen_proxy::ProxyError;
use imagegen_proxy::config::{ProviderEndpointConfig, ProvidersConfig};
use imagegen_proxy::providers::{GenerationRequest, ProviderManager};
use imagegen_proxy::security::CooldownBreaker;
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request_json(body: serde_json::Value) -> GenerationRequest {
    serde_json::from_value(body).expect("构造请求失败")
}

fn manager_for(infip_url: &str, together_url: &str) -> (ProviderManager, Arc<CooldownBreaker>) {
    let cooldown = Arc::new(CooldownBreaker::new(Duration::from_secs(300)));
    let config = ProvidersConfig {
        infip: ProviderEndpointConfig {
            base_url: infip_url.to_string(),
            api_key: None,
            timeout_secs: 5,
        },
        together: ProviderEndpointConfig {
            base_url: together_url.to_string(),
            api_key: Some("test-key".to_string()),
            timeout_secs: 5,
        },
    };
    let manager = ProviderManager::new(reqwest::Client::new(), &config, Arc::clone(&cooldown));
    (manager, cooldown)
}

#[tokio::test]
async fn standard_profile_replicates_upstream_seed() {
    let infip = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gen"))
        .and(body_partial_json(serde_json::json!({
            "prompt": "a cat",
            "num_images": 2,
            "seed": 0,
            "models": "img3",
            "aspect_ratio": "IMAGE_ASPECT_RATIO_SQUARE",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "images": ["https://cdn/u1.png", "https://cdn/u2.png"],
            "seed": 42,
        })))
        .expect(1)
        .mount(&infip)
        .await;

    let (manager, _) = manager_for(&infip.uri(), "http://127.0.0.1:1");
    let outcome = manager
        .dispatch(&request_json(serde_json::json!({
            "prompt": "a cat",
            "num_images": 2,
            "model": "img3",
            "time_elapsed": 5,
        })))
        .await
        .expect("调度失败");

    assert!(outcome.success);
    assert_eq!(
        outcome.image_urls,
        vec!["https://cdn/u1.png".to_string(), "https://cdn/u2.png".to_string()]
    );
    assert_eq!(outcome.seeds_used, vec![42, 42]);
}

#[tokio::test]
async fn uncensored_profile_forces_single_image() {
    let infip = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gen"))
        .and(body_partial_json(serde_json::json!({
            "num_images": 1,
            "models": "uncen",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "images": ["https://cdn/u1.png"],
            "seed": 7,
        })))
        .expect(1)
        .mount(&infip)
        .await;

    let (manager, _) = manager_for(&infip.uri(), "http://127.0.0.1:1");
    let outcome = manager
        .dispatch(&request_json(serde_json::json!({
            "prompt": "a cat",
            "num_images": 4,
            "model": "uncen",
        })))
        .await
        .expect("调度失败");

    assert_eq!(outcome.image_urls.len(), 1);
    assert_eq!(outcome.seeds_used, vec![7]);
}

#[tokio::test]
async fn variant_profile_maps_model_and_synthesizes_seeds() {
    let together = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .and(body_partial_json(serde_json::json!({
            "model": "black-forest-labs/FLUX.1-dev",
            "n": 3,
            "width": 1024,
            "height": 1024,
            "steps": 28,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {"url": "https://cdn/v1.png"},
                {"url": "https://cdn/v2.png"},
                {"url": "https://cdn/v3.png"},
            ],
        })))
        .expect(1)
        .mount(&together)
        .await;

    let (manager, _) = manager_for("http://127.0.0.1:1", &together.uri());
    let outcome = manager
        .dispatch(&request_json(serde_json::json!({
            "prompt": "a cat",
            "num_images": 3,
            "model": "flux-dev",
        })))
        .await
        .expect("调度失败");

    assert!(outcome.success);
    assert_eq!(outcome.seeds_used.len(), outcome.image_urls.len());
    assert!(
        outcome
            .seeds_used
            .iter()
            .all(|seed| (1_000_000..=9_999_999).contains(seed))
    );
}

#[tokio::test]
async fn upstream_429_trips_the_cooldown_breaker() {
    let infip = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gen"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&infip)
        .await;

    let (manager, cooldown) = manager_for(&infip.uri(), "http://127.0.0.1:1");
    assert!(!cooldown.is_open(Instant::now()));

    let error = manager
        .dispatch(&request_json(serde_json::json!({
            "prompt": "a cat",
            "model": "img3",
        })))
        .await
        .expect_err("应当失败");

    assert!(matches!(error, ProxyError::UpstreamRateLimited { .. }));
    assert_eq!(
        ProviderManager::user_facing_error(&error),
        "Rate limit hit. Cooling down for 5 minutes."
    );
    // 熔断已打开，持续到配置的冷却时长结束
    assert!(cooldown.is_open(Instant::now()));
    assert!(cooldown.remaining(Instant::now()).unwrap() <= Duration::from_secs(300));
}

#[tokio::test]
async fn structured_error_body_passes_through_verbatim() {
    let infip = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gen"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {"message": "Prompt violates content policy"},
        })))
        .mount(&infip)
        .await;

    let (manager, cooldown) = manager_for(&infip.uri(), "http://127.0.0.1:1");
    let error = manager
        .dispatch(&request_json(serde_json::json!({
            "prompt": "a cat",
            "model": "img3",
        })))
        .await
        .expect_err("应当失败");

    assert_eq!(
        ProviderManager::user_facing_error(&error),
        "Prompt violates content policy"
    );
    // 非 429 不触发熔断
    assert!(!cooldown.is_open(Instant::now()));
}

#[tokio::test]
async fn connection_failure_maps_to_fixed_message() {
    // 上游端口未监听，连接必然被拒绝
    let (manager, _) = manager_for("http://127.0.0.1:1", "http://127.0.0.1:1");
    let error = manager
        .dispatch(&request_json(serde_json::json!({
            "prompt": "a cat",
            "model": "img3",
        })))
        .await
        .expect_err("应当失败");

    assert_eq!(
        ProviderManager::user_facing_error(&error),
        "Could not connect to the image generation API."
    );
}

#[tokio::test]
async fn empty_image_list_is_reported_as_failure() {
    let infip = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gen"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "images": [],
            "seed": 9,
        })))
        .mount(&infip)
        .await;

    let (manager, _) = manager_for(&infip.uri(), "http://127.0.0.1:1");
    let outcome = manager
        .dispatch(&request_json(serde_json::json!({
            "prompt": "a cat",
            "model": "img3",
        })))
        .await
        .expect("HTTP 200 不应映射为错误");

    assert!(!outcome.success);
    assert!(outcome.image_urls.is_empty());
}
