//! # 准入管道集成测试
//!
//! 用 wiremock 模拟信誉服务，验证缓存复用、TTL 过期、fail-open
//! 与匿名化出口拒绝。

use std::sync::Arc;
use std::time::{Duration, Instant};

use imagegen_proxy::config::{AppConfig, ReputationConfig};
use imagegen_proxy::security::{
    AdmissionDecision, AdmissionPipeline, BlocklistStore, CooldownBreaker, ReputationChecker,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn checker_for(uri: &str, ttl_secs: u64) -> Arc<ReputationChecker> {
    Arc::new(ReputationChecker::new(
        reqwest::Client::new(),
        ReputationConfig {
            base_url: uri.to_string(),
            ttl_secs,
            timeout_secs: 2,
        },
    ))
}

fn pipeline_for(
    dir: &TempDir,
    reputation: Arc<ReputationChecker>,
) -> (AdmissionPipeline, Arc<BlocklistStore>) {
    let config = AppConfig::default();
    let blocklist = Arc::new(BlocklistStore::load(dir.path().join("blocked_ips.txt")));
    let cooldown = Arc::new(CooldownBreaker::new(Duration::from_secs(300)));
    let pipeline = AdmissionPipeline::new(
        &config.security,
        &config.server,
        Arc::clone(&blocklist),
        reputation,
        cooldown,
    )
    .expect("构造管道失败");
    (pipeline, blocklist)
}

fn clean_reputation_body() -> serde_json::Value {
    serde_json::json!({
        "ip": "203.0.113.7",
        "risk": {
            "is_vpn": false,
            "is_tor": false,
            "is_proxy": false,
            "is_datacenter": false,
        },
    })
}

#[tokio::test]
async fn fresh_verdict_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/203.0.113.7"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(clean_reputation_body()))
        // 两次检查只允许一次外部查询
        .expect(1)
        .mount(&server)
        .await;

    let checker = checker_for(&server.uri(), 3600);
    let first = checker.check("203.0.113.7").await;
    let second = checker.check("203.0.113.7").await;

    assert!(!first.blocked);
    assert!(!second.blocked);
}

#[tokio::test]
async fn stale_verdict_triggers_fresh_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/203.0.113.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(clean_reputation_body()))
        // TTL 为零：每次检查都视为过期，必须重新查询
        .expect(2)
        .mount(&server)
        .await;

    let checker = checker_for(&server.uri(), 0);
    checker.check("203.0.113.7").await;
    checker.check("203.0.113.7").await;
}

#[tokio::test]
async fn lookup_failure_fails_open_and_caches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/203.0.113.7"))
        .respond_with(ResponseTemplate::new(500))
        // fail-open 结果同样被缓存，避免打爆抖动的上游
        .expect(1)
        .mount(&server)
        .await;

    let checker = checker_for(&server.uri(), 3600);
    let first = checker.check("203.0.113.7").await;
    let second = checker.check("203.0.113.7").await;

    assert!(!first.blocked);
    assert!(!second.blocked);
    assert_eq!(checker.cached(), 1);
}

#[tokio::test]
async fn anonymizing_exit_is_rejected_with_tags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/203.0.113.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "risk": {"is_vpn": true, "is_datacenter": true},
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (pipeline, _) = pipeline_for(&dir, checker_for(&server.uri(), 3600));

    let decision = pipeline.screen_access("203.0.113.7").await;
    assert_eq!(
        decision.user_message().unwrap(),
        "Use of an anonymizing service (VPN, Datacenter) is not permitted."
    );
}

#[tokio::test]
async fn blocklist_precedes_reputation_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        // 已封禁的标识不应触达信誉服务
        .respond_with(ResponseTemplate::new(200).set_body_json(clean_reputation_body()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (pipeline, blocklist) = pipeline_for(&dir, checker_for(&server.uri(), 3600));
    blocklist.block("203.0.113.7");

    let decision = pipeline.screen_access("203.0.113.7").await;
    assert_eq!(decision, AdmissionDecision::Blocked);
}

#[tokio::test]
async fn exempt_identifier_skips_reputation_even_when_unreachable() {
    let dir = TempDir::new().unwrap();
    // 信誉服务地址不可达；回环标识依然放行且不产生查询
    let (pipeline, _) = pipeline_for(&dir, checker_for("http://127.0.0.1:1", 3600));

    let decision = pipeline
        .admit_generation("127.0.0.1", 5.0, Instant::now())
        .await;
    assert!(decision.is_admitted());
}

#[tokio::test]
async fn full_chain_orders_timing_before_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(clean_reputation_body()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (pipeline, _) = pipeline_for(&dir, checker_for(&server.uri(), 3600));
    let now = Instant::now();

    // 过快的提交在计入速率窗口之前就被拒绝
    for _ in 0..5 {
        let decision = pipeline.admit_generation("203.0.113.7", 0.1, now).await;
        assert_eq!(decision, AdmissionDecision::Automation);
    }

    // 正常耗时的请求仍然享有完整限额
    for _ in 0..3 {
        let decision = pipeline.admit_generation("203.0.113.7", 5.0, now).await;
        assert!(decision.is_admitted());
    }
    let decision = pipeline.admit_generation("203.0.113.7", 5.0, now).await;
    assert_eq!(decision, AdmissionDecision::RateLimited);
}
