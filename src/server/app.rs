//! # 应用装配
//!
//! 共享状态构造、路由表与服务器启动

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::error::{ProxyError, Result};
use crate::notifier::{self, NotifierHandle};
use crate::providers::ProviderManager;
use crate::security::{AdmissionPipeline, BlocklistStore, CooldownBreaker, ReputationChecker};
use crate::server::handlers;
use crate::server::middleware::{access_guard, admin_auth, request_id_middleware};

/// 应用共享状态
///
/// 全部可变共享状态在进程启动时构造一次，经 `Arc` 句柄克隆进
/// 各请求处理路径，不使用任何环境全局量。
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Arc<AppConfig>,
    /// 准入管道
    pub admission: Arc<AdmissionPipeline>,
    /// 上游调度器
    pub providers: Arc<ProviderManager>,
    /// 封禁列表（管理端点直接操作）
    pub blocklist: Arc<BlocklistStore>,
    /// 生成结果通知器（未配置时为 None）
    pub notifier: Option<NotifierHandle>,
    /// 中转用 HTTP 客户端（密钥签发 / 上传 / 下载）
    pub http: reqwest::Client,
}

/// 构造应用状态
pub fn build_state(config: AppConfig) -> Result<AppState> {
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| ProxyError::internal_with_source("构造 HTTP 客户端失败", e))?;

    let blocklist = Arc::new(BlocklistStore::load(&config.security.blocklist_file));
    let reputation = Arc::new(ReputationChecker::new(
        http.clone(),
        config.security.reputation.clone(),
    ));
    let cooldown = Arc::new(CooldownBreaker::new(Duration::from_secs(
        config.security.cooldown_secs,
    )));
    let admission = Arc::new(AdmissionPipeline::new(
        &config.security,
        &config.server,
        Arc::clone(&blocklist),
        reputation,
        Arc::clone(&cooldown),
    )?);
    let providers = Arc::new(ProviderManager::new(
        http.clone(),
        &config.providers,
        cooldown,
    ));

    let notifier = config
        .telegram
        .clone()
        .map(|telegram| notifier::spawn(http.clone(), telegram));

    Ok(AppState {
        config: Arc::new(config),
        admission,
        providers,
        blocklist,
        notifier,
        http,
    })
}

/// 组装路由表
///
/// 管理页（/block、/unblock）带 Basic Auth 且免于全局筛查；
/// 静态资源前缀同样免检。其余所有路由经过访问筛查中间件。
pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/block", get(handlers::admin::block_page).post(handlers::admin::block_ip))
        .route("/unblock", post(handlers::admin::unblock_ip))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            admin_auth,
        ));

    let upload_limit = state.config.upload.max_file_size_bytes;

    Router::new()
        .route("/api/generate", post(handlers::generate::generate))
        .route("/api/generate-key", get(handlers::keys::generate_key))
        .route(
            "/upload",
            post(handlers::upload::upload).layer(DefaultBodyLimit::max(upload_limit + 64 * 1024)),
        )
        .route("/download/{*image_url}", get(handlers::download::download))
        .route(
            "/api/notifier-status",
            get(handlers::generate::notifier_status),
        )
        .merge(admin_routes)
        .nest_service(
            "/static",
            ServeDir::new(state.config.server.static_dir.clone()),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            access_guard,
        ))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 启动服务器，阻塞直至退出
pub async fn run_server(config: AppConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| ProxyError::config_with_source("无效的监听地址", e))?;

    let state = build_state(config)?;
    info!(
        "服务启动: {addr}，封禁记录 {} 条，速率限制 {}/{}s",
        state.blocklist.len(),
        state.config.security.rate_limit,
        state.config.security.rate_limit_window_secs
    );

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ProxyError::server_start_with_source("端口绑定失败", e))?;

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| ProxyError::server_start_with_source("服务器异常退出", e))
}
