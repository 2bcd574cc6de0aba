//! # 应用级中间件
//!
//! 全局访问筛查（封禁列表 + IP信誉）、管理端 Basic Auth 与请求ID

use std::fmt;
use std::net::SocketAddr;
use std::ops::Deref;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::server::app::AppState;

/// 免于全局筛查的路径前缀
///
/// 管理页自身必须可达（否则封禁了管理员就再也解不开），
/// 静态资源直接放行。
const GUARD_EXEMPT_PREFIXES: [&str; 3] = ["/block", "/unblock", "/static"];

/// 请求ID类型
#[derive(Debug, Clone)]
pub struct RequestId(String);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Deref for RequestId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// 请求ID中间件
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::new();
    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// 解析后的客户端标识
#[derive(Debug, Clone)]
pub struct ClientId(pub String);

/// 解析真实客户端标识
///
/// 优先读取配置的可信代理转发头；缺失时退回连接对端地址。
/// 直连部署下该头可被伪造，信任边界由部署配置决定。
fn resolve_client_id(request: &Request, trusted_header: &str) -> String {
    if let Some(value) = request.headers().get(trusted_header) {
        if let Ok(raw) = value.to_str() {
            let candidate = raw.trim();
            if !candidate.is_empty() {
                return candidate.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string())
}

/// 拒绝页面
fn access_denied_page(reason: &str) -> Response {
    let body = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Access Denied</title></head>\n\
         <body>\n<h1>Access Denied</h1>\n<p>{reason}</p>\n</body>\n</html>"
    );
    (StatusCode::FORBIDDEN, Html(body)).into_response()
}

/// 全局访问筛查中间件
///
/// 对除管理页与静态资源外的所有路由执行封禁列表与IP信誉检查，
/// 并把解析出的客户端标识注入请求扩展供后续处理器使用。
pub async fn access_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if GUARD_EXEMPT_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
    {
        return next.run(request).await;
    }

    let client_id = resolve_client_id(&request, &state.config.server.trusted_proxy_header);
    request.extensions_mut().insert(ClientId(client_id.clone()));

    let decision = state.admission.screen_access(&client_id).await;
    if let Some(reason) = decision.user_message() {
        return access_denied_page(&reason);
    }

    debug!("访问筛查通过: {client_id}");
    next.run(request).await
}

/// 管理端 Basic Auth 中间件
///
/// 凭证来自静态配置；校验失败时返回 401 并携带
/// `WWW-Authenticate` 头以触发浏览器的登录弹窗。
pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(decode_basic_credentials)
        .is_some_and(|(username, password)| {
            username == state.config.admin.username && password == state.config.admin.password
        });

    if !authorized {
        warn!("管理端认证失败");
        return (
            StatusCode::UNAUTHORIZED,
            [(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"Login Required\""),
            )],
            "Could not verify your access level for that URL.\n\
             You have to login with proper credentials",
        )
            .into_response();
    }

    next.run(request).await
}

/// 解析 `Authorization: Basic` 头为用户名/密码对
fn decode_basic_credentials(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.strip_prefix("Basic ")?;
    let decoded = BASE64_STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
