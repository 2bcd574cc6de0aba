//! # 密钥签发代理端点
//!
//! 转发到内部密钥服务，携带解析出的客户端标识供其做配额归属。

use std::time::Duration;

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use crate::server::app::AppState;
use crate::server::middleware::ClientId;

/// 密钥服务不可用时的对外文案
const UNAVAILABLE_MESSAGE: &str =
    "The API key service is currently unavailable. Please try again later.";

/// `GET /api/generate-key`
pub async fn generate_key(
    State(state): State<AppState>,
    Extension(client): Extension<ClientId>,
) -> Response {
    let url = format!("{}/generate-api-key", state.config.key_service.base_url);

    let result = state
        .http
        .get(&url)
        .header(
            state.config.server.trusted_proxy_header.as_str(),
            client.0.as_str(),
        )
        .timeout(Duration::from_secs(state.config.key_service.timeout_secs))
        .send()
        .await
        .and_then(reqwest::Response::error_for_status);

    match result {
        Ok(response) => match response.json::<serde_json::Value>().await {
            Ok(body) => Json(body).into_response(),
            Err(e) => {
                warn!("密钥服务响应解析失败: {e}");
                unavailable()
            }
        },
        Err(e) => {
            warn!("密钥服务调用失败: {e}");
            unavailable()
        }
    }
}

fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": UNAVAILABLE_MESSAGE })),
    )
        .into_response()
}
