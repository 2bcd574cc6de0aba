//! # 生成端点
//!
//! 准入管道 → 上游调度 → 归一化响应。所有拒绝与上游失败都以
//! `{success:false, error}` 形状返回，状态码按失败类别区分。

use std::time::Instant;

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::error::ProxyError;
use crate::notifier;
use crate::providers::{GenerationRequest, ProviderManager};
use crate::security::AdmissionDecision;
use crate::server::app::AppState;
use crate::server::middleware::ClientId;

/// 拒绝响应
fn reject(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": message })),
    )
        .into_response()
}

/// 准入拒绝对应的状态码
///
/// 400：输入/自动化问题；429：速率限制；503：封禁或冷却。
fn rejection_status(decision: &AdmissionDecision) -> StatusCode {
    match decision {
        AdmissionDecision::Automation => StatusCode::BAD_REQUEST,
        AdmissionDecision::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// 上游失败对应的状态码
fn upstream_status(error: &ProxyError) -> StatusCode {
    match error {
        ProxyError::UpstreamRateLimited { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ProxyError::UpstreamValidation { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `POST /api/generate`
pub async fn generate(
    State(state): State<AppState>,
    Extension(client): Extension<ClientId>,
    Json(request): Json<GenerationRequest>,
) -> Response {
    if request.prompt.trim().is_empty() {
        return reject(StatusCode::BAD_REQUEST, "Prompt is required");
    }

    let decision = state
        .admission
        .admit_generation(&client.0, request.time_elapsed, Instant::now())
        .await;
    if let Some(message) = decision.user_message() {
        return reject(rejection_status(&decision), &message);
    }

    info!(
        "已准入生成请求: 标识 {}, 模型 {}",
        client.0, request.model
    );

    match state.providers.dispatch(&request).await {
        Ok(outcome) => {
            if outcome.success {
                if let Some(notifier) = &state.notifier {
                    for notice in notifier::notices_for(&request, &outcome) {
                        notifier.notify(notice);
                    }
                }
            }
            Json(outcome).into_response()
        }
        Err(error) => reject(
            upstream_status(&error),
            &ProviderManager::user_facing_error(&error),
        ),
    }
}

/// `GET /api/notifier-status`
pub async fn notifier_status(State(state): State<AppState>) -> Response {
    match &state.notifier {
        Some(notifier) => {
            let status = notifier.status();
            Json(json!({
                "bot_initialized": true,
                "send_queue_size": status.send_queue_size,
                "retry_queue_size": status.retry_queue_size,
                "timestamp": Utc::now(),
            }))
            .into_response()
        }
        None => Json(json!({
            "bot_initialized": false,
            "error": "Notifier is not configured",
            "send_queue_size": 0,
            "retry_queue_size": 0,
        }))
        .into_response(),
    }
}
