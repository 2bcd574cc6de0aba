//! # 上游调用共享逻辑
//!
//! 统一的 POST + 错误分类：429、结构化错误体、连接失败与其余
//! 不可分类失败分别映射到各自的错误变体，适配器不重复实现。

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ProxyError, Result};

/// 发送 JSON 请求并解析响应
///
/// 响应流在本函数内消费完毕，成功与失败路径都不会泄漏连接。
pub(super) async fn post_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
    timeout: Duration,
    payload: &impl Serialize,
) -> Result<T> {
    let mut request = client.post(url).timeout(timeout).json(payload);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(classify_send_error)?;
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        warn!("上游返回 429: {url}");
        return Err(ProxyError::UpstreamRateLimited {
            message: format!("上游速率限制 ({url})"),
        });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        debug!("上游非 2xx 响应 ({status}): {body}");
        return Err(match extract_error_message(&body) {
            Some(message) => ProxyError::UpstreamValidation {
                status: status.as_u16(),
                message,
            },
            None => ProxyError::UpstreamUnexpected {
                message: format!("上游返回状态 {status}"),
                source: None,
            },
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProxyError::UpstreamUnexpected {
            message: "上游响应解析失败".to_string(),
            source: Some(e.into()),
        })
}

/// 发送阶段错误分类：连接层失败与其余失败分开
fn classify_send_error(error: reqwest::Error) -> ProxyError {
    if error.is_connect() {
        ProxyError::network_with_source("无法连接上游", error)
    } else {
        ProxyError::UpstreamUnexpected {
            message: "上游请求失败".to_string(),
            source: Some(error.into()),
        }
    }
}

/// 从上游错误体中提取结构化错误消息
///
/// 依次尝试 `error.message`、字符串形式的 `error`、顶层 `message`。
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    if let Some(error) = value.get("error") {
        if let Some(message) = error.get("message").and_then(|m| m.as_str()) {
            return Some(message.to_string());
        }
        if let Some(message) = error.as_str() {
            return Some(message.to_string());
        }
    }

    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(std::string::ToString::to_string)
}
