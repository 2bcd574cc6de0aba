//! # 上传中转端点
//!
//! 接收 multipart 文件并转发到对象存储服务。只允许图片扩展名，
//! 大小受配置上限约束；文件内容不做任何解码或处理。

use std::time::Duration;

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{info, warn};

use crate::server::app::AppState;

/// 允许的图片扩展名
const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

fn failure(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": message })),
    )
        .into_response()
}

/// 从文件名提取小写扩展名
fn file_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// `POST /upload`
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    // 取出名为 file 的第一个表单项
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => break field,
            Ok(Some(_)) => continue,
            Ok(None) => return failure(StatusCode::BAD_REQUEST, "No file provided"),
            Err(e) => {
                warn!("解析上传表单失败: {e}");
                return failure(StatusCode::BAD_REQUEST, "No file provided");
            }
        }
    };

    let filename = field.file_name().map(str::to_string).unwrap_or_default();
    if filename.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "No file selected");
    }

    let Some(extension) = file_extension(&filename).filter(|ext| {
        ALLOWED_EXTENSIONS.contains(&ext.as_str())
    }) else {
        return failure(
            StatusCode::BAD_REQUEST,
            "Invalid file format. Please upload PNG, JPG, JPEG, GIF, BMP, or WebP files.",
        );
    };

    let content = match field.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("读取上传内容失败: {e}");
            return failure(StatusCode::BAD_REQUEST, "Failed to read uploaded file");
        }
    };
    if content.len() > state.config.upload.max_file_size_bytes {
        return failure(
            StatusCode::BAD_REQUEST,
            "File is too large. Maximum size is 10MB.",
        );
    }

    info!("中转上传: {filename} ({} bytes)", content.len());

    let part = match reqwest::multipart::Part::bytes(content.to_vec())
        .file_name(filename.clone())
        .mime_str(&format!("image/{extension}"))
    {
        Ok(part) => part,
        Err(e) => {
            warn!("构造上传请求失败: {e}");
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected error during upload",
            );
        }
    };
    let form = reqwest::multipart::Form::new().part("file", part);

    let mut request = state
        .http
        .post(&state.config.upload.base_url)
        .timeout(Duration::from_secs(state.config.upload.timeout_secs))
        .multipart(form);
    if let Some(key) = &state.config.upload.api_key {
        request = request.bearer_auth(key);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            warn!("上传服务超时: {e}");
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Upload service timed out");
        }
        Err(e) => {
            warn!("上传服务网络错误: {e}");
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Network error during upload",
            );
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!("上传服务返回状态 {status}");
        return failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Upload service returned status {}", status.as_u16()),
        );
    }

    match response.json::<serde_json::Value>().await {
        Ok(body) => match body.get("url").and_then(serde_json::Value::as_str) {
            Some(file_url) => Json(json!({
                "success": true,
                "file_url": file_url,
                "filename": filename,
            }))
            .into_response(),
            None => failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid response from upload service",
            ),
        },
        Err(e) => {
            warn!("上传服务响应解析失败: {e}");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid JSON response from upload service",
            )
        }
    }
}
