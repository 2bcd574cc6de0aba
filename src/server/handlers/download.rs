//! # 下载代理端点
//!
//! 把远端图片以附件形式回流给浏览器：推导文件名与内容类型，
//! 响应体流式转发，不在内存中积累整个文件。

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::warn;
use url::Url;

use crate::server::app::AppState;

/// 内容类型到扩展名的映射
const EXTENSION_MAP: [(&str, &str); 6] = [
    ("image/jpeg", ".jpg"),
    ("image/jpg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/bmp", ".bmp"),
    ("image/webp", ".webp"),
];

/// 已认可的文件扩展名
const VALID_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"];

/// 由扩展名反推内容类型
fn mime_for_extension(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    match lower.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// 推导下载文件名与内容类型
///
/// 文件名已带认可扩展名时按扩展名定类型；否则按上游的
/// `content-type` 补扩展名，未知类型回退为 JPEG。
fn resolve_download_name(remote_name: &str, content_type: &str) -> (String, &'static str) {
    let lower = remote_name.to_ascii_lowercase();
    let has_extension = VALID_EXTENSIONS.iter().any(|ext| lower.ends_with(ext));

    if has_extension {
        return (remote_name.to_string(), mime_for_extension(remote_name));
    }

    let (extension, mimetype) = EXTENSION_MAP
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map_or((".jpg", "image/jpeg"), |(mime, ext)| {
            (*ext, match *mime {
                "image/jpg" => "image/jpeg",
                other => other,
            })
        });

    let base_name = remote_name.split('.').next().unwrap_or(remote_name);
    (format!("{base_name}{extension}"), mimetype)
}

/// `GET /download/{*image_url}`
pub async fn download(
    State(state): State<AppState>,
    Path(image_url): Path<String>,
) -> Response {
    let Ok(remote) = Url::parse(&image_url) else {
        return (StatusCode::BAD_REQUEST, "Error downloading image").into_response();
    };
    if !matches!(remote.scheme(), "http" | "https") {
        return (StatusCode::BAD_REQUEST, "Error downloading image").into_response();
    }

    let response = match state
        .http
        .get(remote.clone())
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
    {
        Ok(response) => response,
        Err(e) => {
            warn!("下载远端图片失败 ({remote}): {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error downloading image")
                .into_response();
        }
    };

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let remote_name = remote
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("image")
        .to_string();

    let (filename, mimetype) = resolve_download_name(&remote_name, &content_type);

    let disposition = format!("attachment; filename=\"{filename}\"");
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mimetype));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // 响应体直接流式转发，成功与失败路径都不持有整个文件
    let body = Body::from_stream(response.bytes_stream());
    (headers, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_recognized_extension() {
        let (name, mime) = resolve_download_name("photo.png", "image/jpeg");
        assert_eq!(name, "photo.png");
        assert_eq!(mime, "image/png");
    }

    #[test]
    fn appends_extension_from_content_type() {
        let (name, mime) = resolve_download_name("abc123", "image/webp");
        assert_eq!(name, "abc123.webp");
        assert_eq!(mime, "image/webp");
    }

    #[test]
    fn unknown_content_type_defaults_to_jpeg() {
        let (name, mime) = resolve_download_name("abc123", "application/octet-stream");
        assert_eq!(name, "abc123.jpg");
        assert_eq!(mime, "image/jpeg");
    }

    #[test]
    fn strips_bogus_extension_before_appending() {
        let (name, mime) = resolve_download_name("file.bin", "image/png");
        assert_eq!(name, "file.png");
        assert_eq!(mime, "image/png");
    }
}
