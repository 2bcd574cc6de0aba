//! # 生成结果通知
//!
//! 成功的生成结果异步推送到 Telegram 群组。有界队列 + 单消费任务，
//! 发送失败进入重试队列，最多重试 3 次、每次间隔 30 秒。
//! 入队永不阻塞 API 响应，队列满时丢弃并记录。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::TelegramConfig;
use crate::providers::{GenerationOutcome, GenerationRequest};

/// 单次发送的最大尝试次数（首次 + 重试）
const MAX_ATTEMPTS: u32 = 3;
/// 重试间隔
const RETRY_DELAY: Duration = Duration::from_secs(30);
/// 图片下载超时
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
/// Bot API 调用超时
const SEND_TIMEOUT: Duration = Duration::from_secs(60);

/// 一条待推送的生成通知
#[derive(Debug, Clone)]
pub struct GenerationNotice {
    /// 图片地址
    pub image_url: String,
    /// 附言（提示词 + 种子）
    pub caption: String,
    /// 生成所用模型
    pub model: String,
}

/// 从一次成功结果展开逐图通知
pub fn notices_for(request: &GenerationRequest, outcome: &GenerationOutcome) -> Vec<GenerationNotice> {
    outcome
        .image_urls
        .iter()
        .enumerate()
        .map(|(i, image_url)| {
            let mut caption = request.prompt.clone();
            if let Some(seed) = outcome.seeds_used.get(i) {
                caption.push_str(&format!("\n\nSeed: {seed}"));
            }
            GenerationNotice {
                image_url: image_url.clone(),
                caption,
                model: request.model.clone(),
            }
        })
        .collect()
}

/// 通知队列状态
#[derive(Debug, Clone, Copy)]
pub struct NotifierStatus {
    /// 发送队列深度
    pub send_queue_size: usize,
    /// 重试队列深度
    pub retry_queue_size: usize,
}

/// 通知器句柄；可廉价克隆进请求处理路径
#[derive(Clone)]
pub struct NotifierHandle {
    tx: mpsc::Sender<GenerationNotice>,
    send_depth: Arc<AtomicUsize>,
    retry_depth: Arc<AtomicUsize>,
}

impl NotifierHandle {
    /// 入队一条通知；队列满时丢弃
    pub fn notify(&self, notice: GenerationNotice) {
        match self.tx.try_send(notice) {
            Ok(()) => {
                self.send_depth.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => warn!("通知队列已满，丢弃一条通知: {e}"),
        }
    }

    /// 当前队列状态
    pub fn status(&self) -> NotifierStatus {
        NotifierStatus {
            send_queue_size: self.send_depth.load(Ordering::Relaxed),
            retry_queue_size: self.retry_depth.load(Ordering::Relaxed),
        }
    }
}

/// 启动通知器后台任务，返回入队句柄
pub fn spawn(client: reqwest::Client, config: TelegramConfig) -> NotifierHandle {
    let (tx, mut rx) = mpsc::channel::<GenerationNotice>(256);
    let (retry_tx, mut retry_rx) = mpsc::channel::<(GenerationNotice, u32)>(64);

    let send_depth = Arc::new(AtomicUsize::new(0));
    let retry_depth = Arc::new(AtomicUsize::new(0));

    // 主发送任务
    {
        let client = client.clone();
        let config = config.clone();
        let send_depth = Arc::clone(&send_depth);
        let retry_depth = Arc::clone(&retry_depth);
        let retry_tx = retry_tx.clone();
        tokio::spawn(async move {
            while let Some(notice) = rx.recv().await {
                send_depth.fetch_sub(1, Ordering::Relaxed);
                if send_photo(&client, &config, &notice).await {
                    continue;
                }
                if retry_tx.try_send((notice, 2)).is_ok() {
                    retry_depth.fetch_add(1, Ordering::Relaxed);
                } else {
                    warn!("重试队列已满，放弃一条通知");
                }
            }
        });
    }

    // 重试任务：每次尝试前等待固定间隔
    {
        let config = config.clone();
        let retry_depth = Arc::clone(&retry_depth);
        tokio::spawn(async move {
            while let Some((notice, attempt)) = retry_rx.recv().await {
                tokio::time::sleep(RETRY_DELAY).await;
                retry_depth.fetch_sub(1, Ordering::Relaxed);

                if send_photo(&client, &config, &notice).await {
                    continue;
                }
                if attempt < MAX_ATTEMPTS {
                    if retry_tx.try_send((notice, attempt + 1)).is_ok() {
                        retry_depth.fetch_add(1, Ordering::Relaxed);
                    }
                } else {
                    error!("通知重试次数耗尽，放弃: {}", notice.image_url);
                }
            }
        });
    }

    info!("Telegram 通知器已启动，目标群组 {}", config.group_id);
    NotifierHandle {
        tx,
        send_depth,
        retry_depth,
    }
}

/// 下载图片并调用 sendPhoto；任何失败都只返回 false，不上抛
async fn send_photo(
    client: &reqwest::Client,
    config: &TelegramConfig,
    notice: &GenerationNotice,
) -> bool {
    debug!("推送通知: {}", notice.image_url);

    let image = match client
        .get(&notice.image_url)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
    {
        Ok(response) => match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("读取通知图片失败: {e}");
                return false;
            }
        },
        Err(e) => {
            warn!("下载通知图片失败: {e}");
            return false;
        }
    };

    let caption = format!("{}\n\nSource: Web ({})", notice.caption, notice.model);
    let url = format!("{}/bot{}/sendPhoto", config.api_base, config.bot_token);

    let part = reqwest::multipart::Part::bytes(image.to_vec())
        .file_name("image.jpg")
        .mime_str("image/jpeg");
    let Ok(part) = part else {
        return false;
    };
    let form = reqwest::multipart::Form::new()
        .text("chat_id", config.group_id.clone())
        .text("caption", caption)
        .text("parse_mode", "HTML")
        .part("photo", part);

    match client
        .post(&url)
        .timeout(SEND_TIMEOUT)
        .multipart(form)
        .send()
        .await
    {
        Ok(response) => {
            let ok = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body.get("ok").and_then(serde_json::Value::as_bool))
                .unwrap_or(false);
            if !ok {
                warn!("Telegram API 返回失败");
            }
            ok
        }
        Err(e) => {
            warn!("调用 Telegram API 失败: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_pair_urls_with_seeds() {
        let request: GenerationRequest = serde_json::from_value(serde_json::json!({
            "prompt": "a cat",
            "model": "img3",
        }))
        .unwrap();
        let outcome = GenerationOutcome::from_images(
            vec!["https://cdn/a.png".to_string(), "https://cdn/b.png".to_string()],
            vec![42, 42],
        );

        let notices = notices_for(&request, &outcome);
        assert_eq!(notices.len(), 2);
        assert!(notices[0].caption.contains("a cat"));
        assert!(notices[0].caption.contains("Seed: 42"));
        assert_eq!(notices[1].image_url, "https://cdn/b.png");
        assert_eq!(notices[0].model, "img3");
    }
}
