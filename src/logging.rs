//! # 日志配置模块
//!
//! 提供统一的日志初始化，支持通过 `RUST_LOG` 环境变量覆盖默认过滤规则

use std::env;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 初始化日志系统
///
/// 默认级别为 `info`，应用自身模块提升到 `debug`；
/// `RUST_LOG` 存在时优先生效。
pub fn init_logging(log_level: Option<&String>) {
    let level = log_level.map_or("info", std::string::String::as_str);

    let default_filter = format!("{level},imagegen_proxy=debug,hyper=warn,reqwest=warn");

    let log_filter = env::var("RUST_LOG").unwrap_or(default_filter);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()))
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
