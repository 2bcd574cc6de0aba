//! # 配置管理模块
//!
//! 处理应用配置加载、验证和管理

mod app_config;

pub use app_config::{
    AdminConfig, AppConfig, KeyServiceConfig, ProviderEndpointConfig, ProvidersConfig,
    ReputationConfig, SecurityConfig, ServerConfig, TelegramConfig, UploadConfig,
};

use std::env;
use std::path::Path;

use tracing::warn;

/// 配置文件路径环境变量
const CONFIG_PATH_ENV: &str = "IMGPROXY_CONFIG_PATH";

/// 加载配置文件
///
/// 路径优先级：`IMGPROXY_CONFIG_PATH` > `config/config.{RUST_ENV}.toml`。
/// 文件不存在时回退到内置默认值（仅记录警告），便于本地快速启动。
pub fn load_config() -> crate::error::Result<AppConfig> {
    load_config_from(None)
}

/// 按显式路径加载配置；`None` 时按环境变量约定解析路径
pub fn load_config_from(path_override: Option<&str>) -> crate::error::Result<AppConfig> {
    let config_file = path_override.map_or_else(
        || {
            env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| {
                let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
                format!("config/config.{env}.toml")
            })
        },
        std::string::ToString::to_string,
    );

    let mut config = if Path::new(&config_file).exists() {
        let config_content = std::fs::read_to_string(&config_file).map_err(|e| {
            crate::error::ProxyError::config_with_source(
                format!("读取配置文件失败: {config_file}"),
                e,
            )
        })?;
        toml::from_str(&config_content)?
    } else {
        warn!("配置文件不存在: {config_file}，使用内置默认配置");
        AppConfig::default()
    };

    apply_env_overrides(&mut config);

    // 验证配置的有效性
    config.validate().map_err(crate::error::ProxyError::config)?;

    Ok(config)
}

/// 从环境变量覆盖敏感配置项
fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(key) = env::var("IMGPROXY_TOGETHER_API_KEY") {
        config.providers.together.api_key = Some(key);
    }
    if let Ok(key) = env::var("IMGPROXY_UPLOAD_API_KEY") {
        config.upload.api_key = Some(key);
    }
    if let Ok(password) = env::var("IMGPROXY_ADMIN_PASSWORD") {
        config.admin.password = password;
    }
    if let Ok(token) = env::var("IMGPROXY_TELEGRAM_BOT_TOKEN") {
        if let Some(telegram) = config.telegram.as_mut() {
            telegram.bot_token = token;
        }
    }
}
