//! # 应用配置结构定义

use serde::{Deserialize, Serialize};

/// 应用主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 管理端凭证配置
    pub admin: AdminConfig,
    /// 防滥用配置
    pub security: SecurityConfig,
    /// 上游服务商配置
    pub providers: ProvidersConfig,
    /// 上传中转配置
    pub upload: UploadConfig,
    /// 密钥签发服务配置
    pub key_service: KeyServiceConfig,
    /// Telegram 通知配置（缺省时禁用通知）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 静态资源目录
    pub static_dir: String,
    /// 可信代理转发头，用于解析真实客户端IP。
    /// 仅在部署于对应代理之后时可信；直连部署下该头可被伪造。
    pub trusted_proxy_header: String,
    /// 免检网段（CIDR），默认仅本机回环
    pub exempt_networks: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 1218,
            static_dir: "static".to_string(),
            trusted_proxy_header: "CF-Connecting-IP".to_string(),
            exempt_networks: vec!["127.0.0.1/32".to_string(), "::1/128".to_string()],
        }
    }
}

/// 管理端凭证配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Basic Auth 用户名
    pub username: String,
    /// Basic Auth 密码
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "change-me".to_string(),
        }
    }
}

/// 防滥用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// 单IP窗口内允许的请求数
    pub rate_limit: u32,
    /// 速率窗口时长（秒）
    pub rate_limit_window_secs: u64,
    /// 上游 429 触发的冷却时长（秒）
    pub cooldown_secs: u64,
    /// 表单提交耗时下限（秒），低于该值按自动化处理
    pub min_submit_seconds: f64,
    /// 手工封禁列表文件路径
    pub blocklist_file: String,
    /// IP信誉查询配置
    pub reputation: ReputationConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            rate_limit: 3,
            rate_limit_window_secs: 60,
            cooldown_secs: 300,
            min_submit_seconds: 2.0,
            blocklist_file: "blocked_ips.txt".to_string(),
            reputation: ReputationConfig::default(),
        }
    }
}

/// IP信誉查询配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// 查询服务基础地址
    pub base_url: String,
    /// 判定结果缓存时长（秒）
    pub ttl_secs: u64,
    /// 单次查询超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.ipquery.io".to_string(),
            ttl_secs: 3600,
            timeout_secs: 5,
        }
    }
}

/// 上游服务商配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// infip 上游（standard / uncensored 档位）
    pub infip: ProviderEndpointConfig,
    /// together 上游（multi-variant 档位）
    pub together: ProviderEndpointConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            infip: ProviderEndpointConfig {
                base_url: "https://api.infip.pro".to_string(),
                ..ProviderEndpointConfig::default()
            },
            together: ProviderEndpointConfig {
                base_url: "https://api.together.xyz".to_string(),
                ..ProviderEndpointConfig::default()
            },
        }
    }
}

/// 单个上游端点配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpointConfig {
    /// API 基础地址
    pub base_url: String,
    /// 鉴权密钥（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for ProviderEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

/// 上传中转配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// 对象存储上传地址
    pub base_url: String,
    /// 鉴权密钥（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// 单文件大小上限（字节）
    pub max_file_size_bytes: usize,
    /// 上传超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_url: "https://upload.snapzion.com/api/public-upload".to_string(),
            api_key: None,
            max_file_size_bytes: 10 * 1024 * 1024,
            timeout_secs: 30,
        }
    }
}

/// 密钥签发服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyServiceConfig {
    /// 内部服务地址
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for KeyServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1217".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Telegram 通知配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot Token
    pub bot_token: String,
    /// 目标群组ID
    pub group_id: String,
    /// Bot API 基础地址
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

impl AppConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("无效的服务器端口: 0".to_string());
        }

        if self.security.rate_limit == 0 {
            return Err("security.rate_limit 必须大于 0".to_string());
        }
        if self.security.rate_limit_window_secs == 0 {
            return Err("security.rate_limit_window_secs 必须大于 0".to_string());
        }
        if self.security.cooldown_secs == 0 {
            return Err("security.cooldown_secs 必须大于 0".to_string());
        }
        if self.security.blocklist_file.is_empty() {
            return Err("security.blocklist_file 不能为空".to_string());
        }

        if self.server.trusted_proxy_header.is_empty() {
            return Err("server.trusted_proxy_header 不能为空".to_string());
        }
        for network in &self.server.exempt_networks {
            network
                .parse::<ipnetwork::IpNetwork>()
                .map_err(|e| format!("无效的免检网段 '{network}': {e}"))?;
        }

        if self.admin.username.is_empty() || self.admin.password.is_empty() {
            return Err("admin 凭证不能为空".to_string());
        }

        if self.upload.max_file_size_bytes == 0 {
            return Err("upload.max_file_size_bytes 必须大于 0".to_string());
        }

        if let Some(telegram) = &self.telegram {
            if telegram.bot_token.is_empty() || telegram.group_id.is_empty() {
                return Err("telegram 配置需要同时提供 bot_token 与 group_id".to_string());
            }
        }

        Ok(())
    }
}
