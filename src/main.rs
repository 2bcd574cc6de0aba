//! # Image Generation Proxy 主程序
//!
//! 防滥用图像生成代理服务

use clap::Parser;
use tracing::{error, info};

use imagegen_proxy::{Result, config, logging, server};

/// 命令行参数
#[derive(Debug, Parser)]
#[command(name = "imagegen-proxy", about = "Anti-abuse image generation proxy")]
struct Cli {
    /// 配置文件路径（覆盖 IMGPROXY_CONFIG_PATH）
    #[arg(long)]
    config: Option<String>,

    /// 监听端口（覆盖配置文件）
    #[arg(long)]
    port: Option<u16>,

    /// 日志级别（error / warn / info / debug / trace）
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统
    logging::init_logging(cli.log_level.as_ref());

    let mut config = config::load_config_from(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    info!(
        "配置加载完成: 监听 {}:{}，封禁文件 {}",
        config.server.host, config.server.port, config.security.blocklist_file
    );

    if let Err(e) = server::run_server(config).await {
        error!("服务启动失败: {e:?}");
        std::process::exit(1);
    }

    info!("服务正常关闭");
    Ok(())
}
