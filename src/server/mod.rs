//! # HTTP 服务模块
//!
//! 路由组织、全局访问筛查中间件与各端点处理器

pub mod app;
pub mod handlers;
pub mod middleware;

pub use app::{AppState, build_router, build_state, run_server};
