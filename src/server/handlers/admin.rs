//! # 封禁管理端点
//!
//! `/block` 表单页与封禁/解封操作，均在 Basic Auth 之后。

use axum::{
    extract::{Form, State},
    response::Html,
};
use serde::Deserialize;
use tracing::info;

use crate::server::app::AppState;

/// 封禁/解封表单
#[derive(Debug, Deserialize)]
pub struct BlockForm {
    /// 目标客户端标识
    pub ip: String,
}

/// 渲染管理页
fn render_page(message: &str, blocked_count: usize) -> Html<String> {
    let notice = if message.is_empty() {
        String::new()
    } else {
        format!("<p><strong>{message}</strong></p>")
    };
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>IP Block Management</title></head>\n<body>\n\
         <h1>IP Block Management</h1>\n{notice}\
         <p>Currently blocked: {blocked_count}</p>\n\
         <form method=\"post\" action=\"/block\">\n\
         <label>IP address: <input type=\"text\" name=\"ip\"></label>\n\
         <button type=\"submit\">Block</button>\n</form>\n\
         <form method=\"post\" action=\"/unblock\">\n\
         <label>IP address: <input type=\"text\" name=\"ip\"></label>\n\
         <button type=\"submit\">Unblock</button>\n</form>\n</body>\n</html>"
    ))
}

/// `GET /block`
pub async fn block_page(State(state): State<AppState>) -> Html<String> {
    render_page("", state.blocklist.len())
}

/// `POST /block`
pub async fn block_ip(
    State(state): State<AppState>,
    Form(form): Form<BlockForm>,
) -> Html<String> {
    let ip = form.ip.trim();
    let message = if ip.is_empty() {
        String::new()
    } else {
        state.blocklist.block(ip);
        info!("管理操作: 封禁 {ip}");
        format!("Successfully blocked IP: {ip}")
    };
    render_page(&message, state.blocklist.len())
}

/// `POST /unblock`
pub async fn unblock_ip(
    State(state): State<AppState>,
    Form(form): Form<BlockForm>,
) -> Html<String> {
    let ip = form.ip.trim();
    let message = if ip.is_empty() {
        String::new()
    } else if state.blocklist.unblock(ip) {
        info!("管理操作: 解封 {ip}");
        format!("Successfully unblocked IP: {ip}")
    } else {
        format!("IP {ip} was not found in the block list.")
    };
    render_page(&message, state.blocklist.len())
}
