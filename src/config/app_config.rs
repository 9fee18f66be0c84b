//! # 应用配置结构定义
//!
//! 分层解析：编译期默认值 < 环境覆盖层，逐字段合并与验证。

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::error::{GatewayError, Result};

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 3001;
/// 默认前端地址（开发环境）
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
/// 待定登录凭据的默认有效期（秒）
pub const DEFAULT_STATE_TTL_SECS: u64 = 900;

const DEV_DATABASE_URL: &str = "postgres://localhost:5432/gateway_dev";

/// 应用主配置结构
///
/// 启动时构建一次，进程生命周期内不可变；所有字段可被并发只读访问。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// 运行环境名（development / production）
    pub env: String,
    /// 监听端口
    pub port: u16,
    /// 数据库连接串（由外部持久层消费）
    pub database_url: String,
    /// 前端地址，必须是合法的绝对URL
    pub frontend_url: Url,
    /// 本服务对外基址，用于拼接回调URL
    pub server_url: Url,
    /// 待定登录凭据的有效期
    #[serde(skip)]
    pub state_ttl: Duration,
}

/// 环境覆盖层：仅包含显式覆盖的字段，缺省字段保留基础值
#[derive(Debug, Default)]
struct ConfigOverlay {
    port: Option<u16>,
    database_url: Option<String>,
    frontend_url: Option<Url>,
    server_url: Option<Url>,
    state_ttl: Option<Duration>,
}

/// 从环境变量快照解析配置
///
/// 纯函数：相同输入必然产生相同输出，重复解析结果一致。
pub fn resolve_from(vars: &HashMap<String, String>) -> Result<Config> {
    let env = vars
        .get("RUST_ENV")
        .map_or_else(|| "development".to_string(), Clone::clone);

    let overlay = build_overlay(&env, vars)?;
    merge(&env, overlay)
}

/// 构建环境覆盖层，逐字段验证
fn build_overlay(env: &str, vars: &HashMap<String, String>) -> Result<ConfigOverlay> {
    let mut overlay = ConfigOverlay::default();

    if let Some(raw) = vars.get("PORT") {
        let port = raw.parse::<u16>().map_err(|e| {
            GatewayError::config_with_source(format!("环境变量 PORT 不是合法端口号: {raw}"), e)
        })?;
        overlay.port = Some(port);
    }

    if let Some(raw) = vars.get("DATABASE_URL") {
        overlay.database_url = Some(raw.clone());
    } else if env == "production" {
        return Err(GatewayError::config(
            "production 环境必须设置 DATABASE_URL",
        ));
    }

    if let Some(raw) = vars.get("FRONTEND_URL") {
        overlay.frontend_url = Some(parse_absolute_url("FRONTEND_URL", raw)?);
    } else if env == "production" {
        return Err(GatewayError::config(
            "production 环境必须设置 FRONTEND_URL",
        ));
    }

    if let Some(raw) = vars.get("SERVER_URL") {
        overlay.server_url = Some(parse_absolute_url("SERVER_URL", raw)?);
    }

    if let Some(raw) = vars.get("AUTH_STATE_TTL_SECS") {
        let secs = raw.parse::<u64>().map_err(|e| {
            GatewayError::config_with_source(
                format!("环境变量 AUTH_STATE_TTL_SECS 不是合法秒数: {raw}"),
                e,
            )
        })?;
        overlay.state_ttl = Some(Duration::from_secs(secs));
    }

    Ok(overlay)
}

/// 合并基础值与覆盖层：覆盖层字段优先，缺省字段保留基础值
fn merge(env: &str, overlay: ConfigOverlay) -> Result<Config> {
    let port = overlay.port.unwrap_or(DEFAULT_PORT);

    let frontend_url = match overlay.frontend_url {
        Some(url) => url,
        // DEFAULT_FRONTEND_URL 是编译期常量，必然可解析
        None => Url::parse(DEFAULT_FRONTEND_URL)
            .map_err(|e| GatewayError::config_with_source("默认前端地址解析失败", e))?,
    };

    let server_url = match overlay.server_url {
        Some(url) => url,
        None => parse_absolute_url("SERVER_URL", &format!("http://localhost:{port}"))?,
    };

    Ok(Config {
        env: env.to_string(),
        port,
        database_url: overlay
            .database_url
            .unwrap_or_else(|| DEV_DATABASE_URL.to_string()),
        frontend_url,
        server_url,
        state_ttl: overlay
            .state_ttl
            .unwrap_or(Duration::from_secs(DEFAULT_STATE_TTL_SECS)),
    })
}

fn parse_absolute_url(name: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| {
        GatewayError::config_with_source(format!("环境变量 {name} 不是合法的绝对URL: {raw}"), e)
    })?;
    if !url.has_host() {
        return Err(GatewayError::config(format!(
            "环境变量 {name} 不是合法的绝对URL: {raw}"
        )));
    }
    Ok(url)
}
