//! # 策略专属配置
//!
//! 每个 OAuth 提供商的 client id/secret/scope 从环境变量读取，
//! 端点覆盖项仅用于测试与私有化部署。

use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use crate::error::{GatewayError, Result};

/// 单个策略的配置
#[derive(Debug, Clone)]
pub struct StrategySettings {
    pub client_id: String,
    pub client_secret: String,
    /// 为空时使用策略自身的默认 scope
    pub scopes: Vec<String>,
    /// 端点覆盖项；缺省使用策略内置端点
    pub authorize_url: Option<Url>,
    pub token_url: Option<Url>,
    pub userinfo_url: Option<Url>,
}

/// 策略配置来源
///
/// init 工厂通过该间接层取得配置，测试可注入固定值。
pub type SettingsFn = Arc<dyn Fn() -> Result<StrategySettings> + Send + Sync>;

/// 从环境变量快照加载策略配置（纯函数）
///
/// 必填项缺失是致命配置错误，在启动阶段立即暴露。
pub fn load(prefix: &str, vars: &HashMap<String, String>) -> Result<StrategySettings> {
    let client_id = required(prefix, "CLIENT_ID", vars)?;
    let client_secret = required(prefix, "CLIENT_SECRET", vars)?;

    let scopes = vars
        .get(&format!("{prefix}_SCOPES"))
        .map(|raw| raw.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    Ok(StrategySettings {
        client_id,
        client_secret,
        scopes,
        authorize_url: optional_url(prefix, "AUTHORIZE_URL", vars)?,
        token_url: optional_url(prefix, "TOKEN_URL", vars)?,
        userinfo_url: optional_url(prefix, "USERINFO_URL", vars)?,
    })
}

/// 构建从进程环境读取的配置来源
pub fn from_env(prefix: &'static str) -> SettingsFn {
    Arc::new(move || {
        let vars: HashMap<String, String> = std::env::vars().collect();
        load(prefix, &vars)
    })
}

/// 构建返回固定配置的来源（测试与嵌入场景）
pub fn fixed(settings: StrategySettings) -> SettingsFn {
    Arc::new(move || Ok(settings.clone()))
}

fn required(prefix: &str, name: &str, vars: &HashMap<String, String>) -> Result<String> {
    let key = format!("{prefix}_{name}");
    vars.get(&key)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or_else(|| GatewayError::config(format!("缺少必需的环境变量: {key}")))
}

fn optional_url(prefix: &str, name: &str, vars: &HashMap<String, String>) -> Result<Option<Url>> {
    let key = format!("{prefix}_{name}");
    match vars.get(&key) {
        None => Ok(None),
        Some(raw) => Url::parse(raw)
            .map(Some)
            .map_err(|e| {
                GatewayError::config_with_source(format!("环境变量 {key} 不是合法URL: {raw}"), e)
            }),
    }
}
