//! # 认证策略注册表
//!
//! 以名字索引的策略插件表。提供商声明其依赖的策略名；
//! 启动时解析失败是声明式的类型化错误，而不是请求处理深处的崩溃。

mod github;
mod google;

pub use github::GitHubStrategy;
pub use google::GoogleStrategy;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;
use url::Url;

use crate::auth::settings::StrategySettings;
use crate::error::{AuthFlowError, GatewayError, Result};

/// 代码交换返回的令牌集合
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// 策略从外部身份系统取回的身份声明
#[derive(Debug, Clone)]
pub struct IdentityClaims {
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub raw: Value,
}

/// 初始化时确定的有效端点集合
///
/// 覆盖项或策略内置端点，启动时解析完毕，请求路径上不再解析URL。
#[derive(Debug, Clone)]
pub struct StrategyEndpoints {
    pub authorize: Url,
    pub token: Url,
    pub userinfo: Url,
}

/// OAuth2 形态的认证策略
#[async_trait]
pub trait AuthStrategy: Send + Sync + fmt::Debug {
    /// 策略依赖名，注册表键
    fn name(&self) -> &'static str;

    fn authorize_endpoint(&self) -> &'static str;

    fn token_endpoint(&self) -> &'static str;

    fn userinfo_endpoint(&self) -> &'static str;

    fn default_scopes(&self) -> &'static [&'static str];

    /// 解析有效端点：配置覆盖项优先，其余用内置端点
    fn resolve_endpoints(&self, settings: &StrategySettings) -> Result<StrategyEndpoints> {
        Ok(StrategyEndpoints {
            authorize: match &settings.authorize_url {
                Some(url) => url.clone(),
                None => parse_builtin(self.name(), self.authorize_endpoint())?,
            },
            token: match &settings.token_url {
                Some(url) => url.clone(),
                None => parse_builtin(self.name(), self.token_endpoint())?,
            },
            userinfo: match &settings.userinfo_url {
                Some(url) => url.clone(),
                None => parse_builtin(self.name(), self.userinfo_endpoint())?,
            },
        })
    }

    /// 构建授权跳转地址
    fn authorize_url(
        &self,
        endpoints: &StrategyEndpoints,
        settings: &StrategySettings,
        callback_url: &Url,
        state: &str,
        scopes: &BTreeSet<String>,
    ) -> Url {
        let mut url = endpoints.authorize.clone();
        let scope = scopes.iter().cloned().collect::<Vec<_>>().join(" ");
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("response_type", "code");
            pairs.append_pair("client_id", &settings.client_id);
            pairs.append_pair("redirect_uri", callback_url.as_str());
            pairs.append_pair("state", state);
            if !scope.is_empty() {
                pairs.append_pair("scope", &scope);
            }
        }
        url
    }

    /// 使用授权码交换访问令牌
    async fn exchange_code(
        &self,
        http: &reqwest::Client,
        endpoints: &StrategyEndpoints,
        settings: &StrategySettings,
        callback_url: &Url,
        code: &str,
    ) -> std::result::Result<TokenSet, AuthFlowError> {
        let params: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", callback_url.as_str()),
            ("client_id", &settings.client_id),
            ("client_secret", &settings.client_secret),
        ];

        let response = http
            .post(endpoints.token.clone())
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthFlowError::ExchangeFailed(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthFlowError::ExchangeFailed(format!("token response unreadable: {e}")))?;

        if !status.is_success() {
            return Err(AuthFlowError::ExchangeFailed(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| AuthFlowError::ExchangeFailed(format!("token response not JSON: {e}")))?;
        parse_token_set(&json)
    }

    /// 取回外部身份（各策略的声明格式不同）
    async fn fetch_identity(
        &self,
        http: &reqwest::Client,
        endpoints: &StrategyEndpoints,
        access_token: &str,
    ) -> std::result::Result<IdentityClaims, AuthFlowError>;
}

/// 解析令牌响应
pub(crate) fn parse_token_set(response: &Value) -> std::result::Result<TokenSet, AuthFlowError> {
    let access_token = response
        .get("access_token")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AuthFlowError::ExchangeFailed("token response is missing access_token".to_string())
        })?
        .to_string();

    Ok(TokenSet {
        access_token,
        token_type: response
            .get("token_type")
            .and_then(Value::as_str)
            .unwrap_or("Bearer")
            .to_string(),
        expires_in: response.get("expires_in").and_then(Value::as_i64),
        refresh_token: response
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(str::to_string),
        scope: response
            .get("scope")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn parse_builtin(strategy: &str, endpoint: &str) -> Result<Url> {
    Url::parse(endpoint).map_err(|e| {
        GatewayError::config_with_source(format!("策略 {strategy} 的内置端点无效: {endpoint}"), e)
    })
}

static STRATEGIES: LazyLock<HashMap<&'static str, Arc<dyn AuthStrategy>>> = LazyLock::new(|| {
    let mut map: HashMap<&'static str, Arc<dyn AuthStrategy>> = HashMap::new();
    map.insert(GoogleStrategy.name(), Arc::new(GoogleStrategy));
    map.insert(GitHubStrategy.name(), Arc::new(GitHubStrategy));
    map
});

/// 按名字解析策略；不存在返回 `None`，由调用方升级为类型化错误
pub fn resolve_strategy(name: &str) -> Option<Arc<dyn AuthStrategy>> {
    STRATEGIES.get(name).cloned()
}
