use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use url::Url;

use crate::auth::router::AuthContext;
use crate::auth::settings::StrategySettings;
use crate::auth::strategies::{AuthStrategy, StrategyEndpoints};
use crate::config::Config;
use crate::error::{GatewayError, Result};

/// 支持的身份提供商类型（封闭枚举）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderType {
    Google,
    GitHub,
    Email,
}

impl ProviderType {
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Google => "google",
            Self::GitHub => "github",
            Self::Email => "email",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::GitHub),
            "email" => Ok(Self::Email),
            other => Err(GatewayError::config(format!(
                "未知的身份提供商类型: {other}"
            ))),
        }
    }
}

impl FromStr for ProviderType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// 提供商初始化函数：注册项 + 全局配置 → 运行时描述符
///
/// 失败即致命：声明了无法满足的提供商的应用不得开始服务。
pub type InitFn = Arc<dyn Fn(&ProviderConfig, &Config) -> Result<ProviderDescriptor> + Send + Sync>;

/// 提供商路由装配函数：为单个提供商构建其子路由
pub type RouterFn = fn(Arc<ProviderRuntime>, AuthContext) -> Router;

/// 提供商注册项
///
/// 构建期静态定义；`slug` 在全部注册项中必须唯一（路由命名空间不变量）。
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub slug: String,
    pub init: InitFn,
    pub setup_router: RouterFn,
}

impl Clone for ProviderConfig {
    fn clone(&self) -> Self {
        Self {
            provider_type: self.provider_type.clone(),
            slug: self.slug.clone(),
            init: Arc::clone(&self.init),
            setup_router: self.setup_router,
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider_type", &self.provider_type)
            .field("slug", &self.slug)
            .finish_non_exhaustive()
    }
}

/// 提供商运行时描述符
///
/// 每个提供商在启动时初始化一次，此后只读。
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    /// 解析到的外部策略句柄
    pub strategy: Arc<dyn AuthStrategy>,
    /// 策略专属配置（client id/secret 等）
    pub settings: StrategySettings,
    /// 初始化时确定的有效端点集合
    pub endpoints: StrategyEndpoints,
    /// 回调路径（`/auth/<slug>/callback`）
    pub callback_path: String,
    /// 拼接 `server_url` 后的绝对回调地址
    pub callback_url: Url,
    /// 请求的授权范围
    pub scopes: BTreeSet<String>,
}

/// 装配进路由器的单提供商运行时
#[derive(Debug)]
pub struct ProviderRuntime {
    pub provider_type: ProviderType,
    pub slug: String,
    pub descriptor: ProviderDescriptor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_provider_types() {
        assert_eq!(ProviderType::parse("google").unwrap(), ProviderType::Google);
        assert_eq!(ProviderType::parse("github").unwrap(), ProviderType::GitHub);
        assert_eq!(ProviderType::parse("email").unwrap(), ProviderType::Email);
    }

    #[test]
    fn unknown_provider_type_is_rejected() {
        let err = ProviderType::parse("facebook").unwrap_err();
        assert!(matches!(err, GatewayError::Config { .. }));
    }

    #[test]
    fn as_str_round_trips() {
        for name in ["google", "github", "email"] {
            assert_eq!(ProviderType::parse(name).unwrap().as_str(), name);
        }
    }
}
