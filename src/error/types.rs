//! # 错误类型定义

use thiserror::Error;

use super::auth::AuthFlowError;
use super::operation::OperationError;
use super::ErrorCategory;

/// 应用主要错误类型
#[derive(Debug, Error)]
pub enum GatewayError {
    /// 配置相关错误
    #[error("配置错误: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 已注册的提供商缺少其声明的策略依赖
    #[error("缺少依赖: 提供商 {provider} 需要策略 {dependency}")]
    MissingDependency { provider: String, dependency: String },

    /// 两个提供商争夺同一路由命名空间
    #[error("路由冲突: {path}")]
    RouteCollision { path: String },

    /// 认证流程错误（请求级，可恢复）
    #[error("认证流程错误: {0}")]
    AuthFlow(#[from] AuthFlowError),

    /// 操作执行错误（请求级）
    #[error("操作执行错误: {0}")]
    Operation(#[from] OperationError),

    /// 服务器启动错误
    #[error("服务器启动错误: {message}")]
    ServerStart {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// IO相关错误
    #[error("IO错误: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// 系统内部错误
    #[error("内部错误: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 带上下文的错误包装
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<GatewayError>,
    },
}

impl GatewayError {
    /// 创建配置错误
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<anyhow::Error>,
    {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建缺少依赖错误
    pub fn missing_dependency<P, D>(provider: P, dependency: D) -> Self
    where
        P: Into<String>,
        D: Into<String>,
    {
        Self::MissingDependency {
            provider: provider.into(),
            dependency: dependency.into(),
        }
    }

    /// 创建路由冲突错误
    pub fn route_collision<S: Into<String>>(path: S) -> Self {
        Self::RouteCollision { path: path.into() }
    }

    /// 创建服务器启动错误
    pub fn server_start<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<anyhow::Error>,
    {
        Self::ServerStart {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建内部错误
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// 错误传播策略分类
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config { .. }
            | Self::MissingDependency { .. }
            | Self::RouteCollision { .. }
            | Self::ServerStart { .. }
            | Self::Io { .. } => ErrorCategory::Startup,
            Self::AuthFlow(_) | Self::Operation(_) => ErrorCategory::Request,
            Self::Internal { .. } => ErrorCategory::Request,
            Self::Context { source, .. } => source.category(),
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            message: source.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_errors_are_fatal() {
        assert_eq!(
            GatewayError::config("bad").category(),
            ErrorCategory::Startup
        );
        assert_eq!(
            GatewayError::missing_dependency("google", "google-oauth2").category(),
            ErrorCategory::Startup
        );
        assert_eq!(
            GatewayError::route_collision("/auth/google/login").category(),
            ErrorCategory::Startup
        );
    }

    #[test]
    fn flow_errors_stay_request_scoped() {
        let err: GatewayError = AuthFlowError::InvalidState("reused token".into()).into();
        assert_eq!(err.category(), ErrorCategory::Request);
    }

    #[test]
    fn missing_dependency_display_names_both_sides() {
        let err = GatewayError::missing_dependency("github", "github-oauth2");
        let text = err.to_string();
        assert!(text.contains("github"));
        assert!(text.contains("github-oauth2"));
    }
}
