//! # 提供商初始化
//!
//! 通用 OAuth init 工厂：按策略名解析外部依赖、加载策略配置、
//! 计算回调地址并产出运行时描述符。每个提供商在启动时初始化一次。

use std::collections::BTreeSet;

use tracing::info;

use crate::auth::registry::ProviderRegistry;
use crate::auth::settings::SettingsFn;
use crate::auth::strategies::{self, AuthStrategy};
use crate::auth::types::{InitFn, ProviderConfig, ProviderDescriptor};
use crate::config::Config;
use crate::error::{GatewayError, Result};

/// 构建 OAuth 提供商的 init 闭包
///
/// 参数化于：策略依赖名、策略配置来源。解析不到依赖时返回
/// `MissingDependency` —— 声明了无法满足的提供商的应用不得启动。
pub fn make_oauth_init(strategy_name: &'static str, settings_source: SettingsFn) -> InitFn {
    std::sync::Arc::new(move |provider: &ProviderConfig, config: &Config| {
        let strategy = strategies::resolve_strategy(strategy_name).ok_or_else(|| {
            GatewayError::missing_dependency(provider.slug.clone(), strategy_name)
        })?;

        let settings = settings_source()?;
        let endpoints = strategy.resolve_endpoints(&settings)?;

        let callback_path = format!("/auth/{}/callback", provider.slug);
        let callback_url = config.server_url.join(&callback_path).map_err(|e| {
            GatewayError::config_with_source(
                format!("无法基于 SERVER_URL 拼接回调地址: {callback_path}"),
                e,
            )
        })?;

        let scopes: BTreeSet<String> = if settings.scopes.is_empty() {
            strategy
                .default_scopes()
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        } else {
            settings.scopes.iter().cloned().collect()
        };

        Ok(ProviderDescriptor {
            strategy,
            settings,
            endpoints,
            callback_path,
            callback_url,
            scopes,
        })
    })
}

/// 按注册顺序初始化全部提供商
///
/// 任一提供商初始化失败即中止整个启动；绝不暴露部分认证面。
pub fn initialize_providers(
    registry: &ProviderRegistry,
    config: &Config,
) -> Result<Vec<(ProviderConfig, ProviderDescriptor)>> {
    let mut initialized = Vec::with_capacity(registry.len());

    for provider in registry.all() {
        let descriptor = (provider.init)(provider, config)?;
        info!(
            provider = %provider.slug,
            strategy = descriptor.strategy.name(),
            callback = %descriptor.callback_url,
            "identity provider initialized"
        );
        initialized.push((provider.clone(), descriptor));
    }

    Ok(initialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::router::setup_oauth_router;
    use crate::auth::settings::{self, StrategySettings};
    use crate::auth::types::ProviderType;
    use std::collections::HashMap;

    fn test_config() -> Config {
        crate::config::resolve_from(&HashMap::new()).unwrap()
    }

    fn stub_settings() -> StrategySettings {
        StrategySettings {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            scopes: vec![],
            authorize_url: None,
            token_url: None,
            userinfo_url: None,
        }
    }

    fn provider(slug: &str, strategy: &'static str) -> ProviderConfig {
        ProviderConfig {
            provider_type: ProviderType::Google,
            slug: slug.to_string(),
            init: make_oauth_init(strategy, settings::fixed(stub_settings())),
            setup_router: setup_oauth_router,
        }
    }

    #[test]
    fn init_computes_callback_url_from_server_base() {
        let config = test_config();
        let provider = provider("google", "google-oauth2");
        let descriptor = (provider.init)(&provider, &config).unwrap();

        assert_eq!(descriptor.callback_path, "/auth/google/callback");
        assert_eq!(
            descriptor.callback_url.as_str(),
            "http://localhost:3001/auth/google/callback"
        );
        // 未覆盖 scope 时使用策略默认值
        assert!(descriptor.scopes.contains("email"));
    }

    #[test]
    fn missing_strategy_dependency_is_fatal() {
        let config = test_config();
        let provider = provider("google", "passport-google-oauth20");
        let err = (provider.init)(&provider, &config).unwrap_err();
        assert!(matches!(err, GatewayError::MissingDependency { .. }));
    }

    #[test]
    fn first_failure_aborts_the_whole_startup() {
        let config = test_config();
        let mut registry = ProviderRegistry::new();
        registry.register(provider("google", "google-oauth2")).unwrap();
        registry
            .register(ProviderConfig {
                provider_type: ProviderType::GitHub,
                slug: "github".to_string(),
                init: make_oauth_init("no-such-strategy", settings::fixed(stub_settings())),
                setup_router: setup_oauth_router,
            })
            .unwrap();

        let err = initialize_providers(&registry, &config).unwrap_err();
        assert!(matches!(err, GatewayError::MissingDependency { .. }));
    }

    #[test]
    fn explicit_scopes_override_strategy_defaults() {
        let config = test_config();
        let mut settings = stub_settings();
        settings.scopes = vec!["custom.scope".to_string()];
        let provider = ProviderConfig {
            provider_type: ProviderType::Google,
            slug: "google".to_string(),
            init: make_oauth_init("google-oauth2", settings::fixed(settings)),
            setup_router: setup_oauth_router,
        };
        let descriptor = (provider.init)(&provider, &config).unwrap();
        assert_eq!(descriptor.scopes.len(), 1);
        assert!(descriptor.scopes.contains("custom.scope"));
    }
}
