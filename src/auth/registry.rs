//! # 提供商注册表
//!
//! 启动期构建一次的纯内存注册表，构建完成后只读；
//! 不支持运行时再注册。

use crate::auth::init::make_oauth_init;
use crate::auth::router::setup_oauth_router;
use crate::auth::settings;
use crate::auth::types::{ProviderConfig, ProviderType};
use crate::error::{GatewayError, Result};

/// 身份提供商注册表，保持注册顺序
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    entries: Vec<ProviderConfig>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个提供商
    ///
    /// slug 与类型重复都是配置错误，在启动阶段立即失败，
    /// 而不是等到第一个请求。
    pub fn register(&mut self, config: ProviderConfig) -> Result<()> {
        if self.entries.iter().any(|entry| entry.slug == config.slug) {
            return Err(GatewayError::route_collision(format!(
                "/auth/{}",
                config.slug
            )));
        }
        if self
            .entries
            .iter()
            .any(|entry| entry.provider_type == config.provider_type)
        {
            return Err(GatewayError::config(format!(
                "提供商类型重复注册: {}",
                config.provider_type.as_str()
            )));
        }
        self.entries.push(config);
        Ok(())
    }

    /// 按类型查找注册项
    #[must_use]
    pub fn get(&self, provider_type: &ProviderType) -> Option<&ProviderConfig> {
        self.entries
            .iter()
            .find(|entry| &entry.provider_type == provider_type)
    }

    /// 按注册顺序返回全部注册项
    #[must_use]
    pub fn all(&self) -> &[ProviderConfig] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 构建默认注册表：生成的服务器随附的 OAuth 提供商
pub fn default_registry() -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    registry.register(ProviderConfig {
        provider_type: ProviderType::Google,
        slug: "google".to_string(),
        init: make_oauth_init("google-oauth2", settings::from_env("GOOGLE")),
        setup_router: setup_oauth_router,
    })?;

    registry.register(ProviderConfig {
        provider_type: ProviderType::GitHub,
        slug: "github".to_string(),
        init: make_oauth_init("github-oauth2", settings::from_env("GITHUB")),
        setup_router: setup_oauth_router,
    })?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(provider_type: ProviderType, slug: &str) -> ProviderConfig {
        ProviderConfig {
            provider_type,
            slug: slug.to_string(),
            init: make_oauth_init("google-oauth2", settings::from_env("GOOGLE")),
            setup_router: setup_oauth_router,
        }
    }

    #[test]
    fn distinct_slugs_register_in_order() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(provider(ProviderType::Google, "google"))
            .unwrap();
        registry
            .register(provider(ProviderType::GitHub, "github"))
            .unwrap();

        let slugs: Vec<&str> = registry.all().iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["google", "github"]);
        assert!(registry.get(&ProviderType::GitHub).is_some());
        assert!(registry.get(&ProviderType::Email).is_none());
    }

    #[test]
    fn duplicate_slug_is_a_route_collision() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(provider(ProviderType::Google, "login"))
            .unwrap();
        let err = registry
            .register(provider(ProviderType::GitHub, "login"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::RouteCollision { .. }));
    }

    #[test]
    fn duplicate_provider_type_is_rejected() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(provider(ProviderType::Google, "google"))
            .unwrap();
        let err = registry
            .register(provider(ProviderType::Google, "google-2"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Config { .. }));
    }

    #[test]
    fn default_registry_exposes_google_and_github() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.all()[0].slug, "google");
        assert_eq!(registry.all()[1].slug, "github");
    }
}
