//! # GitHub 认证策略

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::Value;

use super::{AuthStrategy, IdentityClaims, StrategyEndpoints};
use crate::error::AuthFlowError;

/// GitHub OAuth2 策略
#[derive(Debug, Clone, Copy)]
pub struct GitHubStrategy;

#[async_trait]
impl AuthStrategy for GitHubStrategy {
    fn name(&self) -> &'static str {
        "github-oauth2"
    }

    fn authorize_endpoint(&self) -> &'static str {
        "https://github.com/login/oauth/authorize"
    }

    fn token_endpoint(&self) -> &'static str {
        "https://github.com/login/oauth/access_token"
    }

    fn userinfo_endpoint(&self) -> &'static str {
        "https://api.github.com/user"
    }

    fn default_scopes(&self) -> &'static [&'static str] {
        &["read:user", "user:email"]
    }

    async fn fetch_identity(
        &self,
        http: &reqwest::Client,
        endpoints: &StrategyEndpoints,
        access_token: &str,
    ) -> Result<IdentityClaims, AuthFlowError> {
        // GitHub API 要求显式 User-Agent
        let response = http
            .get(endpoints.userinfo.clone())
            .bearer_auth(access_token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "auth-gateway")
            .send()
            .await
            .map_err(|e| {
                AuthFlowError::IdentityFetchFailed(format!("user request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthFlowError::IdentityFetchFailed(format!(
                "user endpoint returned {status}"
            )));
        }

        let raw: Value = response.json().await.map_err(|e| {
            AuthFlowError::IdentityFetchFailed(format!("user response not JSON: {e}"))
        })?;

        // GitHub 的数字 id 是稳定主体标识，login 只是展示名
        let subject = match raw.get("id") {
            Some(Value::Number(id)) => id.to_string(),
            Some(Value::String(id)) => id.clone(),
            _ => {
                return Err(AuthFlowError::IdentityFetchFailed(
                    "user response has no stable subject".to_string(),
                ));
            }
        };

        Ok(IdentityClaims {
            subject,
            email: raw.get("email").and_then(Value::as_str).map(str::to_string),
            display_name: raw
                .get("login")
                .and_then(Value::as_str)
                .map(str::to_string),
            raw,
        })
    }
}
