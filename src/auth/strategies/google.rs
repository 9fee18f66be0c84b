//! # Google 认证策略

use async_trait::async_trait;
use serde_json::Value;

use super::{AuthStrategy, IdentityClaims, StrategyEndpoints};
use crate::error::AuthFlowError;

/// Google OAuth2 策略
#[derive(Debug, Clone, Copy)]
pub struct GoogleStrategy;

#[async_trait]
impl AuthStrategy for GoogleStrategy {
    fn name(&self) -> &'static str {
        "google-oauth2"
    }

    fn authorize_endpoint(&self) -> &'static str {
        "https://accounts.google.com/o/oauth2/v2/auth"
    }

    fn token_endpoint(&self) -> &'static str {
        "https://oauth2.googleapis.com/token"
    }

    fn userinfo_endpoint(&self) -> &'static str {
        "https://www.googleapis.com/oauth2/v2/userinfo"
    }

    fn default_scopes(&self) -> &'static [&'static str] {
        &["openid", "email", "profile"]
    }

    async fn fetch_identity(
        &self,
        http: &reqwest::Client,
        endpoints: &StrategyEndpoints,
        access_token: &str,
    ) -> Result<IdentityClaims, AuthFlowError> {
        let response = http
            .get(endpoints.userinfo.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                AuthFlowError::IdentityFetchFailed(format!("userinfo request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthFlowError::IdentityFetchFailed(format!(
                "userinfo endpoint returned {status}"
            )));
        }

        let raw: Value = response.json().await.map_err(|e| {
            AuthFlowError::IdentityFetchFailed(format!("userinfo response not JSON: {e}"))
        })?;

        // v2 userinfo 返回 id；OpenID 形态返回 sub
        let subject = raw
            .get("id")
            .or_else(|| raw.get("sub"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AuthFlowError::IdentityFetchFailed(
                    "userinfo response has no stable subject".to_string(),
                )
            })?
            .to_string();

        Ok(IdentityClaims {
            subject,
            email: raw.get("email").and_then(Value::as_str).map(str::to_string),
            display_name: raw.get("name").and_then(Value::as_str).map(str::to_string),
            raw,
        })
    }
}
