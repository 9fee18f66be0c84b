//! # 认证路由装配
//!
//! 把每个已初始化提供商的 login/callback/failure 端点挂载到
//! `/auth/<slug>/` 命名空间下，并驱动单次登录尝试的状态机：
//! Unauthenticated → Redirected → Pending → Authenticated | Failed。

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::identity::{IdentityStore, ProviderIdentity, SessionStore, SessionToken};
use crate::auth::session::LoginAttemptStore;
use crate::auth::strategies::AuthStrategy;
use crate::auth::types::{ProviderConfig, ProviderDescriptor, ProviderRuntime};
use crate::config::Config;
use crate::error::{AuthFlowError, GatewayError, Result};

/// 认证面共享的协作对象
///
/// 全部字段在启动后只读；跨请求并发访问无须加锁。
#[derive(Clone)]
pub struct AuthContext {
    pub config: Arc<Config>,
    pub attempts: Arc<LoginAttemptStore>,
    pub identities: Arc<dyn IdentityStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub http: reqwest::Client,
}

impl AuthContext {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        attempts: Arc<LoginAttemptStore>,
        identities: Arc<dyn IdentityStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            attempts,
            identities,
            sessions,
            http: reqwest::Client::new(),
        }
    }
}

/// 单提供商路由状态
#[derive(Clone)]
pub struct ProviderState {
    pub runtime: Arc<ProviderRuntime>,
    pub ctx: AuthContext,
}

/// 装配认证路由器
///
/// 路径冲突在路由器暴露之前检出并作为致命错误返回。
pub fn compose(
    initialized: Vec<(ProviderConfig, ProviderDescriptor)>,
    ctx: AuthContext,
) -> Result<Router> {
    let mut claimed: HashSet<String> = HashSet::new();
    let mut router = Router::new();

    for (provider, descriptor) in initialized {
        for endpoint in ["login", "callback", "failure"] {
            let path = format!("/auth/{}/{endpoint}", provider.slug);
            if !claimed.insert(path.clone()) {
                return Err(GatewayError::route_collision(path));
            }
        }

        let runtime = Arc::new(ProviderRuntime {
            provider_type: provider.provider_type.clone(),
            slug: provider.slug.clone(),
            descriptor,
        });
        let sub = (provider.setup_router)(Arc::clone(&runtime), ctx.clone());
        router = router.nest(&format!("/auth/{}", provider.slug), sub);
        info!(provider = %provider.slug, "mounted auth routes");
    }

    Ok(router)
}

/// OAuth 提供商的默认路由装配
pub fn setup_oauth_router(runtime: Arc<ProviderRuntime>, ctx: AuthContext) -> Router {
    let state = ProviderState { runtime, ctx };
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/failure", get(failure).post(failure))
        .with_state(state)
}

/// 回调查询参数
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// 失败端点查询参数
#[derive(Debug, Deserialize)]
pub struct FailureParams {
    pub reason: Option<String>,
}

/// 登录端点：签发 state 令牌并跳转到提供商授权地址
async fn login(State(state): State<ProviderState>) -> Response {
    let descriptor = &state.runtime.descriptor;
    let token = state.ctx.attempts.issue(&state.runtime.slug);
    let url = descriptor.strategy.authorize_url(
        &descriptor.endpoints,
        &descriptor.settings,
        &descriptor.callback_url,
        &token,
        &descriptor.scopes,
    );
    debug!(provider = %state.runtime.slug, "redirecting login attempt to provider");
    found(url.as_str())
}

/// 回调端点：验证 state、交换授权码、建立会话
async fn callback(State(state): State<ProviderState>, Query(params): Query<CallbackParams>) -> Response {
    match run_callback(&state, params).await {
        Ok(session) => {
            let mut target = state.ctx.config.frontend_url.clone();
            target.set_fragment(Some(&format!("token={}", session.token)));
            found(target.as_str())
        }
        Err(err) => {
            warn!(provider = %state.runtime.slug, error = %err, "login attempt failed");
            found(&format!(
                "/auth/{}/failure?reason={}",
                state.runtime.slug,
                err.reason_code()
            ))
        }
    }
}

/// 回调状态机主体
///
/// 任何一步失败都终止本次尝试；共享状态（注册表、描述符、配置）
/// 从不被请求路径修改，不存在半认证的中间态。
async fn run_callback(
    state: &ProviderState,
    params: CallbackParams,
) -> std::result::Result<SessionToken, AuthFlowError> {
    if let Some(error) = params.error {
        return Err(AuthFlowError::ProviderDenied(
            params.error_description.unwrap_or(error),
        ));
    }

    let token = params
        .state
        .ok_or_else(|| AuthFlowError::InvalidState("missing state parameter".to_string()))?;
    // 原子消费：不匹配的或复用的令牌绝不触发身份落库
    state.ctx.attempts.consume(&token, &state.runtime.slug)?;

    let code = params
        .code
        .ok_or_else(|| AuthFlowError::ExchangeFailed("missing authorization code".to_string()))?;

    let descriptor = &state.runtime.descriptor;
    let tokens = descriptor
        .strategy
        .exchange_code(
            &state.ctx.http,
            &descriptor.endpoints,
            &descriptor.settings,
            &descriptor.callback_url,
            &code,
        )
        .await?;

    let claims = descriptor
        .strategy
        .fetch_identity(&state.ctx.http, &descriptor.endpoints, &tokens.access_token)
        .await?;

    let identity = ProviderIdentity {
        provider_slug: state.runtime.slug.clone(),
        subject: claims.subject,
        email: claims.email,
        display_name: claims.display_name,
        raw: claims.raw,
    };

    let user = state.ctx.identities.upsert_identity(&identity).await?;
    let session = state.ctx.sessions.create_session(&user).await?;
    info!(provider = %state.runtime.slug, user = %user.id, "login attempt authenticated");
    Ok(session)
}

/// 失败端点：终态，把原因回报给前端
async fn failure(State(state): State<ProviderState>, Query(params): Query<FailureParams>) -> Response {
    let reason = params.reason.unwrap_or_else(|| "unknown".to_string());
    warn!(provider = %state.runtime.slug, reason = %reason, "authentication attempt terminated");

    let mut target = state
        .ctx
        .config
        .frontend_url
        .join("login")
        .unwrap_or_else(|_| state.ctx.config.frontend_url.clone());
    target.set_query(Some(&format!("error={reason}")));
    found(target.as_str())
}

/// 302 跳转响应
fn found(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}
