//! # HTTP 服务器装配
//!
//! 把认证路由、健康检查与中间件层组合成对外应用并启动监听。

use std::net::SocketAddr;

use axum::http::HeaderValue;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::{GatewayError, Result};

/// 组装对外应用路由
pub fn build_app(auth_router: Router, config: &Config) -> Result<Router> {
    let origin = config.frontend_url.origin().ascii_serialization();
    let origin = HeaderValue::from_str(&origin)
        .map_err(|e| GatewayError::server_start("前端地址无法作为CORS源", e))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/health", get(health_check))
        .merge(auth_router)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        ))
}

/// 健康检查
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// 绑定端口并开始服务
pub async fn serve(app: Router, config: &Config) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::server_start(format!("无法绑定监听地址 {addr}"), e))?;

    info!(%addr, env = %config.env, "auth gateway listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| GatewayError::server_start("HTTP 服务异常退出", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let config = crate::config::resolve_from(&HashMap::new()).unwrap();
        let app = build_app(Router::new(), &config).unwrap();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
