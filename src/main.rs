//! # Auth Gateway 主程序
//!
//! 启动顺序：日志 → 配置 → 注册表 → 提供商初始化 → 路由装配 → 服务。
//! 启动期任何失败都立即退出，绝不以降级的部分认证面对外服务。

use std::sync::Arc;

use tracing::{error, info};

use auth_gateway::auth::identity::{MemoryIdentityStore, MemorySessionStore};
use auth_gateway::auth::{
    compose, default_registry, initialize_providers, AuthContext, LoginAttemptStore,
};
use auth_gateway::{config, logging, server, Result};

#[tokio::main]
async fn main() {
    logging::init_logging(None);

    if let Err(e) = run().await {
        error!("服务启动失败: {e:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Arc::new(config::resolve()?);
    info!(env = %config.env, port = config.port, "配置解析完成");

    let registry = default_registry()?;
    let initialized = initialize_providers(&registry, &config)?;

    let attempts = Arc::new(LoginAttemptStore::new(config.state_ttl));
    LoginAttemptStore::spawn_sweeper(Arc::clone(&attempts), config.state_ttl);

    let ctx = AuthContext::new(
        Arc::clone(&config),
        attempts,
        Arc::new(MemoryIdentityStore::new()),
        Arc::new(MemorySessionStore::default()),
    );

    let auth_router = compose(initialized, ctx)?;
    let app = server::build_app(auth_router, &config)?;
    server::serve(app, &config).await
}
