//! # 日志配置模块
//!
//! 提供统一的日志初始化，默认过滤规则可被 RUST_LOG 覆盖。

use std::env;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日志系统
///
/// 只能调用一次；重复初始化会被 tracing 拒绝。
pub fn init_logging(log_level: Option<&str>) {
    let level = log_level.unwrap_or("info");

    let default_filter = format!("{level},auth_gateway=debug");
    let log_filter = env::var("RUST_LOG").unwrap_or(default_filter);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()))
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
