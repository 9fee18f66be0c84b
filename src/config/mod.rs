//! # 配置管理模块
//!
//! 处理应用配置解析和验证。配置在启动时解析一次，之后只读。

mod app_config;

pub use app_config::{Config, DEFAULT_FRONTEND_URL, DEFAULT_PORT, DEFAULT_STATE_TTL_SECS};

use std::collections::HashMap;
use std::env;

use crate::error::Result;

/// 从进程环境解析配置
///
/// 解析失败是致命错误：进程不得以部分或猜测的配置启动。
pub fn resolve() -> Result<Config> {
    let vars: HashMap<String, String> = env::vars().collect();
    app_config::resolve_from(&vars)
}

/// 从给定的环境变量快照解析配置（纯函数，测试入口）
pub fn resolve_from(vars: &HashMap<String, String>) -> Result<Config> {
    app_config::resolve_from(vars)
}
