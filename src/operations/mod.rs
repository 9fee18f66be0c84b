//! # 操作执行模块
//!
//! 为业务逻辑函数（query/action）构建最小权限的执行上下文：
//! 上下文内恰好包含操作声明的实体，多一个不给，少一个不行。

pub mod context;
pub mod invoke;
pub mod types;

pub use context::{OperationContext, ScopedDelegate};
pub use invoke::invoke;
pub use types::{
    CapabilityTag, Entity, EntityCatalog, EntityDelegate, OperationHandler, OperationKind,
    OperationSpec,
};
