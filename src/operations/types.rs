//! # 操作与实体模型

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OperationError;
use crate::operations::context::OperationContext;

/// 实体能力标签
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityTag {
    Read,
    Write,
    Delete,
}

impl fmt::Display for CapabilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
        };
        f.write_str(text)
    }
}

/// 数据实体声明
///
/// 由外围编译器声明，此处只读消费。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub capabilities: BTreeSet<CapabilityTag>,
}

impl Entity {
    pub fn new(
        name: impl Into<String>,
        capabilities: impl IntoIterator<Item = CapabilityTag>,
    ) -> Self {
        Self {
            name: name.into(),
            capabilities: capabilities.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn grants(&self, capability: CapabilityTag) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// 实体数据访问委托，由外部持久层实现
#[async_trait]
pub trait EntityDelegate: Send + Sync {
    async fn read(&self, query: Value) -> Result<Value, OperationError>;

    async fn write(&self, payload: Value) -> Result<Value, OperationError>;

    async fn delete(&self, selector: Value) -> Result<Value, OperationError>;
}

/// 实体目录：按名字供应委托
pub trait EntityCatalog: Send + Sync {
    fn delegate(&self, entity: &str) -> Option<Arc<dyn EntityDelegate>>;
}

/// 操作种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Action,
}

/// 业务处理函数：输入 + 上下文 → 输出
pub type OperationHandler =
    Arc<dyn Fn(Value, OperationContext) -> BoxFuture<'static, Result<Value, OperationError>> + Send + Sync>;

/// 操作声明
pub struct OperationSpec {
    pub name: String,
    pub kind: OperationKind,
    /// 声明顺序保留；上下文内恰好暴露这组实体
    pub entities: Vec<Entity>,
    pub handler: OperationHandler,
}

impl OperationSpec {
    pub fn query<F, Fut>(name: impl Into<String>, entities: Vec<Entity>, handler: F) -> Self
    where
        F: Fn(Value, OperationContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, OperationError>> + Send + 'static,
    {
        Self::with_kind(OperationKind::Query, name, entities, handler)
    }

    pub fn action<F, Fut>(name: impl Into<String>, entities: Vec<Entity>, handler: F) -> Self
    where
        F: Fn(Value, OperationContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, OperationError>> + Send + 'static,
    {
        Self::with_kind(OperationKind::Action, name, entities, handler)
    }

    fn with_kind<F, Fut>(
        kind: OperationKind,
        name: impl Into<String>,
        entities: Vec<Entity>,
        handler: F,
    ) -> Self
    where
        F: Fn(Value, OperationContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, OperationError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            kind,
            entities,
            handler: Arc::new(
                move |input, context| -> BoxFuture<'static, Result<Value, OperationError>> {
                    Box::pin(handler(input, context))
                },
            ),
        }
    }
}

impl fmt::Debug for OperationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}
