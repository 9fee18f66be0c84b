//! # 操作上下文
//!
//! 每次调用新建，调用结束即销毁；上下文从不跨调用复用或缓存，
//! 避免数据访问句柄在请求间泄漏。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::OperationError;
use crate::operations::types::{CapabilityTag, Entity, EntityCatalog, EntityDelegate};

/// 按声明能力收窄的实体委托
pub struct ScopedDelegate {
    entity: Entity,
    inner: Arc<dyn EntityDelegate>,
}

impl ScopedDelegate {
    fn ensure(&self, capability: CapabilityTag) -> Result<(), OperationError> {
        if self.entity.grants(capability) {
            Ok(())
        } else {
            Err(OperationError::CapabilityNotGranted {
                entity: self.entity.name.clone(),
                capability,
            })
        }
    }

    pub async fn read(&self, query: Value) -> Result<Value, OperationError> {
        self.ensure(CapabilityTag::Read)?;
        self.inner.read(query).await
    }

    pub async fn write(&self, payload: Value) -> Result<Value, OperationError> {
        self.ensure(CapabilityTag::Write)?;
        self.inner.write(payload).await
    }

    pub async fn delete(&self, selector: Value) -> Result<Value, OperationError> {
        self.ensure(CapabilityTag::Delete)?;
        self.inner.delete(selector).await
    }

    #[must_use]
    pub fn entity(&self) -> &Entity {
        &self.entity
    }
}

impl fmt::Debug for ScopedDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedDelegate")
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}

/// 操作执行上下文
///
/// 实体映射恰好等于操作声明的实体集合（最小权限不变量）。
pub struct OperationContext {
    entities: HashMap<String, ScopedDelegate>,
}

impl OperationContext {
    /// 从声明的实体集合派生上下文
    ///
    /// 目录里缺少已声明实体的委托是装配缺陷，立即暴露。
    pub(crate) fn build(
        entities: &[Entity],
        catalog: &dyn EntityCatalog,
    ) -> Result<Self, OperationError> {
        let mut map = HashMap::with_capacity(entities.len());
        for entity in entities {
            let delegate = catalog.delegate(&entity.name).ok_or_else(|| {
                OperationError::DelegateMissing {
                    entity: entity.name.clone(),
                }
            })?;
            map.insert(
                entity.name.clone(),
                ScopedDelegate {
                    entity: entity.clone(),
                    inner: delegate,
                },
            );
        }
        Ok(Self { entities: map })
    }

    /// 取声明过的实体委托；未声明的实体访问是编程错误
    pub fn entity(&self, name: &str) -> Result<&ScopedDelegate, OperationError> {
        self.entities
            .get(name)
            .ok_or_else(|| OperationError::UndeclaredEntity {
                entity: name.to_string(),
            })
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

impl fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("entities", &self.entities)
            .finish()
    }
}
