//! # 操作调用边界
//!
//! 外部请求路由层经由此函数触达生成的业务逻辑。

use serde_json::Value;
use tracing::debug;

use crate::error::OperationError;
use crate::operations::context::OperationContext;
use crate::operations::types::{EntityCatalog, OperationSpec};

/// 执行一次操作调用
///
/// 每次调用构建全新的上下文；处理函数的结果与错误原样传出，
/// 不在此层捕获或改写业务错误。
pub async fn invoke(
    spec: &OperationSpec,
    input: Value,
    catalog: &dyn EntityCatalog,
) -> Result<Value, OperationError> {
    let context = OperationContext::build(&spec.entities, catalog)?;
    debug!(
        operation = %spec.name,
        kind = ?spec.kind,
        entities = spec.entities.len(),
        "dispatching operation"
    );
    (spec.handler)(input, context).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::types::{CapabilityTag, Entity, EntityDelegate};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct CountingDelegate;

    #[async_trait]
    impl EntityDelegate for CountingDelegate {
        async fn read(&self, _query: Value) -> Result<Value, OperationError> {
            Ok(json!([{"id": 1, "description": "write docs"}]))
        }

        async fn write(&self, payload: Value) -> Result<Value, OperationError> {
            Ok(payload)
        }

        async fn delete(&self, _selector: Value) -> Result<Value, OperationError> {
            Ok(json!({"deleted": 1}))
        }
    }

    struct FixedCatalog;

    impl EntityCatalog for FixedCatalog {
        fn delegate(&self, entity: &str) -> Option<Arc<dyn EntityDelegate>> {
            (entity == "Task").then(|| Arc::new(CountingDelegate) as Arc<dyn EntityDelegate>)
        }
    }

    #[tokio::test]
    async fn handler_receives_input_and_scoped_context() {
        let spec = OperationSpec::query(
            "getTasks",
            vec![Entity::new("Task", [CapabilityTag::Read])],
            |input, context| async move {
                assert_eq!(input, json!({"page": 1}));
                context.entity("Task")?.read(json!({})).await
            },
        );

        let output = invoke(&spec, json!({"page": 1}), &FixedCatalog).await.unwrap();
        assert_eq!(output[0]["id"], 1);
    }

    #[tokio::test]
    async fn handler_errors_propagate_unchanged() {
        let spec = OperationSpec::action(
            "failingAction",
            vec![Entity::new("Task", [CapabilityTag::Write])],
            |_input, _context| async move {
                Err(OperationError::handler("business rule violated"))
            },
        );

        let err = invoke(&spec, json!({}), &FixedCatalog).await.unwrap_err();
        assert!(matches!(err, OperationError::Handler { .. }));
        assert!(err.to_string().contains("business rule violated"));
    }

    #[tokio::test]
    async fn undeclared_entity_access_fails_inside_the_handler() {
        let spec = OperationSpec::query(
            "sneakyQuery",
            vec![Entity::new("Task", [CapabilityTag::Read])],
            |_input, context| async move {
                // 操作只声明了 Task，访问 User 必须失败
                context.entity("User")?.read(json!({})).await
            },
        );

        let err = invoke(&spec, json!({}), &FixedCatalog).await.unwrap_err();
        assert!(matches!(err, OperationError::UndeclaredEntity { .. }));
    }

    #[tokio::test]
    async fn each_invocation_builds_a_fresh_context() {
        let spec = OperationSpec::query(
            "getTasks",
            vec![Entity::new("Task", [CapabilityTag::Read])],
            |_input, context| async move {
                Ok(json!({"entities": context.entity_count()}))
            },
        );

        let first = invoke(&spec, json!({}), &FixedCatalog).await.unwrap();
        let second = invoke(&spec, json!({}), &FixedCatalog).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first["entities"], 1);
    }
}
