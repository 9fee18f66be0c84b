//! # 身份与会话协作接口
//!
//! 回调处理器通过这两个 trait 消费外部的身份存储与会话存储。
//! 内存实现用于默认装配与测试。

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AuthFlowError;

/// 一次成功交换取回的外部身份记录
#[derive(Debug, Clone, Serialize)]
pub struct ProviderIdentity {
    pub provider_slug: String,
    /// 提供商侧的稳定主体标识
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub raw: Value,
}

/// 本系统内的用户记录
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub provider_slug: String,
    pub subject: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 已建立的会话
#[derive(Debug, Clone, Serialize)]
pub struct SessionToken {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// 身份存储：查找或创建与外部身份对应的用户
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn upsert_identity(&self, identity: &ProviderIdentity)
        -> Result<AuthUser, AuthFlowError>;
}

/// 会话存储：为用户建立会话
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, user: &AuthUser) -> Result<SessionToken, AuthFlowError>;
}

/// 内存身份存储
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    users: DashMap<String, AuthUser>,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(identity: &ProviderIdentity) -> String {
        format!("{}:{}", identity.provider_slug, identity.subject)
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn upsert_identity(
        &self,
        identity: &ProviderIdentity,
    ) -> Result<AuthUser, AuthFlowError> {
        let user = self
            .users
            .entry(Self::key(identity))
            .or_insert_with(|| AuthUser {
                id: Uuid::new_v4(),
                provider_slug: identity.provider_slug.clone(),
                subject: identity.subject.clone(),
                email: identity.email.clone(),
                created_at: Utc::now(),
            })
            .value()
            .clone();
        Ok(user)
    }
}

/// 内存会话存储
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionToken>,
    ttl: Duration,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::hours(1)),
        }
    }

    /// 按令牌读取会话
    #[must_use]
    pub fn get(&self, token: &str) -> Option<SessionToken> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(60 * 60))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, user: &AuthUser) -> Result<SessionToken, AuthFlowError> {
        let session = SessionToken {
            token: Uuid::new_v4().to_string(),
            user_id: user.id,
            expires_at: Utc::now() + self.ttl,
        };
        self.sessions.insert(session.token.clone(), session.clone());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity(subject: &str) -> ProviderIdentity {
        ProviderIdentity {
            provider_slug: "google".to_string(),
            subject: subject.to_string(),
            email: Some("user@example.com".to_string()),
            display_name: Some("User".to_string()),
            raw: json!({"id": subject}),
        }
    }

    #[tokio::test]
    async fn upsert_is_stable_for_the_same_subject() {
        let store = MemoryIdentityStore::new();
        let first = store.upsert_identity(&identity("subj-1")).await.unwrap();
        let second = store.upsert_identity(&identity("subj-1")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn distinct_subjects_create_distinct_users() {
        let store = MemoryIdentityStore::new();
        let first = store.upsert_identity(&identity("subj-1")).await.unwrap();
        let second = store.upsert_identity(&identity("subj-2")).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(store.user_count(), 2);
    }

    #[tokio::test]
    async fn sessions_resolve_back_to_their_user() {
        let identities = MemoryIdentityStore::new();
        let sessions = MemorySessionStore::default();
        let user = identities.upsert_identity(&identity("subj-1")).await.unwrap();

        let session = sessions.create_session(&user).await.unwrap();
        let stored = sessions.get(&session.token).unwrap();
        assert_eq!(stored.user_id, user.id);
        assert!(stored.expires_at > Utc::now());
    }
}
