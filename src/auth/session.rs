//! # 待定登录凭据存储
//!
//! login 端点签发一次性 state 令牌并登记待定登录；callback 端点以
//! 原子移除的方式消费令牌——同一令牌并发到达时恰好一方胜出。
//! 未使用的令牌由后台清理任务按 TTL 过期，不会无限期有效。

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AuthFlowError;

/// 单次登录尝试的待定状态
#[derive(Debug, Clone)]
pub struct PendingAttempt {
    pub provider_slug: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// 以 state 令牌为键的待定登录存储
///
/// 进程内存储；对外只承诺单次消费与最终过期，外部存储可在
/// 同一接口后替换。
#[derive(Debug)]
pub struct LoginAttemptStore {
    attempts: DashMap<String, PendingAttempt>,
    ttl: Duration,
}

impl LoginAttemptStore {
    #[must_use]
    pub fn new(ttl: StdDuration) -> Self {
        Self {
            attempts: DashMap::new(),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(3650)),
        }
    }

    /// 签发不透明 state 令牌并登记待定登录
    pub fn issue(&self, provider_slug: &str) -> String {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();
        self.attempts.insert(
            token.clone(),
            PendingAttempt {
                provider_slug: provider_slug.to_string(),
                issued_at: now,
                expires_at: now + self.ttl,
            },
        );
        debug!(provider = provider_slug, "issued login state token");
        token
    }

    /// 消费一次性令牌
    ///
    /// 移除是原子的：同一令牌的并发消费恰好一方得到 `Ok`。
    /// 未签发、已消费、已过期、提供商不匹配都判为 `InvalidState`。
    pub fn consume(
        &self,
        state: &str,
        provider_slug: &str,
    ) -> Result<PendingAttempt, AuthFlowError> {
        let (_, attempt) = self.attempts.remove(state).ok_or_else(|| {
            AuthFlowError::InvalidState("state token unknown or already consumed".to_string())
        })?;

        if attempt.expires_at < Utc::now() {
            return Err(AuthFlowError::InvalidState(
                "state token expired".to_string(),
            ));
        }
        if attempt.provider_slug != provider_slug {
            return Err(AuthFlowError::InvalidState(
                "state token was issued for a different provider".to_string(),
            ));
        }

        Ok(attempt)
    }

    /// 清理已过期的待定登录，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.attempts.len();
        self.attempts.retain(|_, attempt| attempt.expires_at >= now);
        before - self.attempts.len()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.attempts.len()
    }

    /// 启动后台清理任务
    pub fn spawn_sweeper(store: Arc<Self>, period: StdDuration) -> JoinHandle<()> {
        info!(period_secs = period.as_secs(), "starting login attempt sweeper");
        tokio::spawn(async move {
            let mut interval = time::interval(period);
            loop {
                interval.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!(purged, "purged expired login attempts");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_accepts_a_fresh_token_exactly_once() {
        let store = LoginAttemptStore::new(StdDuration::from_secs(60));
        let token = store.issue("google");

        let attempt = store.consume(&token, "google").unwrap();
        assert_eq!(attempt.provider_slug, "google");

        // 再次消费同一令牌必须失败
        let err = store.consume(&token, "google").unwrap_err();
        assert!(matches!(err, AuthFlowError::InvalidState(_)));
    }

    #[test]
    fn unissued_token_is_rejected() {
        let store = LoginAttemptStore::new(StdDuration::from_secs(60));
        let err = store.consume("forged-token", "google").unwrap_err();
        assert!(matches!(err, AuthFlowError::InvalidState(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let store = LoginAttemptStore::new(StdDuration::ZERO);
        let token = store.issue("google");
        std::thread::sleep(StdDuration::from_millis(10));
        let err = store.consume(&token, "google").unwrap_err();
        assert!(matches!(err, AuthFlowError::InvalidState(_)));
    }

    #[test]
    fn provider_mismatch_is_rejected() {
        let store = LoginAttemptStore::new(StdDuration::from_secs(60));
        let token = store.issue("google");
        let err = store.consume(&token, "github").unwrap_err();
        assert!(matches!(err, AuthFlowError::InvalidState(_)));
    }

    #[test]
    fn concurrent_consumers_get_exactly_one_winner() {
        let store = Arc::new(LoginAttemptStore::new(StdDuration::from_secs(60)));
        let token = store.issue("google");

        let mut successes = 0;
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let store = Arc::clone(&store);
                    let token = token.clone();
                    scope.spawn(move || store.consume(&token, "google").is_ok())
                })
                .collect();
            for handle in handles {
                if handle.join().unwrap() {
                    successes += 1;
                }
            }
        });

        assert_eq!(successes, 1);
    }

    #[test]
    fn sweeper_logic_purges_only_expired_attempts() {
        let store = LoginAttemptStore::new(StdDuration::ZERO);
        store.issue("google");
        store.issue("google");
        std::thread::sleep(StdDuration::from_millis(10));

        let fresh_store = LoginAttemptStore::new(StdDuration::from_secs(60));
        fresh_store.issue("github");

        assert_eq!(store.purge_expired(), 2);
        assert_eq!(store.pending_count(), 0);
        assert_eq!(fresh_store.purge_expired(), 0);
        assert_eq!(fresh_store.pending_count(), 1);
    }
}
