//! Single-flight access-token refresh.
//!
//! Every request that comes back 401 remembers the access token it was sent
//! with. Refreshes are serialised behind one async lock, and a caller that
//! finds the stored token already differs from its stale one reuses the
//! stored token instead of refreshing again. N concurrent 401s therefore cost
//! exactly one refresh call.

use std::future::Future;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::storage::{TokenStore, ACCESS_TOKEN_KEY};

#[derive(Debug)]
pub enum RefreshFailure {
    /// This caller ran the exchange and the server refused it. Tokens are gone.
    Rejected(ApiError),
    /// Nothing left to refresh with: no refresh token, or a concurrent refresh
    /// already failed and wiped the session.
    NoSession,
}

#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    gate: Mutex<()>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain an access token newer than `stale`, running `exchange` with the
    /// stored refresh token only if nobody else has already done so.
    pub async fn refresh<F, Fut>(
        &self,
        tokens: &dyn TokenStore,
        stale: Option<&str>,
        exchange: F,
    ) -> Result<String, RefreshFailure>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<String, ApiError>>,
    {
        let _guard = self.gate.lock().await;

        let current = tokens.access_token();
        if current.as_deref() != stale {
            return current.ok_or(RefreshFailure::NoSession);
        }

        let refresh_token = tokens.refresh_token().ok_or(RefreshFailure::NoSession)?;

        match exchange(refresh_token).await {
            Ok(access_token) => {
                tokens
                    .set(ACCESS_TOKEN_KEY, &access_token)
                    .map_err(|e| RefreshFailure::Rejected(e.into()))?;
                info!("Access token refreshed");
                Ok(access_token)
            }
            Err(err) => {
                warn!("Token refresh failed: {}", err);
                if let Err(e) = tokens.clear() {
                    warn!("Failed to clear tokens after refresh failure: {}", e);
                }
                Err(RefreshFailure::Rejected(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTokenStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_exchange() {
        let tokens = Arc::new(MemoryTokenStore::new());
        tokens.store_session("stale", "refresh-1").unwrap();
        let coordinator = Arc::new(RefreshCoordinator::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let tokens = tokens.clone();
            let coordinator = coordinator.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .refresh(tokens.as_ref(), Some("stale"), |refresh| async move {
                        assert_eq!(refresh, "refresh-1");
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<String, ApiError>("fresh".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert_eq!(token, "fresh");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(tokens.access_token().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn failed_exchange_wipes_tokens_and_waiters_see_no_session() {
        let tokens = MemoryTokenStore::new();
        tokens.store_session("stale", "revoked").unwrap();
        let coordinator = RefreshCoordinator::new();

        let first = coordinator
            .refresh(&tokens, Some("stale"), |_| async {
                Err::<String, ApiError>(ApiError::from_status(401, None))
            })
            .await;
        assert!(matches!(first, Err(RefreshFailure::Rejected(_))));
        assert!(tokens.access_token().is_none());
        assert!(tokens.refresh_token().is_none());

        let second = coordinator
            .refresh(&tokens, Some("stale"), |_| async {
                Err::<String, ApiError>(ApiError::InvalidRequest("exchange ran".into()))
            })
            .await;
        assert!(matches!(second, Err(RefreshFailure::NoSession)));
    }

    #[tokio::test]
    async fn missing_refresh_token_is_no_session() {
        let tokens = MemoryTokenStore::new();
        let coordinator = RefreshCoordinator::new();
        let result = coordinator
            .refresh(&tokens, None, |_| async { Ok::<String, ApiError>("never".to_string()) })
            .await;
        assert!(matches!(result, Err(RefreshFailure::NoSession)));
    }
}
