//! Broadcast fan-out engine.
//!
//! Delivers one operator-supplied message to every known user. The
//! user list is snapshotted once at invocation start; deliveries run
//! with bounded concurrency and per-recipient failures are counted,
//! never propagated.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{info, warn};

use crate::error::StorageError;
use crate::events::Messenger;
use crate::store::UserStore;

/// Aggregate outcome of one broadcast invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Fans an operator message out to every user in the store.
pub struct BroadcastEngine {
    store: Arc<dyn UserStore>,
    messenger: Arc<dyn Messenger>,
    concurrency: usize,
}

impl BroadcastEngine {
    pub fn new(store: Arc<dyn UserStore>, messenger: Arc<dyn Messenger>, concurrency: usize) -> Self {
        Self {
            store,
            messenger,
            concurrency: concurrency.max(1),
        }
    }

    /// Attempt delivery to every known user. Only a failure to
    /// enumerate users propagates; individual delivery failures are
    /// logged and counted.
    pub async fn broadcast(&self, text: &str) -> Result<BroadcastResult, StorageError> {
        let users = self.store.list_users().await?;
        let attempted = users.len();

        let result = futures::stream::iter(users)
            .map(|user| {
                let messenger = Arc::clone(&self.messenger);
                let text = text.to_owned();
                async move {
                    match messenger.send_text(user.id, &text, None).await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!(user_id = user.id, error = %e, "broadcast delivery failed");
                            false
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .fold(
                BroadcastResult {
                    attempted,
                    ..Default::default()
                },
                |mut acc, delivered| async move {
                    if delivered {
                        acc.succeeded += 1;
                    } else {
                        acc.failed += 1;
                    }
                    acc
                },
            )
            .await;

        info!(
            attempted = result.attempted,
            succeeded = result.succeeded,
            failed = result.failed,
            "broadcast complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::DeliveryError;
    use crate::events::{KeyboardSpec, UserId};
    use crate::store::{LibSqlUserStore, UserRecord};

    /// Messenger that fails for a fixed set of recipients.
    struct FlakyMessenger {
        fail_for: HashSet<UserId>,
        sent: Mutex<Vec<UserId>>,
    }

    impl FlakyMessenger {
        fn new(fail_for: impl IntoIterator<Item = UserId>) -> Self {
            Self {
                fail_for: fail_for.into_iter().collect(),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Messenger for FlakyMessenger {
        async fn send_text(
            &self,
            recipient: UserId,
            _text: &str,
            _keyboard: Option<&KeyboardSpec>,
        ) -> Result<(), DeliveryError> {
            if self.fail_for.contains(&recipient) {
                return Err(DeliveryError::SendFailed {
                    recipient,
                    reason: "blocked by recipient".into(),
                });
            }
            self.sent.lock().unwrap().push(recipient);
            Ok(())
        }

        async fn answer_callback(&self, _callback_id: &str) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    async fn store_with_users(n: i64) -> Arc<LibSqlUserStore> {
        let store = LibSqlUserStore::new_memory().await.unwrap();
        for id in 1..=n {
            store
                .upsert_user(id, Some(&format!("+1555{id:04}")))
                .await
                .unwrap();
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn interspersed_failures_do_not_abort_the_batch() {
        let store = store_with_users(7).await;
        let messenger = Arc::new(FlakyMessenger::new([2, 5]));
        let engine = BroadcastEngine::new(store, Arc::clone(&messenger) as _, 3);

        let result = engine.broadcast("hello").await.unwrap();
        assert_eq!(
            result,
            BroadcastResult {
                attempted: 7,
                succeeded: 5,
                failed: 2
            }
        );

        let mut delivered = messenger.sent.lock().unwrap().clone();
        delivered.sort_unstable();
        assert_eq!(delivered, vec![1, 3, 4, 6, 7]);
    }

    #[tokio::test]
    async fn all_successes() {
        let store = store_with_users(4).await;
        let engine = BroadcastEngine::new(store, Arc::new(FlakyMessenger::new([])), 8);
        let result = engine.broadcast("hi").await.unwrap();
        assert_eq!(
            result,
            BroadcastResult {
                attempted: 4,
                succeeded: 4,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn all_failures_still_complete() {
        let store = store_with_users(3).await;
        let engine = BroadcastEngine::new(store, Arc::new(FlakyMessenger::new([1, 2, 3])), 1);
        let result = engine.broadcast("hi").await.unwrap();
        assert_eq!(
            result,
            BroadcastResult {
                attempted: 3,
                succeeded: 0,
                failed: 3
            }
        );
    }

    #[tokio::test]
    async fn empty_user_list_yields_zero_result() {
        let store = Arc::new(LibSqlUserStore::new_memory().await.unwrap());
        let engine = BroadcastEngine::new(store, Arc::new(FlakyMessenger::new([])), 4);
        let result = engine.broadcast("hi").await.unwrap();
        assert_eq!(result, BroadcastResult::default());
    }

    #[tokio::test]
    async fn store_enumeration_failure_propagates() {
        struct BrokenStore;

        #[async_trait]
        impl UserStore for BrokenStore {
            async fn upsert_user(
                &self,
                _id: UserId,
                _phone: Option<&str>,
            ) -> Result<(), StorageError> {
                Err(StorageError::Unavailable("down".into()))
            }
            async fn has_phone(&self, _id: UserId) -> Result<bool, StorageError> {
                Err(StorageError::Unavailable("down".into()))
            }
            async fn is_first_interaction_done(&self, _id: UserId) -> Result<bool, StorageError> {
                Err(StorageError::Unavailable("down".into()))
            }
            async fn mark_first_interaction_done(&self, _id: UserId) -> Result<(), StorageError> {
                Err(StorageError::Unavailable("down".into()))
            }
            async fn list_users(&self) -> Result<Vec<UserRecord>, StorageError> {
                Err(StorageError::Unavailable("down".into()))
            }
        }

        let engine = BroadcastEngine::new(
            Arc::new(BrokenStore),
            Arc::new(FlakyMessenger::new([])),
            4,
        );
        assert!(engine.broadcast("hi").await.is_err());
    }
}
