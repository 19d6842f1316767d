//! Transient per-user conversation state.
//!
//! One slot per user id, each behind its own async mutex so that two
//! events for the same user never interleave their read-decide-write,
//! while unrelated users proceed concurrently. State lives only for
//! the process lifetime; a restart resets everyone to "no state".

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::events::UserId;

/// Where a user currently is in the conversation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Welcome,
    Menu,
    AwaitingPhone,
    BroadcastAuthoring,
}

/// Map from user id to session slot. `None` means no established
/// session (the implicit initial state).
#[derive(Default)]
pub struct SessionMap {
    inner: Mutex<HashMap<UserId, Arc<Mutex<Option<SessionState>>>>>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the slot for one user for the duration of a handler
    /// invocation. The outer map lock is only held long enough to
    /// fetch or create the per-user slot.
    pub async fn acquire(&self, user_id: UserId) -> OwnedMutexGuard<Option<SessionState>> {
        let slot = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(user_id).or_default())
        };
        slot.lock_owned().await
    }

    /// Current state without mutating, for diagnostics and tests.
    pub async fn peek(&self, user_id: UserId) -> Option<SessionState> {
        let slot = {
            let map = self.inner.lock().await;
            map.get(&user_id).cloned()
        };
        match slot {
            Some(slot) => *slot.lock().await,
            None => None,
        }
    }
}
