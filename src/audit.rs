//! Action audit log.
//!
//! Every user action is recorded under the `audit` target so the
//! trail can be filtered or shipped separately. A pure sink; nothing
//! in the flow branches on it.

use crate::events::UserId;

/// Record one user action.
pub fn log_action(user_id: UserId, action: &str) {
    tracing::info!(target: "audit", user_id, action, "user action");
}

/// Record a denied attempt at a privileged command.
pub fn log_denied(user_id: UserId, command: &str) {
    tracing::warn!(target: "audit", user_id, command, "unauthorized admin command");
}
