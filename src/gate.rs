//! Subscription gate — decides whether a user may view gated content.
//!
//! Stateless and uncached: subscription status can change between any
//! two checks, so every check is a live lookup.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::MembershipError;
use crate::events::UserId;

/// Outcome of a membership check.
///
/// `Indeterminate` is deliberately distinct from `NonMember`: showing
/// gated content to a proven non-subscriber is a policy violation,
/// but blocking a subscriber over a transient lookup failure is a
/// usability bug. Only the former is withheld.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipStatus {
    Member,
    NonMember,
    Indeterminate(String),
}

/// The platform's member-status capability.
#[async_trait]
pub trait MembershipApi: Send + Sync {
    /// Platform-reported role of `user_id` within `chat_id`.
    async fn member_role(&self, chat_id: &str, user_id: UserId)
    -> Result<String, MembershipError>;
}

/// Answers whether a user currently belongs to the required channel.
pub struct SubscriptionGate {
    api: Arc<dyn MembershipApi>,
    channel_id: String,
}

impl SubscriptionGate {
    pub fn new(api: Arc<dyn MembershipApi>, channel_id: impl Into<String>) -> Self {
        Self {
            api,
            channel_id: channel_id.into(),
        }
    }

    /// Classify the user's membership. A failed lookup is never
    /// reported as `NonMember`.
    pub async fn check(&self, user_id: UserId) -> MembershipStatus {
        match self.api.member_role(&self.channel_id, user_id).await {
            Ok(role) => match role.as_str() {
                "member" | "administrator" | "creator" => MembershipStatus::Member,
                _ => MembershipStatus::NonMember,
            },
            Err(e) => {
                warn!(user_id, error = %e, "membership check failed");
                MembershipStatus::Indeterminate(e.to_string())
            }
        }
    }
}
