//! Bot API update payloads and their mapping to inbound events.

use serde::Deserialize;

use crate::events::{CallbackAction, Command, InboundEvent};

/// One incoming Bot API update, from the webhook or `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub contact: Option<Contact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub phone_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub data: Option<String>,
}

impl Update {
    /// Map this update onto the core's inbound event shapes.
    ///
    /// Returns `None` for updates the flow has no use for (no sender,
    /// non-text non-contact messages, callbacks without data).
    pub fn into_event(self) -> Option<InboundEvent> {
        if let Some(callback) = self.callback_query {
            let data = callback.data?;
            return Some(InboundEvent::Callback {
                sender: callback.from.id,
                callback_id: callback.id,
                action: CallbackAction::parse(&data),
            });
        }

        let message = self.message?;
        let sender = message.from?.id;

        if let Some(contact) = message.contact {
            return Some(InboundEvent::ContactShared {
                sender,
                phone: contact.phone_number,
            });
        }

        let text = message.text?;
        if let Some(command) = Command::parse(&text) {
            return Some(InboundEvent::Command { sender, command });
        }
        Some(InboundEvent::Text { sender, text })
    }
}
