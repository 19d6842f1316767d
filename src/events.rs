//! Inbound event and outbound action shapes.
//!
//! The transport layer normalizes platform updates into `InboundEvent`
//! before they reach the conversation flow; handlers answer with
//! `OutboundAction`s which the platform client renders and sends.

use async_trait::async_trait;
use serde_json::json;

use crate::error::DeliveryError;

/// Stable platform-assigned user identifier.
pub type UserId = i64;

// ── Inbound events ──────────────────────────────────────────────────

/// Slash commands the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Menu,
    Users,
    Broadcast,
}

impl Command {
    /// Parse a command from message text. Accepts an optional
    /// `@botname` suffix the platform appends in group chats.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.trim().split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "menu" => Some(Self::Menu),
            "users" => Some(Self::Users),
            "broadcast" => Some(Self::Broadcast),
            _ => None,
        }
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Menu => "menu",
            Self::Users => "users",
            Self::Broadcast => "broadcast",
        }
    }
}

/// Structured callback-button actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// User claims to have subscribed; re-check the gate.
    CheckSubscription,
    /// Return to the main menu.
    BackToMenu,
    /// Section-specific drill-down on the credit cards keyboard.
    CreditCards,
    /// Anything else; acknowledged and logged, nothing more.
    Unknown(String),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Self {
        match data {
            "check_subscription" => Self::CheckSubscription,
            "back_to_menu" => Self::BackToMenu,
            "credit_cards" => Self::CreditCards,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::CheckSubscription => "check_subscription",
            Self::BackToMenu => "back_to_menu",
            Self::CreditCards => "credit_cards",
            Self::Unknown(other) => other,
        }
    }
}

/// A single normalized inbound event.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Command {
        sender: UserId,
        command: Command,
    },
    Text {
        sender: UserId,
        text: String,
    },
    ContactShared {
        sender: UserId,
        phone: String,
    },
    Callback {
        sender: UserId,
        callback_id: String,
        action: CallbackAction,
    },
}

impl InboundEvent {
    pub fn sender(&self) -> UserId {
        match self {
            Self::Command { sender, .. }
            | Self::Text { sender, .. }
            | Self::ContactShared { sender, .. }
            | Self::Callback { sender, .. } => *sender,
        }
    }

    /// Event kind for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Command { .. } => "command",
            Self::Text { .. } => "text",
            Self::ContactShared { .. } => "contact",
            Self::Callback { .. } => "callback",
        }
    }
}

// ── Keyboards ───────────────────────────────────────────────────────

/// A reply-keyboard button; may request the user's contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyButton {
    pub text: String,
    pub request_contact: bool,
}

impl ReplyButton {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_contact: false,
        }
    }

    pub fn contact(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_contact: true,
        }
    }
}

/// What an inline button does when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Url(String),
    Callback(String),
}

/// An inline-keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub action: ButtonAction,
}

impl InlineButton {
    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }
}

/// Platform-agnostic keyboard layout attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardSpec {
    Reply { rows: Vec<Vec<ReplyButton>> },
    Inline { rows: Vec<Vec<InlineButton>> },
}

impl KeyboardSpec {
    /// Render to the Bot API `reply_markup` JSON object.
    pub fn reply_markup(&self) -> serde_json::Value {
        match self {
            Self::Reply { rows } => {
                let keyboard: Vec<Vec<serde_json::Value>> = rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|b| {
                                if b.request_contact {
                                    json!({"text": b.text, "request_contact": true})
                                } else {
                                    json!({"text": b.text})
                                }
                            })
                            .collect()
                    })
                    .collect();
                json!({
                    "keyboard": keyboard,
                    "resize_keyboard": true,
                    "one_time_keyboard": false,
                })
            }
            Self::Inline { rows } => {
                let keyboard: Vec<Vec<serde_json::Value>> = rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|b| match &b.action {
                                ButtonAction::Url(url) => json!({"text": b.text, "url": url}),
                                ButtonAction::Callback(data) => {
                                    json!({"text": b.text, "callback_data": data})
                                }
                            })
                            .collect()
                    })
                    .collect();
                json!({"inline_keyboard": keyboard})
            }
        }
    }
}

// ── Outbound actions ────────────────────────────────────────────────

/// An action the flow asks the platform client to perform.
#[derive(Debug, Clone)]
pub enum OutboundAction {
    SendText {
        recipient: UserId,
        text: String,
        keyboard: Option<KeyboardSpec>,
    },
    AnswerCallback {
        callback_id: String,
    },
}

impl OutboundAction {
    pub fn text(recipient: UserId, text: impl Into<String>) -> Self {
        Self::SendText {
            recipient,
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn text_with_keyboard(
        recipient: UserId,
        text: impl Into<String>,
        keyboard: KeyboardSpec,
    ) -> Self {
        Self::SendText {
            recipient,
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// Outbound send capability, implemented by the platform client.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a text message, optionally with a keyboard.
    async fn send_text(
        &self,
        recipient: UserId,
        text: &str,
        keyboard: Option<&KeyboardSpec>,
    ) -> Result<(), DeliveryError>;

    /// Acknowledge a callback button press (stops the client spinner).
    async fn answer_callback(&self, callback_id: &str) -> Result<(), DeliveryError>;
}
