//! Telegram Bot API client.
//!
//! Thin reqwest wrapper over the JSON Bot API. Implements the two
//! capabilities the core needs from the platform: outbound sends
//! (`Messenger`) and member-status lookup (`MembershipApi`).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::error::{DeliveryError, MembershipError, TransportError};
use crate::events::{KeyboardSpec, Messenger, UserId};
use crate::gate::MembershipApi;
use crate::telegram::update::Update;

/// Telegram Bot API client.
pub struct TelegramClient {
    token: SecretString,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(token: SecretString) -> Self {
        Self {
            token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.token.expose_secret()
        )
    }

    /// POST one Bot API method and return its `result` payload.
    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, TransportError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if !data.get("ok").and_then(serde_json::Value::as_bool).unwrap_or(false) {
            let detail = data
                .get("description")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(TransportError::Api {
                method: method.to_string(),
                detail,
            });
        }

        Ok(data.get("result").cloned().unwrap_or(serde_json::Value::Null))
    }

    /// Verify the token by calling `getMe`.
    pub async fn health_check(&self) -> Result<(), TransportError> {
        self.call("getMe", json!({})).await.map(|_| ())
    }

    /// Register the command menu shown in the client UI.
    pub async fn register_commands(&self) -> Result<(), TransportError> {
        self.call(
            "setMyCommands",
            json!({
                "commands": [
                    {"command": "start", "description": "Launch the bot"},
                    {"command": "help", "description": "Help"},
                    {"command": "menu", "description": "Main menu"},
                ]
            }),
        )
        .await?;
        self.call(
            "setChatMenuButton",
            json!({"menu_button": {"type": "commands"}}),
        )
        .await?;
        Ok(())
    }

    /// Point webhook delivery at `url`.
    pub async fn set_webhook(&self, url: &str) -> Result<(), TransportError> {
        self.call("setWebhook", json!({"url": url})).await.map(|_| ())
    }

    /// Drop any registered webhook (required before long polling).
    pub async fn delete_webhook(&self) -> Result<(), TransportError> {
        self.call("deleteWebhook", json!({})).await.map(|_| ())
    }

    /// Long-poll for updates past `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError> {
        let result = self
            .call(
                "getUpdates",
                json!({
                    "offset": offset,
                    "timeout": timeout_secs,
                    "allowed_updates": ["message", "callback_query"],
                }),
            )
            .await?;
        serde_json::from_value(result).map_err(|e| TransportError::Api {
            method: "getUpdates".to_string(),
            detail: format!("malformed result: {e}"),
        })
    }

    async fn send_message(
        &self,
        chat_id: UserId,
        text: &str,
        keyboard: Option<&KeyboardSpec>,
    ) -> Result<(), TransportError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = keyboard.reply_markup();
        }
        self.call("sendMessage", body).await?;
        debug!(chat_id, "message sent");
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(
        &self,
        recipient: UserId,
        text: &str,
        keyboard: Option<&KeyboardSpec>,
    ) -> Result<(), DeliveryError> {
        self.send_message(recipient, text, keyboard)
            .await
            .map_err(|e| DeliveryError::SendFailed {
                recipient,
                reason: e.to_string(),
            })
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), DeliveryError> {
        self.call(
            "answerCallbackQuery",
            json!({"callback_query_id": callback_id}),
        )
        .await
        .map(|_| ())
        .map_err(|e| DeliveryError::CallbackFailed {
            callback_id: callback_id.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl MembershipApi for TelegramClient {
    async fn member_role(
        &self,
        chat_id: &str,
        user_id: UserId,
    ) -> Result<String, MembershipError> {
        let result = self
            .call(
                "getChatMember",
                json!({"chat_id": chat_id, "user_id": user_id}),
            )
            .await
            .map_err(|e| MembershipError::RequestFailed(e.to_string()))?;

        result
            .get("status")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                MembershipError::MalformedResponse("getChatMember result has no status".into())
            })
    }
}
