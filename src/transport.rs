//! Inbound transport — webhook server and long-poll fallback.
//!
//! Both paths decode Bot API updates into inbound events and hand
//! them to the flow. A malformed update is logged and acknowledged;
//! it never takes the transport down.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::flow::App;
use crate::telegram::{TelegramClient, Update};

/// How long one `getUpdates` call is allowed to wait server-side.
const POLL_TIMEOUT_SECS: u64 = 30;
/// Backoff after a failed poll round.
const POLL_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

/// Build the webhook router: the update route plus a keep-alive ping.
pub fn router(app: Arc<App>, webhook_path: &str) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route(webhook_path, post(webhook))
        .with_state(app)
}

async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "OK"}))
}

async fn webhook(State(app): State<Arc<App>>, Json(payload): Json<serde_json::Value>) -> StatusCode {
    match serde_json::from_value::<Update>(payload) {
        Ok(update) => match update.into_event() {
            Some(event) => {
                // Handle off the request path so slow collaborators
                // never stall webhook acknowledgement.
                tokio::spawn(async move { app.handle_event(event).await });
            }
            None => debug!("update carried no actionable event"),
        },
        Err(e) => warn!(error = %e, "failed to decode webhook update"),
    }
    StatusCode::OK
}

/// Serve the webhook router until the process exits.
pub async fn serve(app: Arc<App>, webhook_path: &str, port: u16) -> Result<(), TransportError> {
    let router = router(app, webhook_path);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| TransportError::Bind {
            port,
            reason: e.to_string(),
        })?;
    info!(port, "webhook server listening");
    axum::serve(listener, router)
        .await
        .map_err(|e| TransportError::Server(e.to_string()))
}

/// Long-poll `getUpdates` until the process exits. Used when no
/// public webhook URL is configured.
pub async fn run_polling(app: Arc<App>, client: Arc<TelegramClient>) {
    let mut offset: i64 = 0;
    info!("long polling for updates");

    loop {
        match client.get_updates(offset, POLL_TIMEOUT_SECS).await {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    if let Some(event) = update.into_event() {
                        let app = Arc::clone(&app);
                        tokio::spawn(async move { app.handle_event(event).await });
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "poll round failed");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
            }
        }
    }
}
