use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use offerbot::config::BotConfig;
use offerbot::events::Messenger;
use offerbot::flow::App;
use offerbot::gate::MembershipApi;
use offerbot::store::LibSqlUserStore;
use offerbot::telegram::TelegramClient;
use offerbot::transport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BotConfig::from_env()?;

    // Log to the console and to the configured file.
    let log_dir = config
        .log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
    let log_name = config
        .log_file
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_else(|| "offerbot.log".into());
    let file_appender = tracing_appender::rolling::never(log_dir, log_name);
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "offerbot starting");

    let store = Arc::new(LibSqlUserStore::new_local(&config.db_path).await?);
    let client = Arc::new(TelegramClient::new(config.bot_token.clone()));

    if let Err(e) = client.health_check().await {
        warn!(error = %e, "Bot API health check failed; continuing anyway");
    }
    if let Err(e) = client.register_commands().await {
        warn!(error = %e, "failed to register command menu");
    }

    let app = Arc::new(App::new(
        config.clone(),
        store,
        Arc::clone(&client) as Arc<dyn Messenger>,
        Arc::clone(&client) as Arc<dyn MembershipApi>,
    ));

    match &config.webhook_url {
        Some(base) => {
            let url = format!("{}{}", base.trim_end_matches('/'), config.webhook_path);
            client.set_webhook(&url).await?;
            info!(%url, "webhook registered");
            transport::serve(app, &config.webhook_path, config.port).await?;
        }
        None => {
            info!("no WEBHOOK_URL configured; falling back to long polling");
            if let Err(e) = client.delete_webhook().await {
                warn!(error = %e, "failed to drop stale webhook");
            }
            transport::run_polling(app, client).await;
        }
    }

    Ok(())
}
