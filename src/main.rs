use std::sync::Arc;

use anyhow::Context;
use tokio::{main, sync::watch};
use tracing::{error, info, warn};

use stickerbot::{
    Dispatcher, LogReporter, OutboundMessage, RecipientId,
    application::handlers::result_reporter, config::{Config, LoadedConfig},
    infrastructure::messaging::telegram::TelegramBackend, logging,
};

#[main]
async fn main() -> anyhow::Result<()> {
    let LoadedConfig {
        config,
        ignored_options,
    } = Config::try_parse().context("failed to load configuration")?;
    logging::init(config.debug);
    if let Some(err) = ignored_options {
        warn!(%err, "options file ignored, using environment");
    }
    match config.target_chat() {
        Some(chat) => info!(chat, "target chat configured"),
        None => info!("no target chat configured"),
    }

    let backend = Arc::new(TelegramBackend::new(
        config.telegram_api_url.clone(),
        config.telegram_token.clone(),
    )?);

    let me = backend.get_me().await.context("getMe failed")?;
    let username = me.username.unwrap_or(me.first_name);
    info!(bot = %username, id = me.id, "connected to telegram");

    let (dispatcher, dispatch_loop, results) = Dispatcher::new(config.dispatcher(), backend);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let loop_handle = tokio::spawn(dispatch_loop.run(shutdown_rx));
    let reporter_handle = result_reporter::spawn(results, Arc::new(LogReporter));

    if let Some(admin) = config.admin_ids().first() {
        let notice =
            OutboundMessage::text(RecipientId(*admin), format!("Bot restarted: {username}"));
        if let Err(err) = dispatcher.enqueue(notice).await {
            warn!(%err, "could not queue restart notice");
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");

    let _ = shutdown_tx.send(true);
    if let Err(err) = loop_handle.await {
        error!(%err, "dispatch loop task failed");
    }
    // the loop owned the only results sender, so the reporter drains and exits
    if let Err(err) = reporter_handle.await {
        error!(%err, "reporter task failed");
    }

    Ok(())
}
