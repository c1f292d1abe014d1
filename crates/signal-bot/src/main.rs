//! Signal command bot - main entry point.

use anyhow::Context;
use signal_bot::config::Config;
use signal_bot::error::AppResult;
use signal_bot::Bot;
use signal_client::{MessageReceiver, SignalClient};
use tokio::signal;
use tokio_stream::StreamExt;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.bot.log_level);

    info!("Starting Signal command bot...");

    let mut client = SignalClient::new(&config.signal.service_url, &config.signal.phone_number)
        .context("Failed to create Signal client")?;
    if let Some(token) = &config.signal.api_token {
        client = client.with_api_token(token.clone());
    }

    if !client.health_check().await {
        error!("Signal API not reachable at {}", config.signal.service_url);
        return Err(anyhow::anyhow!("Signal API not reachable").into());
    }
    info!("Signal API healthy");

    signal_bot::verify_account(&client).await?;

    let bot = Bot::new(&config, client.clone(), Vec::new())?;
    let _events = bot.spawn_event_logger();

    info!(
        prefix = ?config.default_prefix(),
        owners = config.bot.owners.len(),
        "Listening for messages..."
    );

    // Start message receiver
    let receiver = MessageReceiver::new(client, config.signal.poll_interval);
    let mut stream = Box::pin(receiver.stream());

    // Main message loop
    loop {
        tokio::select! {
            Some(message) = stream.next() => {
                bot.handle(message);
            }
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Shutting down...");
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
