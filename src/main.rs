use std::time::Duration;

use feedsync::core::config::AppConfig;
use feedsync::remote::HttpMessageSource;
use feedsync::storage::FileReadStatusStore;
use feedsync::sync::{LogNotifier, SyncOptions, SyncOrchestrator};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    feedsync::setup_logging();

    let config = AppConfig::from_env()?;

    let source = HttpMessageSource::new(
        config.api_token.clone(),
        config.api_base_url.clone(),
        config.page_size,
    );
    let feed = SyncOrchestrator::new(
        source,
        FileReadStatusStore::new(&config.read_status_path),
        LogNotifier,
        SyncOptions {
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        },
    );

    feed.full_refresh().await?;

    let messages = feed.messages().await;
    info!(
        "Synced {} message(s), {} unread, more history: {}",
        messages.len(),
        feed.unread_count().await,
        feed.has_more_messages().await
    );

    for message in messages.iter().take(20) {
        println!(
            "[{}] {} <{}> {}",
            message.timestamp.format("%Y-%m-%d %H:%M"),
            message.channel_id,
            message.author_display_name,
            message.text
        );
    }

    Ok(())
}
