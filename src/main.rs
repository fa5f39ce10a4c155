use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use chat_offline_queue::config::Settings;
use chat_offline_queue::error::Result as AppResult;
use chat_offline_queue::metrics::encode_metrics;
use chat_offline_queue::network::NetworkObserver;
use chat_offline_queue::queue::{OfflineQueue, QueueConfig, QueuedMessage};
use chat_offline_queue::sender::{ChatSender, SendOutcome};
use chat_offline_queue::storage::create_store;
use chat_offline_queue::tasks::HealthProbe;
use chat_offline_queue::telemetry::init_tracing;
use chat_offline_queue::transport::{HttpTransport, MessageTransport};

const HELP: &str = "commands: /queue /flush /clear /online /offline /metrics /quit";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = load_settings()?;
    init_tracing(&settings.log)?;
    tracing::info!("Configuration loaded");

    let user_id = settings
        .client
        .user_id
        .context("client.user_id is not set (CHAT__CLIENT__USER_ID)")?;

    let network = NetworkObserver::new();
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let (queue, transport, listener_handle) = start_queue(&settings, &network)
        .await
        .map_err(|e| anyhow::anyhow!("[{}] {}", e.code(), e))?;

    let _logger = queue.subscribe(|queue: &[QueuedMessage]| {
        tracing::debug!(pending = queue.len(), "Queue changed");
    });

    let mut dropped = queue.dropped();
    let dropped_handle = tokio::spawn(async move {
        loop {
            match dropped.recv().await {
                Ok(event) => tracing::warn!(
                    message_id = %event.message.id,
                    text = %event.message.text,
                    error = %event.last_error,
                    "Message could not be delivered and was discarded"
                ),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dropped-message logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Start health probe in background
    let probe_handle = if settings.network.probe_enabled {
        let probe = HealthProbe::new(
            &settings.api,
            &settings.network,
            network.clone(),
            shutdown_tx.subscribe(),
        )?;
        Some(tokio::spawn(probe.run()))
    } else {
        tracing::info!("Health probe disabled, use /online and /offline");
        None
    };

    let sender = ChatSender::new(queue.clone(), transport);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };

        match line.trim() {
            "" => {}
            "/quit" => break,
            "/queue" => {
                for message in queue.get_queue() {
                    println!(
                        "{}  retries={}  {}",
                        message.id, message.retry_count, message.text
                    );
                }
                println!("{} pending, online={}", queue.pending_count(), queue.is_online());
            }
            "/flush" => queue.process_queue().await,
            "/clear" => queue.clear().await,
            "/online" => {
                network.publish(true);
            }
            "/offline" => {
                network.publish(false);
            }
            "/metrics" => print!("{}", encode_metrics()?),
            text if text.starts_with('/') => println!("{}", HELP),
            text => match sender.send(user_id, text).await {
                Ok(SendOutcome::Delivered(message)) => println!("sent #{}", message.id),
                Ok(SendOutcome::Queued { id }) => println!("queued {}", id),
                Err(e) => println!("{}", e),
            },
        }
    }

    let _ = shutdown_tx.send(());
    if let Some(handle) = probe_handle {
        let _ = handle.await;
    }
    listener_handle.abort();
    dropped_handle.abort();

    tracing::info!(pending = queue.pending_count(), "Client shutdown complete");
    Ok(())
}

fn load_settings() -> AppResult<Settings> {
    Ok(Settings::new()?)
}

/// Build the transport and queue, load the persisted queue and start its
/// network listener.
async fn start_queue(
    settings: &Settings,
    network: &NetworkObserver,
) -> AppResult<(Arc<OfflineQueue>, Arc<dyn MessageTransport>, JoinHandle<()>)> {
    let store = create_store(&settings.storage);
    let transport: Arc<dyn MessageTransport> = Arc::new(HttpTransport::new(&settings.api)?);
    let queue = Arc::new(OfflineQueue::new(
        QueueConfig::from(&settings.queue),
        store,
        transport.clone(),
    ));

    let listener_handle = queue.initialize(network).await?;
    Ok((queue, transport, listener_handle))
}
