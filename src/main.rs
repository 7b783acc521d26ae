use anyhow::{Context, Result};
use tokio::signal;

use fieldops_realtime::config::Settings;
use fieldops_realtime::events::{EventKind, ServerEvent};
use fieldops_realtime::metrics;
use fieldops_realtime::telemetry::init_tracing;
use fieldops_realtime::{ConnectionManager, ConnectionState, StaticToken, Topic};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;

    // Initialize tracing
    init_tracing(&settings.log)?;
    tracing::info!(endpoint = %settings.realtime.endpoint, "Configuration loaded");

    let tokens = match settings.auth.token.clone() {
        Some(token) => StaticToken::new(token),
        None => StaticToken::none(),
    };
    let client = ConnectionManager::websocket(settings.realtime.clone(), tokens)?;

    for kind in EventKind::ALL {
        client.register_handler(kind, log_event);
    }

    for raw in &settings.subscriptions {
        match raw.parse::<Topic>() {
            Ok(topic) => {
                client.subscribe(topic);
            }
            Err(e) => tracing::warn!(error = %e, "Skipping invalid subscription"),
        }
    }

    // Log every state change until shutdown
    let mut states = client.watch_state();
    let watcher = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            tracing::info!(state = %state, "Realtime state");
            if state == ConnectionState::Failed {
                break;
            }
        }
    });

    if let Err(e) = client.connect().await {
        if e.is_terminal() {
            return Err(e).context("Realtime connection failed");
        }
        tracing::warn!(error = %e, "Initial connection failed, retrying in background");
    }

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = watcher => {
            let error = client.last_error().unwrap_or_else(|| "unknown".to_string());
            tracing::error!(error = %error, "Realtime connection failed permanently");
        }
    }

    client.disconnect();
    match metrics::encode_metrics() {
        Ok(snapshot) => tracing::debug!(metrics = %snapshot, "Final metrics"),
        Err(e) => tracing::warn!(error = %e, "Failed to encode metrics"),
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

fn log_event(event: &ServerEvent) -> anyhow::Result<()> {
    match event {
        ServerEvent::Connected => tracing::info!("Connected to realtime endpoint"),
        ServerEvent::CaseStatusUpdated(update) => {
            tracing::info!(case_id = %update.case_id, status = %update.status, "Case status updated")
        }
        ServerEvent::Notification(n) | ServerEvent::Broadcast(n) => {
            tracing::info!(title = %n.title, level = ?n.level, "{}", n.message)
        }
        ServerEvent::MobileFormProgress(p) => {
            tracing::info!(case_id = %p.case_id, progress = p.progress, "Form progress")
        }
        other => tracing::info!(event = %other.kind(), "{:?}", other),
    }
    Ok(())
}
