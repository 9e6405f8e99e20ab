use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use totemwatch::alerting::{AlertDispatcher, AlertSink};
use totemwatch::config::{Config, ConfigHandle};
use totemwatch::engine::{spawn_config_watch, spawn_violation_reset, Engine};
use totemwatch::input::AsyncEventTailer;
use totemwatch::models::now_millis;
use totemwatch::output::{OutputFormat, OutputHandler};
use totemwatch::persistence::{AlertStore, SqliteAlertStore};

const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Main daemon entry point
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("Starting TotemWatch daemon...");

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("totemwatch.toml"));

    let config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        log::warn!("Config file not found, using defaults");
        Config::default()
    };

    // Setup graceful shutdown signal handling
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal, gracefully stopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    let output = OutputHandler::new(
        OutputFormat::from_str(&config.output.format),
        config.output.file_path.clone(),
    )?;

    let (dispatcher, queue, alert_rx) = AlertDispatcher::new(config.alerting.clone());
    let mut dispatcher = dispatcher.with_output(output);

    if let Some(ref path) = config.persistence.database_path {
        let store = Arc::new(SqliteAlertStore::new(path)?);
        let cutoff = config.persistence.retention_cutoff(now_millis());
        let pruned = store.prune_old_alerts(cutoff)?;
        log::info!("Alert store opened at {:?}, pruned {} old alerts", path, pruned);
        dispatcher = dispatcher.with_store(store);
    }
    let dispatcher_task = tokio::spawn(dispatcher.run(alert_rx));

    let sink: Arc<dyn AlertSink> = Arc::new(queue);
    let engine = Arc::new(Engine::new(ConfigHandle::new(config.clone()), sink));
    let reset_task = spawn_violation_reset(engine.clone());
    let watch_task = if config_path.exists() {
        log::info!("Watching {:?} for configuration changes", config_path);
        Some(spawn_config_watch(
            engine.clone(),
            config_path.clone(),
            CONFIG_POLL_INTERVAL,
        ))
    } else {
        None
    };

    let (event_tx, mut event_rx) = mpsc::channel(1024);
    let tailer_task = match config.input.file_path.clone() {
        Some(path) => {
            log::info!("Reading events from {:?}", path);
            let follow = config.input.follow;
            Some(tokio::spawn(async move {
                if let Err(e) = AsyncEventTailer::new(path).run(event_tx, follow).await {
                    log::error!("Event tailer failed: {}", e);
                }
            }))
        }
        None => {
            log::warn!("No input file configured, waiting for shutdown");
            drop(event_tx);
            None
        }
    };

    log::info!("Daemon running. Press Ctrl+C to stop.");

    let mut input_open = tailer_task.is_some();
    while running.load(Ordering::SeqCst) {
        if !input_open {
            tokio::time::sleep(Duration::from_millis(100)).await;
            continue;
        }

        tokio::select! {
            event = event_rx.recv() => match event {
                Some(event) => engine.handle_recorded(&event),
                None => {
                    log::info!("Event input finished");
                    input_open = false;
                    if !config.input.follow {
                        break;
                    }
                }
            },
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }

    if let Some(task) = tailer_task {
        task.abort();
    }
    if let Some(task) = watch_task {
        task.abort();
        let _ = task.await;
    }
    reset_task.abort();
    let _ = reset_task.await;

    log::info!("Checked {} connected players", engine.player_count());
    // Dropping the last engine handle closes the alert queue
    drop(engine);
    dispatcher_task.await?;

    log::info!("TotemWatch daemon stopped");
    Ok(())
}
