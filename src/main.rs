//! bommai: voice-commanded animated character
//!
//! Tamil voice commands make the character sit, walk, dance or jump, and
//! spoken numbers flash on screen. This binary provides:
//! - A continuous-listening controller around a single-shot recognizer
//! - Transcript matching against the trigger table and numeral lexicon
//! - IPC server for the start/stop toggle and status notifications
//!
//! The console backend stands in for the host speech API: typed lines are
//! recognized utterances, `/toggle` flips listening.

mod config;
mod console;
mod controller;
mod events;
mod ipc;
mod lifecycle;
mod matcher;
mod presenter;
mod session;
mod triggers;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, SpeechBackend};
use crate::console::{ConsoleMicrophone, ConsoleSpeech};
use crate::controller::ListeningController;
use crate::events::ListeningEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::matcher::TranscriptMatcher;
use crate::presenter::ConsolePresenter;
use crate::session::{MicrophoneAccess, SpeechCapability};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "bommai starting");

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        backend = ?config.speech.backend,
        boundary = ?config.speech.boundary,
        "configuration loaded"
    );

    let table = config.trigger_table()?;
    info!(
        actions = table.actions().len(),
        phrases = table.all_actions().len(),
        numerals = table.all_numerals().len(),
        "trigger table ready"
    );
    let matcher = TranscriptMatcher::new(&table, config.speech.boundary);

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Controller -> IPC server and status line
    let (event_tx, _event_rx) = broadcast::channel::<ListeningEvent>(64);
    // Console input -> console recognizer
    let (utterance_tx, utterance_rx) = mpsc::unbounded_channel();

    let capability: Option<Arc<dyn SpeechCapability>> = match config.speech.backend {
        SpeechBackend::Console => Some(Arc::new(ConsoleSpeech::new(
            utterance_rx,
            Duration::from_millis(config.speech.utterance_timeout_ms),
        ))),
        SpeechBackend::None => {
            warn!("no speech backend configured, listening cannot start");
            None
        }
    };
    let microphone: Option<Arc<dyn MicrophoneAccess>> =
        Some(Arc::new(ConsoleMicrophone::new(config.microphone.allow)));
    let presenter = Arc::new(ConsolePresenter::new(&config.display));

    let controller = ListeningController::new(
        config.controller_settings(),
        matcher,
        capability,
        microphone,
        presenter,
        event_tx.clone(),
    );
    let handle = controller.handle();

    // Create IPC server with event subscription
    let server = Server::new(
        &config.socket_path,
        handle.clone(),
        event_tx.clone(),
        controller.status(),
    )?;

    // Subscribe before the controller runs so its startup status is seen
    let mut status_rx = event_tx.subscribe();

    let stdin_task = console::spawn_stdin(utterance_tx, handle.clone());
    if config.speech.autostart && handle.start().is_err() {
        warn!("controller closed before autostart");
    }

    let mut controller_task = tokio::spawn(controller.run());

    info!("bommai initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the controller until it shuts down
        result = &mut controller_task => {
            if let Err(e) = result {
                error!(?e, "listening controller task failed");
            }
            info!("listening controller exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Keep the IPC status in sync and echo the status line
        _ = async {
            loop {
                match status_rx.recv().await {
                    Ok(event) => {
                        if let ListeningEvent::Status { message } = &event {
                            println!("💬 {message}");
                        }
                        server.apply_event(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "listening event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("listening event handler exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait_or_pending() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    handle.shutdown();
    if !controller_task.is_finished() {
        if let Err(e) = controller_task.await {
            error!(?e, "listening controller task failed");
        }
    }
    stdin_task.abort();
    server.shutdown().await;

    info!("bommai stopped");

    Ok(())
}
