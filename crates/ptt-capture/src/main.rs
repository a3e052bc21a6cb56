//! PTT-Capture: push-to-talk voice clips driven by key events on stdin.
//!
//! Reads normalized key events as JSON lines on stdin and writes one JSON
//! line per outbound event on stdout. Diagnostics go to stderr.

mod app;
mod app_command;
mod config;
mod error;
mod event_sink;
mod key_source;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    error::{AppError, Result as AppResult},
    event_sink::EventSink,
    key_source::KeySource,
};

use crate::config::{Config, DEFAULT_LOG_JSON};

use std::{io::BufReader, time::Duration};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "ptt_capture=debug,ptt_capture_core=debug";

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Application entry point.
fn main() {
    let config = Config::load();
    init_tracing(
        config
            .as_ref()
            .map_or(DEFAULT_LOG_JSON, |config| config.logging.json),
    );

    let config = match config {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    let result = rt.block_on(async {
        let machine = match app::build_machine(&config) {
            Ok(machine) => machine,
            Err(e) => return Err(e),
        };

        let (command_tx, command_rx) = mpsc::channel(32);
        let key_handle = KeySource::new(BufReader::new(std::io::stdin())).spawn(command_tx);

        let mut app = App::new(machine, EventSink::new(std::io::stdout()), command_rx);
        let result = app.run().await;

        // Dropping the app drops the receiver, which stops the forwarder at
        // its next line. It may stay blocked in read until then.
        drop(app);
        match tokio::time::timeout(Duration::from_secs(1), key_handle).await {
            Ok(Ok(())) => debug!("Key input forwarder stopped cleanly"),
            Ok(Err(e)) => warn!(error = ?e, "Key input forwarder task panicked"),
            Err(_) => debug!("Key input forwarder still blocked on read, leaving it"),
        }

        result
    });

    // A forwarder blocked on stdin must not hold the process open.
    rt.shutdown_background();

    if let Err(e) = result {
        error!(error = ?e, "App error");
        std::process::exit(1);
    }

    info!("Exited cleanly");
}
