//! # mudweave
//!
//! Line-oriented client for text-based multiplayer games.
//!
//! ## Overview
//!
//! The client connects to the game named in a YAML game definition and
//! then:
//! - prints everything the game sends (side channels prefixed)
//! - sends every typed line to the game, where the automapper sees it
//! - offers slash commands for the mapper, walking and completion
//!
//! ## Architecture
//!
//! This is Layer 3 - the client binary that ties together:
//! - mudweave-core: Core types and the game definition
//! - mudweave-map: The automapper
//! - mudweave-session: Connection, pumps and hooks

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use mudweave::{execute, format_channel, format_event, load_config, resolve, Command};
use mudweave_core::SessionEvent;
use mudweave_session::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref())?;

    // Initialize logging; stdout belongs to the game
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        "mudweave v{} starting for {} ({}:{})",
        env!("CARGO_PKG_VERSION"),
        config.name,
        config.host,
        config.port
    );

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let session = Session::builder(Arc::new(config))
        .on_event(move |_, event| {
            // receiver gone means we are shutting down
            let _ = event_tx.send(event);
        })
        .build()?;

    let connecting = Arc::clone(&session);
    if let Err(e) = tokio::task::spawn_blocking(move || connecting.connect()).await? {
        tracing::error!("Could not connect: {}", e);
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut auto_render = false;

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let mut out = String::new();
                match &event {
                    SessionEvent::Stdio(channel) => {
                        out = format_channel(*channel, &session.read_channel(*channel));
                    }
                    SessionEvent::Map if auto_render => {
                        out = session.render_map(true).join("\n") + "\n";
                    }
                    other => {
                        if let Some(line) = format_event(other) {
                            out = line + "\n";
                        }
                    }
                }
                stdout.write_all(out.as_bytes()).await?;
                stdout.flush().await?;
                if event == SessionEvent::Closed {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    session.close();
                    break;
                };
                let command = resolve(&session, Command::parse(&line));
                if let Command::AutoRender(on) = command {
                    auto_render = on;
                }
                let (text, quit) = execute(&session, command);
                if let Some(text) = text {
                    stdout.write_all(format!("{text}\n").as_bytes()).await?;
                    stdout.flush().await?;
                }
                if quit {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                session.close();
                break;
            }
        }
    }

    tracing::info!("mudweave shutting down");

    Ok(())
}
