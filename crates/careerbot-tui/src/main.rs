mod app;
mod chat;
mod cli;
mod logging;
mod markdown;
mod sign_in;
mod ui;

use std::sync::Arc;

use anyhow::{Context, Result};
use careerbot_core::auth::{AuthProvider, FirebasePasswordAuth, StaticTokenAuth};
use careerbot_core::config::{ConfigRepository, JsonConfigRepository};
use careerbot_core::{ApiClient, Capabilities, ClientConfig, SessionGate};
use clap::Parser;
use crossterm::event::{Event, EventStream, KeyEventKind};
use futures::StreamExt;
use ratatui::DefaultTerminal;
use tokio::sync::mpsc::{Receiver, UnboundedReceiver};
use tracing::{error, info};

use crate::app::{App, AppEvent};
use crate::cli::Cli;
use crate::logging::StatusEntry;

fn auth_provider(cli: &Cli, config: &ClientConfig) -> Result<Arc<dyn AuthProvider>> {
    if let Some(token) = &cli.token {
        info!("Using bearer token sign-in");
        return Ok(Arc::new(
            StaticTokenAuth::new(token, &cli.name).with_email(cli.email.clone()),
        ));
    }
    match &config.firebase_api_key {
        Some(key) => {
            info!("Using email and password sign-in");
            let provider =
                FirebasePasswordAuth::new(key).context("Failed to create the sign-in client")?;
            Ok(Arc::new(provider))
        }
        // Sign-in reports the missing token on the first attempt
        None => Ok(Arc::new(StaticTokenAuth::new("", &cli.name))),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = cli.log_file.clone().unwrap_or_else(logging::default_log_path);
    let status_rx = logging::init(&log_path)?;
    info!(log = %log_path.display(), "Starting CareerBot");

    let repository: Arc<dyn ConfigRepository> = match &cli.config {
        Some(path) => Arc::new(JsonConfigRepository::with_path(path)),
        None => Arc::new(JsonConfigRepository::new().context("Failed to locate the config file")?),
    };
    let stored_config = repository
        .load()
        .await
        .context("Failed to load configuration")?;

    let mut config = stored_config.clone().apply_env();
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url);
    }
    if cli.no_reveal {
        config.reveal.enabled = false;
    }
    config.validate().context("Invalid configuration")?;
    info!(base_url = %config.base_url, "Configuration loaded");

    let provider = auth_provider(&cli, &config)?;
    let backend = Arc::new(ApiClient::new(&config).context("Failed to create the API client")?);
    let gate = Arc::new(SessionGate::new(provider));

    let (app, app_rx) = App::new(
        gate.clone(),
        backend,
        config,
        stored_config,
        repository,
        Capabilities::terminal(),
    );

    let terminal = ratatui::init();
    let result = run(terminal, app, gate, app_rx, status_rx).await;
    ratatui::restore();

    if let Err(e) = &result {
        error!(error = ?e, "CareerBot exited with an error");
    }
    info!("CareerBot stopped");
    result
}

async fn run(
    mut terminal: DefaultTerminal,
    mut app: App,
    gate: Arc<SessionGate>,
    mut app_rx: UnboundedReceiver<AppEvent>,
    mut status_rx: Receiver<StatusEntry>,
) -> Result<()> {
    let mut auth_rx = gate.subscribe();
    let mut terminal_events = EventStream::new();

    while !app.should_quit {
        terminal
            .draw(|frame| ui::draw(frame, &app))
            .context("Failed to draw the terminal")?;

        tokio::select! {
            maybe_event = terminal_events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Failed to read terminal input"),
                None => break,
            },
            Some(event) = app_rx.recv() => app.handle_app_event(event),
            Some(entry) = status_rx.recv() => app.show_status(entry),
            Ok(()) = auth_rx.changed() => {
                let identity = auth_rx.borrow_and_update().clone();
                app.on_auth_changed(identity);
            }
            Some(event) = app.next_conversation_event() => app.handle_conversation_event(event),
        }
    }
    Ok(())
}
