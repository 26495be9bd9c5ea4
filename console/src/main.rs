use anyhow::Result;
use shared::{Config, SessionEvent};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;
mod state;

use crate::commands::{dispatch, Command};
use crate::state::{AppState, Dialogue};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting PropTrade console against {}", config.api_base_url);

    let mut state = AppState::new(config)?;
    state.color = std::env::var_os("NO_COLOR").is_none();

    let watchdog = state
        .session
        .spawn_inactivity_watchdog(state.config.inactivity_timeout);
    let expiry = state.session.spawn_expiry_listener();

    let mut events = state.client().subscribe();
    let notices = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Expired { redirect }) => {
                    eprintln!("! Your session has expired. Please log in again ({}).", redirect);
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    state.session.init().await;
    match state.session.user() {
        Some(user) => println!("Signed in as {}. Type /help for commands.", user.email),
        None => println!("Not signed in. Use /login <email> <password>, or /help."),
    }

    let mut dialogue = Dialogue::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        state.session.record_activity();

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("! {}", e);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        match dispatch(&state, &mut dialogue, command).await {
            Ok(reply) => println!("{}", reply.trim_end()),
            Err(e) => {
                tracing::debug!("Command failed: {:?}", e);
                println!("! {}", e);
            }
        }
    }

    watchdog.abort();
    expiry.abort();
    notices.abort();
    tracing::info!("Console closed");
    Ok(())
}
