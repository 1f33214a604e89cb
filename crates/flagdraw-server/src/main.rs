//! FlagDraw server binary.

use anyhow::Context;
use clap::Parser;
use flagdraw_core::Storage;
use flagdraw_server::config::{Cli, Command, Config, SessionCommand, UserCommand};
use flagdraw_server::{AppState, admin, router};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "flagdraw_server=info,flagdraw_core=info,tower_http=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::User(cmd) => {
            let storage = open_persistent(&config)?;
            user_command(cmd, storage.as_ref()).await
        }
        Command::Session(cmd) => {
            let storage = open_persistent(&config)?;
            session_command(cmd, storage.as_ref(), &config).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let storage = config.open_storage().context("Failed to open storage")?;
    match &config.data_dir {
        Some(dir) => info!("Storing flags in {}", dir.display()),
        None => info!("No data directory configured, flags are kept in memory"),
    }
    match &config.dev_user {
        Some(username) => {
            let session = admin::bootstrap_dev_user(storage.as_ref(), username, config.session_ttl)
                .await
                .context("Failed to set up the development user")?;
            info!(
                "Development session for {}: {} (expires {})",
                username, session.token, session.expires_at
            );
        }
        None if config.data_dir.is_none() => {
            warn!("In-memory storage has no accounts; pass --dev-user to get a session token")
        }
        None => {}
    }

    let addr = config.bind;
    let app = router(AppState::new(storage, config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("FlagDraw server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Admin commands only make sense against storage that outlives the process.
fn open_persistent(config: &Config) -> anyhow::Result<Arc<dyn Storage>> {
    if config.data_dir.is_none() {
        anyhow::bail!("--data-dir (or FLAGDRAW_DATA_DIR) is required for this command");
    }
    config.open_storage().context("Failed to open storage")
}

async fn user_command(cmd: UserCommand, storage: &dyn Storage) -> anyhow::Result<()> {
    match cmd {
        UserCommand::Add {
            username,
            email,
            name,
        } => {
            let user = admin::add_user(storage, &username, &email, name.as_deref()).await?;
            println!("Created user {} ({})", user.username, user.id);
        }
        UserCommand::Delete { username } => {
            if !admin::delete_user(storage, &username).await? {
                anyhow::bail!("No such user: {}", username);
            }
            println!("Deleted user {}", username);
        }
    }
    Ok(())
}

async fn session_command(
    cmd: SessionCommand,
    storage: &dyn Storage,
    config: &Config,
) -> anyhow::Result<()> {
    match cmd {
        SessionCommand::Issue { username } => {
            let session = admin::issue_session(storage, &username, config.session_ttl).await?;
            println!("{}", session.token);
            info!("Session for {} expires at {}", username, session.expires_at);
        }
        SessionCommand::Revoke { token } => {
            if !storage.delete_session(&token).await? {
                anyhow::bail!("No such session");
            }
        }
    }
    Ok(())
}
