//! Terminal chat client.
//!
//!   livechat signup --username alice --email alice@example.com
//!   livechat chat --email alice@example.com
//!   livechat --base-url http://localhost:8001 chat --identity alice
//!
//! In a chat, every line is sent as a message. `/history` prints the log,
//! `/reconnect` retries after a dropped connection, `/logout` signs out, and
//! `/quit` leaves.

mod render;

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use livechat_client::{
    AuthClient, ChatSession, ClientConfig, IdentityProvider, SessionIdentity, WsConnector,
};
use livechat_core::Identity;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "livechat", about = "Live chat from the terminal")]
struct Cli {
    /// TOML config file.
    #[arg(long, env = "LIVECHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL. Overrides the config file.
    #[arg(long, env = "LIVECHAT_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an account.
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "LIVECHAT_PASSWORD")]
        password: String,
    },
    /// Sign in and join the chat.
    Chat {
        /// Chat under this name without signing in (local brokers only).
        #[arg(long, conflicts_with = "email")]
        identity: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "LIVECHAT_PASSWORD")]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("livechat=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path).await?,
        None => ClientConfig::default(),
    };
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    match cli.command {
        Command::Signup {
            username,
            email,
            password,
        } => {
            let auth = AuthClient::from_config(&config)?;
            auth.sign_up(&username, &email, &password).await?;
            println!("Sign-up successful! Please sign in.");
            Ok(())
        }
        Command::Chat {
            identity,
            email,
            password,
        } => {
            let identity = authenticate(&config, identity, email, password).await?;
            chat(&config, identity).await
        }
    }
}

async fn authenticate(
    config: &ClientConfig,
    identity: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> anyhow::Result<Identity> {
    if let Some(name) = identity {
        return Identity::new(name).context("invalid --identity");
    }
    let (Some(email), Some(password)) = (email, password) else {
        bail!("pass --identity, or --email with --password (or LIVECHAT_PASSWORD)");
    };
    let auth = AuthClient::from_config(config)?;
    Ok(auth.sign_in(&email, &password).await?.identity)
}

async fn chat(config: &ClientConfig, identity: Identity) -> anyhow::Result<()> {
    let provider = SessionIdentity::new();
    let (session, handle, mut events) =
        ChatSession::from_config(config, WsConnector, provider.subscribe())?;
    let task = session.spawn();

    let me = identity.to_string();
    provider.sign_in(identity);
    println!("Signed in as {me}. Type a message, or /quit to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "/quit" => break,
                    "/reconnect" => {
                        handle.reconnect();
                    }
                    "/logout" => {
                        provider.sign_out();
                        println!("Signed out.");
                    }
                    "/history" => {
                        if let Some(snapshot) = handle.snapshot().await {
                            for message in &snapshot {
                                println!("{}", render::message(message, &me));
                            }
                        }
                    }
                    _ => {
                        handle.send(line);
                    }
                }
            }
            event = events.recv() => match event {
                Some(event) => {
                    if let Some(text) = render::event(&event, &me) {
                        println!("{text}");
                    }
                }
                None => break,
            },
        }
    }

    handle.shutdown();
    task.await?;
    Ok(())
}
