use std::sync::Arc;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use alto_core::{Config, ConversationController};
use app::App;

#[derive(Parser)]
#[command(name = "alto")]
#[command(version, about = "Chat with a remote completion endpoint from the terminal")]
struct Cli {
    /// Completion endpoint URL (overrides config and ALTO_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Send one message and print the reply
    Ask {
        /// The message to send
        message: String,
    },
    /// Check that the endpoint's server is up
    Ping,
    /// Show the config file location and effective settings
    Config {
        /// Write the effective settings to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);

    match command {
        Commands::Chat => {
            let log_path = logging::init_file(cli.verbose)?;
            let config = resolve_config(cli.endpoint)?;
            info!(endpoint = %config.endpoint, log = %log_path.display(), "starting chat");
            run_chat(&config).await
        }
        Commands::Ask { message } => {
            logging::init_stderr(cli.verbose);
            ask(&resolve_config(cli.endpoint)?, &message).await
        }
        Commands::Ping => {
            logging::init_stderr(cli.verbose);
            ping(&resolve_config(cli.endpoint)?).await
        }
        Commands::Config { save } => {
            logging::init_stderr(cli.verbose);
            show_config(&resolve_config(cli.endpoint)?, save)
        }
    }
}

/// Config file, then ALTO_ENDPOINT, then --endpoint
fn resolve_config(endpoint: Option<String>) -> Result<Config> {
    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "could not load config, using defaults");
        Config::new()
    });
    let config = config.with_env_overrides().with_endpoint(endpoint);
    config.validate()?;
    Ok(config)
}

fn controller_for(config: &Config) -> Result<ConversationController> {
    let client = config.client()?;
    Ok(ConversationController::new(Arc::new(client)))
}

async fn run_chat(config: &Config) -> Result<()> {
    let controller = controller_for(config)?;
    let mut app = App::new(controller, &config.endpoint);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new(app.controller.subscribe());

    let result = async {
        loop {
            // Re-render from the controller's current state after every event
            let snapshot = app.controller.snapshot();
            terminal.draw(|frame| ui::render(&mut app, &snapshot, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event),
                None => break,
            }

            if app.should_quit {
                break;
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    info!(messages = app.controller.len(), "chat closed");
    result
}

async fn ask(config: &Config, message: &str) -> Result<()> {
    let controller = controller_for(config)?;

    let Some(pending) = controller.submit(message) else {
        bail!("Nothing to send: the message is empty");
    };
    pending.resolved().await;

    for msg in controller.snapshot().transcript {
        println!("{}: {}", msg.sender().label(), msg.text());
    }

    Ok(())
}

async fn ping(config: &Config) -> Result<()> {
    let client = config.client()?;

    client
        .ping()
        .await
        .with_context(|| format!("{} is not reachable", client.endpoint()))?;

    println!("✓ {} is up", client.endpoint());
    Ok(())
}

fn show_config(config: &Config, save: bool) -> Result<()> {
    let path = Config::config_path()?;

    if save {
        config
            .save()
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "config saved");
        println!("✓ Saved settings to {}", path.display());
    }

    println!("Config file: {}", path.display());
    println!("Endpoint:    {}", config.endpoint);
    match config.timeout_secs {
        Some(secs) => println!("Timeout:     {}s", secs),
        None => println!("Timeout:     transport default"),
    }
    println!("Log file:    {}", logging::log_path().display());

    Ok(())
}
