use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use log::debug;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use mudlark::client::{ClientConfig, GameClient};
use mudlark::session::{ConnectionState, SessionUpdate};
use mudlark::settings::{self, Settings};

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.common.verbose);

    let settings = Settings::load(cli.common.config.as_deref())?;
    debug!("resolved settings: {settings:?}");

    match cli.command {
        Command::Play(cmd) => async_play(settings, cmd),
        Command::Config { command } => handle_config(&cli.common, &settings, command),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[tokio::main]
async fn async_play(settings: Settings, cmd: PlayCommand) -> Result<()> {
    handle_play(settings, cmd).await
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Mudlark - a terminal client for a text-adventure game server.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the config file.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect to the game server and play.
    Play(PlayCommand),

    /// Inspect or initialize configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct PlayCommand {
    /// Game server URL (overrides the configured one).
    #[arg(long, value_name = "WS_URL")]
    url: Option<String>,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Write a config file with the default settings.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved settings.
    Show,
    /// Print the config file path.
    Path,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

async fn handle_play(settings: Settings, cmd: PlayCommand) -> Result<()> {
    let mut config = ClientConfig::new(cmd.url.unwrap_or(settings.server.url));
    config.heartbeat_interval = std::time::Duration::from_secs(settings.server.heartbeat_secs);

    let (client, mut updates) = GameClient::connect(config).await?;

    // Player input arrives on its own task so the update loop never blocks
    // on the terminal.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut finished = false;
    while !finished {
        tokio::select! {
            Some(line) = line_rx.recv() => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "/quit" {
                    break;
                }
                client.say(line).await?;
            }

            update = updates.recv() => {
                match update {
                    Some(update) => finished = render(&update),
                    None => finished = true,
                }
            }
        }
    }

    client.disconnect().await;
    Ok(())
}

/// Print one session update. Returns true when the session is over.
fn render(update: &SessionUpdate) -> bool {
    match update {
        SessionUpdate::Status(status) => match status {
            ConnectionState::Connected => {
                println!("Connected. Type to speak; /quit to leave.");
                false
            }
            ConnectionState::Errored => {
                println!("Connection lost. Restart the client to reconnect.");
                true
            }
            ConnectionState::WorldFull => {
                println!("The world is full right now; no open character slot. Try again later.");
                true
            }
            ConnectionState::Idle | ConnectionState::Connecting => false,
        },
        SessionUpdate::Message(message) => {
            print_message(message, false);
            false
        }
        SessionUpdate::MessagePatched(message) => {
            print_message(message, true);
            false
        }
        SessionUpdate::Persona(persona) => {
            println!(
                "You are {} {}. {}",
                persona.prefix, persona.name, persona.description
            );
            false
        }
        SessionUpdate::Location(location) => {
            println!("-- {} --\n{}", location.name, location.description);
            false
        }
    }
}

fn print_message(message: &mudlark::ChatMessage, patched: bool) {
    let mut line = String::new();
    if message.is_self {
        line.push_str("> ");
    } else if let Some(author) = &message.author {
        line.push_str(&format!("[{author}] "));
    }
    line.push_str(&message.text);
    if message.quest_complete {
        line.push_str("  ** quest complete **");
    }
    if let Some(xp) = message.xp {
        line.push_str(&format!("  (+{xp} xp)"));
    }
    if patched {
        line.push_str("  (updated)");
    }
    println!("{line}");
}

fn handle_config(
    common: &CommonOpts,
    settings: &Settings,
    command: ConfigCommand,
) -> Result<()> {
    let path = common
        .config
        .clone()
        .unwrap_or_else(settings::default_config_path);

    match command {
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::write(&path, Settings::default().to_toml()?)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        ConfigCommand::Show => {
            print!("{}", settings.to_toml()?);
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, settings::APP_NAME, &mut io::stdout());
    Ok(())
}
