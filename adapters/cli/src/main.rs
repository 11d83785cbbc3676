#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives the Hearthvale simulation core headlessly.

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hearthvale_core::{
    protocol::{encode_client, ClientMessage},
    ItemStack, NoticeLevel, Tile,
};
use hearthvale_session::{Session, SessionConfig};
use hearthvale_system_transactions::InventoryProvider;
use hearthvale_world::{navigation::find_path, WorldObject};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod script;

use script::Script;

/// Headless driver for the Hearthvale simulation core.
#[derive(Debug, Parser)]
#[command(name = "hearthvale", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the checkpoint path between two tiles.
    Path {
        /// Session configuration; the built-in demo world when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Start tile as `x,y`.
        #[arg(long, value_parser = parse_tile)]
        from: Tile,
        /// Destination tile as `x,y`.
        #[arg(long, value_parser = parse_tile)]
        to: Tile,
    },
    /// Run a scripted sequence of intents against a recording channel.
    Simulate {
        /// Session configuration; the built-in demo world when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// TOML script with `[[steps]]` entries.
        #[arg(long)]
        script: PathBuf,
        /// Length of one animation frame in milliseconds.
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Path { config, from, to } => run_path(load_config(config)?, from, to),
        Command::Simulate {
            config,
            script,
            frame_ms,
        } => run_simulation(load_config(config)?, script, Duration::from_millis(frame_ms)),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return SessionConfig::demo().context("parsing the built-in demo world");
    };
    let text = fs::read_to_string(&path)
        .with_context(|| format!("reading session config {}", path.display()))?;
    SessionConfig::from_toml_str(&text)
        .with_context(|| format!("parsing session config {}", path.display()))
}

fn run_path(config: SessionConfig, from: Tile, to: Tile) -> Result<()> {
    let session = Session::from_config(&config, Vec::<ClientMessage>::new())
        .context("building the world")?;
    let path = find_path(session.grid(), from.to_world(), to);
    if path.is_empty() {
        println!("no path from {from} to {to}");
        return Ok(());
    }

    let checkpoints: Vec<String> = path.iter().map(ToString::to_string).collect();
    println!("{} checkpoints: {}", path.len(), checkpoints.join(" -> "));
    Ok(())
}

fn run_simulation(config: SessionConfig, script_path: PathBuf, frame: Duration) -> Result<()> {
    let text = fs::read_to_string(&script_path)
        .with_context(|| format!("reading script {}", script_path.display()))?;
    let script = Script::from_toml_str(&text)
        .with_context(|| format!("parsing script {}", script_path.display()))?;
    let mut session = Session::from_config(&config, Vec::<ClientMessage>::new())
        .context("building the session")?;

    info!(steps = script.len(), "running script");
    let notices = script.run(&mut session, frame)?;

    let position = session.position();
    println!(
        "position: ({:.2}, {:.2}) on {} facing {:?}",
        position.x,
        position.y,
        session.tile(),
        session.facing()
    );

    println!("nodes:");
    for (tile, object) in session.grid().objects() {
        if let WorldObject::ResourceNode(kind) = object {
            let count = session.node_count(tile).unwrap_or_default();
            println!("  {kind} at {tile}: {count}");
        }
    }

    print_slots("bank", session.store().bank.slots());
    print_slots("inventory", session.store().inventory.slots());

    println!("sent {} messages:", session.channel().len());
    for message in session.channel() {
        println!("  {}", encode_client(message)?);
    }

    for notice in notices {
        let level = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
        };
        println!("{level}: {}", notice.text);
    }
    Ok(())
}

fn print_slots(label: &str, slots: &[Option<ItemStack>]) {
    println!("{label}:");
    for (index, stack) in slots.iter().enumerate() {
        if let Some(stack) = stack {
            let noted = if stack.noted { " (noted)" } else { "" };
            println!("  [{index}] {} x{}{noted}", stack.id, stack.quantity);
        }
    }
}

fn parse_tile(value: &str) -> Result<Tile, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{value}`"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|error| format!("invalid coordinate `{part}`: {error}"))
    };
    Ok(Tile::new(parse(x)?, parse(y)?))
}
