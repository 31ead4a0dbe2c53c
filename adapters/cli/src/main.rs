#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that generates mazes and runs headless Phantom Maze sessions.

mod ascii;
mod config;
mod layout_transfer;
mod simulation;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phantom_maze_core::TileLayout;
use phantom_maze_system_maze_generation::{self as maze_generation, MazeGenerator};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{ascii::AsciiSink, config::SessionConfig, simulation::Session};

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Parser)]
#[command(author, version, about = "Phantom Maze", long_about = None)]
struct Cli {
    /// Log filter directive; overrides RUST_LOG
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Generate a maze and print it as ASCII art
    Generate {
        #[command(flatten)]
        session: SessionArgs,

        /// Also print the layout as a transferable string
        #[arg(long, default_value_t = false)]
        export: bool,
    },
    /// Run a headless session with a scripted player
    Simulate {
        #[command(flatten)]
        session: SessionArgs,

        /// Game seconds to simulate
        #[arg(long, default_value_t = 60)]
        seconds: u64,

        /// Play on a previously exported layout instead of generating one
        #[arg(long)]
        layout: Option<String>,
    },
}

#[derive(Debug, clap::Args)]
struct SessionArgs {
    /// TOML file with session settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed overriding the one from the session settings
    #[arg(long)]
    seed: Option<u64>,
}

impl SessionArgs {
    fn resolve(&self) -> Result<SessionConfig> {
        let mut config = config::load(self.config.as_deref())?;
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok(config)
    }
}

/// Entry point for the Phantom Maze command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref())?;

    match cli.command {
        Mode::Generate { session, export } => {
            let config = session.resolve()?;
            let layout = generate_layout(&config)?;

            let mut sink = AsciiSink::new(layout.columns(), layout.rows());
            maze_generation::render(&layout, &mut sink);
            print!("{}", sink.into_string());
            if export {
                let encoded =
                    layout_transfer::encode(&layout).context("failed to export layout")?;
                println!("{encoded}");
            }
        }
        Mode::Simulate {
            session,
            seconds,
            layout,
        } => {
            let config = session.resolve()?;
            let layout = match layout {
                Some(encoded) => load_layout(&encoded)?,
                None => generate_layout(&config)?,
            };

            let session = Session::start(&config, layout)?;
            println!("{}", session.banner());
            let report = session.run(Duration::from_secs(seconds));
            println!("{report}");
        }
    }

    Ok(())
}

fn init_tracing(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter '{directive}'"))?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn generate_layout(config: &SessionConfig) -> Result<TileLayout> {
    let maze = maze_generation::Config::new(config.maze.columns, config.maze.rows, config.seed)
        .with_arena(config.maze.arena_columns, config.maze.arena_rows);
    let layout = MazeGenerator::new(maze)
        .generate()
        .context("failed to generate maze")?;
    info!(
        columns = layout.columns(),
        rows = layout.rows(),
        seed = config.seed,
        "maze generated"
    );
    Ok(layout)
}

/// Accepts either an exported layout string or a path to a file holding one.
fn load_layout(value: &str) -> Result<TileLayout> {
    let encoded = if value.starts_with(layout_transfer::SNAPSHOT_HEADER) {
        value.to_owned()
    } else {
        fs::read_to_string(value).with_context(|| format!("failed to read layout file {value}"))?
    };
    layout_transfer::decode(&encoded).context("failed to decode layout")
}
