#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Spiritfield scenarios and randomizer logic
//! queries.

mod scenario;
mod simulation;

use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use spiritfield_system_logic::{assumed_fill, reachable, Inventory, LogicGraph};
use spiritfield_world::query;

use crate::{scenario::Scenario, simulation::Simulation};

/// Command line arguments for the Spiritfield tools.
#[derive(Debug, Parser)]
#[command(name = "spiritfield", version)]
#[command(about = "Runs Spiritfield scenarios and randomizer logic queries")]
struct Cli {
    /// Raises log verbosity; repeat for more detail. `RUST_LOG` still wins.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Runs a TOML scenario and prints every event as one JSON line.
    Simulate {
        /// Scenario file.
        scenario: PathBuf,
        /// Ticks to run instead of the scenario's own count.
        #[arg(long)]
        ticks: Option<u64>,
        /// Loot seed instead of the scenario's own seed.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Prints the nodes, zones and checks reachable with the given items.
    Reach {
        /// Logic graph file.
        graph: PathBuf,
        /// Node the player starts at.
        #[arg(long)]
        start: String,
        /// Item held by the player; repeat for several.
        #[arg(long = "item")]
        items: Vec<String>,
    },
    /// Places items into checks with a seeded assumed fill.
    Place {
        /// Logic graph file.
        graph: PathBuf,
        /// Node the player starts at.
        #[arg(long)]
        start: String,
        /// Seed of the shuffle.
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Item to place; repeat for several. Defaults to the graph's pool.
        #[arg(long = "item")]
        items: Vec<String>,
    },
}

/// Entry point for the Spiritfield command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging(cli.verbose);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match cli.mode {
        Mode::Simulate {
            scenario,
            ticks,
            seed,
        } => simulate(&scenario, ticks, seed, &mut out)?,
        Mode::Reach {
            graph,
            start,
            items,
        } => {
            let graph = load_graph(&graph)?;
            let inventory: Inventory = items.into_iter().collect();
            let reach = reachable(&graph, &start, &inventory)?;
            print_json(&mut out, &reach)?;
        }
        Mode::Place {
            graph,
            start,
            seed,
            items,
        } => {
            let graph = load_graph(&graph)?;
            let pool = if items.is_empty() {
                graph.items().to_vec()
            } else {
                items
            };
            let placement = assumed_fill(&graph, &start, &pool, seed)?;
            print_json(&mut out, &placement)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn initialize_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn simulate(
    path: &Path,
    ticks: Option<u64>,
    seed: Option<u64>,
    out: &mut impl Write,
) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let ticks = ticks.unwrap_or(scenario.engine.ticks);

    let mut events = Vec::new();
    let mut simulation = Simulation::new(&scenario, seed, &mut events)?;
    write_events(out, &mut events)?;
    for _ in 0..ticks {
        simulation.step(&mut events);
        write_events(out, &mut events)?;
    }

    let world = simulation.world();
    log::info!(
        "ran {} ticks, {} objects left in the {:?} realm",
        simulation.tick_index(),
        query::object_view(world, query::active_realm(world)).len(),
        query::active_realm(world)
    );
    Ok(())
}

fn write_events<E: Serialize>(out: &mut impl Write, events: &mut Vec<E>) -> Result<()> {
    for event in events.drain(..) {
        serde_json::to_writer(&mut *out, &event)?;
        writeln!(out)?;
    }
    Ok(())
}

fn load_graph(path: &Path) -> Result<LogicGraph> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read logic graph {}", path.display()))?;
    LogicGraph::from_json(&text).with_context(|| format!("invalid logic graph {}", path.display()))
}

fn print_json(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
