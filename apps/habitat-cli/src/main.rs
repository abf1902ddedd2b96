mod inspect;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use habitat_author::BuildTool;
use habitat_common::{BuildableRecord, Edge, WorldPos};
use habitat_grid::GridConfig;
use habitat_kernel::Site;
use habitat_life_support::{OxygenConfig, OxygenConsumer};
use habitat_persist::Journal;
use tracing_subscriber::EnvFilter;

use crate::inspect::{SiteSummary, list_systems, parse_pos};

#[derive(Parser)]
#[command(name = "habitat-cli", about = "CLI tool for habitat building grids")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// World-space edge length of one grid cell
    #[arg(long, default_value_t = GridConfig::default().grid_unit)]
    grid_unit: i32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Build a small base, breach it and watch an oxygen consumer react
    Demo {
        /// Ticks to simulate in each phase
        #[arg(short, long, default_value = "5")]
        ticks: u32,
        /// Write the final layout to this file
        #[arg(short, long)]
        save: Option<PathBuf>,
        /// Append the demo's build events to a journal directory
        #[arg(short, long)]
        journal: Option<PathBuf>,
    },
    /// Load and verify a layout file, then print its summary and state hash
    Load {
        /// Layout file written by `demo --save`
        path: PathBuf,
    },
    /// Verify a journal directory and replay it into a fresh site
    Replay {
        /// Journal directory written by `demo --journal`
        dir: PathBuf,
    },
    /// Load a layout file and print its structure systems
    Inspect {
        /// Layout file written by `demo --save`
        path: PathBuf,
        /// Query seal state at world positions given as x,y,z
        #[arg(short, long)]
        at: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("habitat-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("grid: {}", habitat_grid::crate_info());
            println!("author: {}", habitat_author::crate_info());
            println!("persist: {}", habitat_persist::crate_info());
            println!("life-support: {}", habitat_life_support::crate_info());
        }
        Commands::Demo {
            ticks,
            save,
            journal,
        } => {
            let config = GridConfig {
                grid_unit: cli.grid_unit,
            };
            let mut site = run_demo(config, ticks)?;
            if let Some(path) = save {
                let layout = habitat_persist::save_layout(&path, &site)?;
                println!(
                    "Saved {} records to {} (sha256 {})",
                    layout.records.len(),
                    path.display(),
                    &layout.sha256[..12]
                );
            }
            if let Some(dir) = journal {
                let mut journal = Journal::open(&dir, config)?;
                if journal.segment_count() > 0 {
                    anyhow::bail!(
                        "journal {} already holds a build; the demo starts from an empty site",
                        dir.display()
                    );
                }
                journal.append(&site.drain_events())?;
                println!(
                    "Journal {}: {} segments, {} events",
                    dir.display(),
                    journal.segment_count(),
                    journal.event_count()
                );
            }
        }
        Commands::Replay { dir } => {
            let journal = Journal::open_existing(&dir)?;
            journal.verify()?;
            let site = journal.replay()?;
            println!(
                "Replayed {} events from {} segments",
                journal.event_count(),
                journal.segment_count()
            );
            println!("{}", SiteSummary::of(&site));
            println!("State hash: {:016x}", site.state_hash());
        }
        Commands::Load { path } => {
            let site = habitat_persist::load_layout(&path)?;
            println!("Loaded {}", path.display());
            println!("{}", SiteSummary::of(&site));
            println!("State hash: {:016x}", site.state_hash());
        }
        Commands::Inspect { path, at } => {
            let site = habitat_persist::load_layout(&path)?;
            println!("{}", SiteSummary::of(&site));
            for info in list_systems(site.grid()) {
                println!("  {info}");
            }
            for text in &at {
                let pos = parse_pos(text)?;
                println!("  sealed({text}) = {}", site.is_sealed(pos));
            }
        }
    }

    Ok(())
}

/// A 2x1 room with a ceiling, an annex one cell away, and a bridge between them.
fn run_demo(config: GridConfig, ticks: u32) -> anyhow::Result<Site> {
    let unit = config.grid_unit;
    let cell = |x: i32, y: i32, z: i32| WorldPos::new(x * unit, y * unit, z * unit);

    let mut site = Site::new(config)?;
    let mut tool = BuildTool::new();
    tracing::info!(unit, ticks, "running demo");

    for x in 0..2 {
        tool.place(&mut site, BuildableRecord::floor(cell(x, 0, 0)))?;
        tool.place(&mut site, BuildableRecord::floor(cell(x, 1, 0)))?;
        tool.place(&mut site, BuildableRecord::wall(cell(x, 0, 0), Edge::Front))?;
        tool.place(&mut site, BuildableRecord::wall(cell(x, 0, 0), Edge::Back))?;
    }
    tool.place(&mut site, BuildableRecord::wall(cell(0, 0, 0), Edge::Left))?;
    let door = tool
        .place(&mut site, BuildableRecord::wall(cell(1, 0, 0), Edge::Right))?
        .ok_or_else(|| anyhow::anyhow!("door wall was rejected"))?;
    tool.place(&mut site, BuildableRecord::floor(cell(3, 0, 0)))?;
    println!("Built: {}", SiteSummary::of(&site));

    let mut crew = OxygenConsumer::new(OxygenConfig::default(), cell(0, 0, 0));
    for _ in 0..ticks {
        crew.tick(site.grid());
    }
    println!(
        "Sealed phase: sealed={} oxygen={:.1} hazard={:?}",
        site.is_sealed(crew.position()),
        crew.level(),
        crew.hazard()
    );

    tool.remove(&mut site, door)?;
    for _ in 0..ticks {
        crew.tick(site.grid());
    }
    println!(
        "Breached phase: sealed={} oxygen={:.1} hazard={:?}",
        site.is_sealed(crew.position()),
        crew.level(),
        crew.hazard()
    );

    let bridge = tool
        .place(&mut site, BuildableRecord::floor(cell(2, 0, 0)))?
        .ok_or_else(|| anyhow::anyhow!("bridge floor was rejected"))?;
    println!("Bridged: {}", SiteSummary::of(&site));
    let outcome = tool.remove(&mut site, bridge)?;
    println!("Bridge removed ({outcome:?}): {}", SiteSummary::of(&site));

    tool.undo(&mut site)?;
    println!("Undo: {}", SiteSummary::of(&site));
    for info in list_systems(site.grid()) {
        println!("  {info}");
    }

    Ok(site)
}
