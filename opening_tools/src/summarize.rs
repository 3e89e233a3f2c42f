use std::path::PathBuf;
use anyhow::Context;
use clap::Parser;
use opening::{extract_timelines, read_replay, render_summary, SummaryOptions};
use opening_tools::{init_logging, GameDataArgs};

/// Prints a readable summary of one decoded replay
#[derive(Parser)]
struct Args {
    /// Decoded replay (`.json` or `.json.gz`)
    #[arg(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    replay: PathBuf,

    #[command(flatten)]
    game_data: GameDataArgs,

    /// Include every player section
    #[arg(long)]
    all: bool,

    /// List each player's units
    #[arg(long)]
    units: bool,

    /// List every unit queued rather than each type once
    #[arg(long)]
    every_unit: bool,

    /// List each player's buildings
    #[arg(long)]
    buildings: bool,

    /// List every building rather than each type once
    #[arg(long)]
    every_building: bool,

    /// List each player's research
    #[arg(long)]
    techs: bool,

    /// Show each player's classified opening
    #[arg(long)]
    openings: bool,
}

impl Args {
    fn summary_options(&self) -> SummaryOptions {
        SummaryOptions {
            include_units: self.all || self.units,
            only_unique_units: !self.every_unit,
            include_buildings: self.all || self.buildings,
            only_unique_buildings: !self.every_building,
            include_techs: self.all || self.techs,
            include_player_openings: self.all || self.openings,
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let catalog = args.game_data.load_catalog()?;
    let replay = read_replay(&args.replay)?;
    let extracted = extract_timelines(&replay.operations, &catalog)
        .with_context(|| format!("Failed to extract timelines from {}", args.replay.display()))?;

    print!("{}", render_summary(&replay, &extracted, &catalog, &args.summary_options()));
    Ok(())
}
