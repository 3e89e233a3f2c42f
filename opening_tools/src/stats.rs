use anyhow::Context;
use clap::Parser;
use opening::{ClassifierVersion, Report, CLASSIFIER_VERSION};
use opening_tools::{init_logging, GameDataArgs, StoreArgs};

/// Prints matchup, civilization, and age-up statistics over every classified player
#[derive(Parser)]
struct Args {
    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    game_data: GameDataArgs,

    /// Only players classified by this version are counted
    #[arg(long, env = "OPENING_CLASSIFIER_VERSION", default_value_t = CLASSIFIER_VERSION)]
    classifier_version: ClassifierVersion,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let store = args.store.open_store()?;
    let catalog = args.game_data.load_catalog()?;
    let report = Report::from_store(&store, &catalog, args.classifier_version)
        .context("Failed to build the report")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }
    Ok(())
}
