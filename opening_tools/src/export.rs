use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use anyhow::Context;
use clap::Parser;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use opening::{flat_match_rows, write_ndjson, ClassifierVersion, CLASSIFIER_VERSION};
use opening_tools::{init_logging, StoreArgs};

/// Exports concluded, classified 1v1 matches as newline-delimited JSON, winner first
#[derive(Parser)]
struct Args {
    #[command(flatten)]
    store: StoreArgs,

    /// Only matches classified by this version are exported
    #[arg(long, env = "OPENING_CLASSIFIER_VERSION", default_value_t = CLASSIFIER_VERSION)]
    classifier_version: ClassifierVersion,

    /// File to write. Gzipped if it ends in `.gz`. Defaults to stdout.
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let store = args.store.open_store()?;
    let rows = flat_match_rows(&store, args.classifier_version)
        .context("Failed to read matches from the database")?;
    info!("Exporting {} matches", rows.len());

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            if path.extension().map_or(false, |ext| ext == "gz") {
                let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
                write_ndjson(&rows, &mut encoder).context("Failed to write the export")?;
                encoder.finish().context("Failed to finish compressing the export")?;
            } else {
                write_ndjson(&rows, BufWriter::new(file)).context("Failed to write the export")?;
            }
        }
        None => write_ndjson(&rows, io::stdout().lock()).context("Failed to write the export")?,
    }
    Ok(())
}
