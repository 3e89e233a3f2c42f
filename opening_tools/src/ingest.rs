use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use par_iter_sync::IntoParallelIteratorSync;
use opening::{
    classify_pending, ingest_replay, read_replay, replay_files, Catalog, ClassifierVersion, ReplayFileName, Store,
    CLASSIFIER_VERSION, DEFAULT_PATCH_NUMBER,
};
use opening_tools::{init_logging, progress_bar, GameDataArgs, StoreArgs};

/// Stores decoded replays and classifies every player's opening
#[derive(Parser)]
struct Args {
    /// Directory of decoded replays (`.json` or `.json.gz`)
    #[arg(value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    replays: Option<PathBuf>,

    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    game_data: GameDataArgs,

    /// Game patch the replays were recorded on
    #[arg(long, env = "OPENING_PATCH_NUMBER", default_value_t = DEFAULT_PATCH_NUMBER)]
    patch_number: i64,

    /// Stored openings from older classifier versions are redone
    #[arg(long, env = "OPENING_CLASSIFIER_VERSION", default_value_t = CLASSIFIER_VERSION)]
    classifier_version: ClassifierVersion,

    /// Skip ingestion and only classify what's already stored
    #[arg(short, long)]
    analysis_only: bool,

    /// Delete each replay file once its match is in the database
    #[arg(short = 'X', long)]
    delete_replay_after_parse: bool,
}

#[derive(Debug, Default)]
struct IngestCounts {
    stored: usize,
    already_stored: usize,
    failed: usize,
}

fn ingest_directory(args: &Args, dir: &Path, store: &Store, catalog: &Catalog) -> anyhow::Result<IngestCounts> {
    let files = replay_files(dir)
        .with_context(|| format!("Failed to list replays in {}", dir.display()))?;
    info!("Found {} decoded replays in {}", files.len(), dir.display());

    let progress = progress_bar(files.len() as u64)?;
    let decode_store = store.clone();
    // Decoding is the slow part, so it runs in parallel. Storing stays on this thread.
    let decoded = files.into_par_iter_sync(move |path: PathBuf| {
        let decoded = ReplayFileName::from_path(&path)
            .map_err(opening::Error::from)
            .and_then(|file_name| {
                if decode_store.contains_match(file_name.match_id)? {
                    return Ok(None);
                }
                let replay = read_replay(&path)?;
                Ok(Some((file_name, replay)))
            });
        Ok::<_, ()>((path, decoded))
    });

    let mut counts = IngestCounts::default();
    for (path, decoded) in decoded {
        progress.inc(1);
        let result = decoded.and_then(|decoded| match decoded {
            Some((file_name, replay)) => {
                progress.set_message(file_name.match_id.to_string());
                ingest_replay(store, catalog, &file_name, &replay, args.patch_number)
            }
            None => Ok(false),
        });

        match result {
            Ok(true) => counts.stored += 1,
            Ok(false) => counts.already_stored += 1,
            Err(err) => {
                warn!("Skipping {}: {err}", path.display());
                counts.failed += 1;
                continue;
            }
        }

        if args.delete_replay_after_parse {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete {}", path.display()))?;
        }
    }

    progress.finish();
    store.flush()?;
    Ok(counts)
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let store = args.store.open_store()?;
    let catalog = args.game_data.load_catalog()?;

    if !args.analysis_only {
        let dir = args.replays.as_ref()
            .context("A replay directory is required unless --analysis-only is set")?;
        let counts = ingest_directory(&args, dir, &store, &catalog)?;
        info!("Stored {} new matches, {} were already stored, {} failed",
            counts.stored, counts.already_stored, counts.failed);
    }

    let summary = classify_pending(&store, &catalog, args.classifier_version)
        .context("Failed to classify stored players")?;
    info!("Classified {} player records, skipped {} without a timeline", summary.classified, summary.skipped);

    Ok(())
}
