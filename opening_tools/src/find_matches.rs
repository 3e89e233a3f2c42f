use std::path::PathBuf;
use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;
use opening::ReplayFileName;
use opening_tools::{init_logging, StoreArgs};
use replay_api::{DiscoveryState, MatchHistoryClient, MatchListing};

/// Crawls recent ranked match histories outwards from a leaderboard and prints every match whose
/// replay could be downloaded, one JSON object per line
#[derive(Parser)]
struct Args {
    /// 3 is random map 1v1, 13 is empire wars 1v1
    #[arg(long, default_value_t = 3)]
    leaderboard: i64,

    /// Match types to keep. Defaults to the 1v1 type of the chosen leaderboard.
    #[arg(long = "matchtype")]
    matchtypes: Vec<i64>,

    /// Where API responses are cached between runs
    #[arg(long, default_value = "api_cache.db/", value_hint = clap::ValueHint::DirPath)]
    cache: PathBuf,

    /// Matches already in this database are skipped
    #[command(flatten)]
    store: StoreArgs,

    /// Stop after this many matches
    #[arg(long)]
    limit: Option<usize>,
}

impl Args {
    fn matchtype_ids(&self) -> anyhow::Result<Vec<i64>> {
        if !self.matchtypes.is_empty() {
            return Ok(self.matchtypes.clone());
        }
        match self.leaderboard {
            3 => Ok(vec![6]),
            13 => Ok(vec![26]),
            other => anyhow::bail!("No default match type for leaderboard {other}, pass --matchtype"),
        }
    }
}

#[derive(Serialize)]
struct FoundMatch {
    #[serde(flatten)]
    listing: MatchListing,
    file_name: String,
    replay_urls: Vec<String>,
}

impl From<MatchListing> for FoundMatch {
    fn from(listing: MatchListing) -> Self {
        let file_name = ReplayFileName {
            match_id: listing.match_id,
            profile_ids: listing.players.iter().map(|p| p.profile_id).collect(),
            average_elo: listing.average_rating(),
            ladder_id: listing.leaderboard_id,
        };
        Self {
            file_name: file_name.to_file_name(),
            replay_urls: listing.replay_urls(),
            listing,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let store = args.store.open_store()?;
    let client = MatchHistoryClient::new(&args.cache)
        .with_context(|| format!("Failed to open the API cache at {}", args.cache.display()))?;

    let leaderboard = client.leaderboard(args.leaderboard).await
        .with_context(|| format!("Failed to fetch leaderboard {}", args.leaderboard))?;
    let mut state = DiscoveryState::from_leaderboard(args.leaderboard, args.matchtype_ids()?, &leaderboard);

    let stored: Vec<i64> = store.iter_matches()
        .map_ok(|record| record.match_id)
        .collect::<Result<_, _>>()
        .context("Failed to read stored matches")?;
    info!("Skipping {} matches that are already stored", stored.len());
    state.mark_seen(stored);

    let listings = client.discover(state);
    futures::pin_mut!(listings);

    let mut found = 0;
    while let Some(listing) = listings.next().await {
        let listing = match listing {
            Ok(listing) => listing,
            Err(err) => {
                warn!("Match discovery request failed: {err}");
                continue;
            }
        };
        println!("{}", serde_json::to_string(&FoundMatch::from(listing))?);

        found += 1;
        if args.limit.map_or(false, |limit| found >= limit) {
            break;
        }
    }

    info!("Found {found} matches");
    Ok(())
}
