use std::path::PathBuf;
use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use opening::{Catalog, Store};

/// Logs from this workspace's crates go through `log`; this routes them to stderr. Override the
/// level with `RUST_LOG`.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Where the opening database lives
    #[arg(long, env = "OPENING_DB", default_value = "local.db/", value_hint = clap::ValueHint::DirPath)]
    pub db: PathBuf,
}

impl StoreArgs {
    pub fn open_store(&self) -> anyhow::Result<Store> {
        Store::open(&self.db)
            .with_context(|| format!("Failed to open the opening database at {}", self.db.display()))
    }
}

#[derive(Args, Debug, Clone)]
pub struct GameDataArgs {
    /// aoe2techtree data directory, holding data.json and locales/
    #[arg(long, env = "OPENING_GAME_DATA", default_value = "aoe2techtree/data/", value_hint = clap::ValueHint::DirPath)]
    pub game_data: PathBuf,
}

impl GameDataArgs {
    pub fn load_catalog(&self) -> anyhow::Result<Catalog> {
        Catalog::load(&self.game_data)
            .with_context(|| format!("Failed to load game data from {}", self.game_data.display()))
    }
}

pub fn progress_bar(len: u64) -> anyhow::Result<ProgressBar> {
    let progress = ProgressBar::new(len);
    progress.set_style(ProgressStyle::with_template("{msg:7} {wide_bar} {human_pos}/{human_len} {elapsed} eta {eta}")?);
    progress.set_draw_target(ProgressDrawTarget::stderr_with_hz(2 /* hz */));
    Ok(progress)
}
