mod catalog;
mod classify;
mod error;
mod event;
mod export;
mod extract;
mod file_name;
mod ingest;
mod record;
mod report;
mod store;
mod stream;
mod summary;
mod tables;
mod taxonomy;

pub use catalog::{Catalog, CatalogEntry};
pub use classify::{classify, Age, FAST_CASTLE_THRESHOLD_MS};
pub use error::{CatalogError, Error, ExtractError, FileNameError, StoreError};
pub use event::{format_game_time, Event, EventKey, EventKind, Tribute};
pub use export::{flat_match_rows, write_ndjson, FlatMatchRow, FlatPlayer};
pub use extract::{extract_timelines, ExtractedReplay, PlayerTimeline, ROSTER_SIZE};
pub use file_name::{ReplayFileName, DEFAULT_LADDER_ID};
pub use ingest::{classify_pending, ingest_file, ingest_replay, ClassifySummary, UNKNOWN_CIVILIZATION};
pub use record::{ClassifierVersion, MatchRecord, PlayerMatchRecord, PlayerRecord, StoredAction, Victory, CLASSIFIER_VERSION, DEFAULT_PATCH_NUMBER};
pub use report::{age_up_stats, civilization_stats, matchup_stats, AgeUpStats, CivilizationStats, MatchupStats, MirrorStats, Report};
pub use store::Store;
pub use stream::{read_replay, replay_files};
pub use summary::{render_summary, Color, SummaryOptions};
pub use tables::{is_ignored_building, is_unique_unit, CASTLE_AGE, FEUDAL_AGE, IMPERIAL_AGE};
pub use taxonomy::{matches, named_patterns, NamedPattern, Opening, OpeningFlags, OpeningPattern, DID_NOTHING_PATTERN, META_OPENINGS};
