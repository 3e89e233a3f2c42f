mod match_history;
mod match_history_schema;
mod replay_schema;

pub use match_history::{candidate_matches, ApiError, CandidateMatch, DiscoveryState, ListedPlayer, MatchHistoryClient, MatchListing};
pub use match_history_schema::{LeaderboardResponse, LeaderboardStat, MatchHistoryResponse, MatchHistoryStat, ReportResult, StatGroup, StatGroupMember};
pub use replay_schema::{replay_from_reader, replay_from_str, ActionRecord, ActionType, DecodedReplay, HeaderPlayer, HeaderPlayerBuilder, HeaderPlayerBuilderError, Operation, ReplayHeader};
