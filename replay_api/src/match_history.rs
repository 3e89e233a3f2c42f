use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use chrono::{DateTime, Utc};
use futures::{stream, Stream, StreamExt};
use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::Instant;

use crate::match_history_schema::{LeaderboardResponse, MatchHistoryResponse};

const API_ENDPOINT: &str = "https://aoe-api.worldsedgelink.com/community/leaderboard";
const REPLAY_ENDPOINT: &str = "https://aoe.ms/replay/";
const REQUESTS_PER_MINUTE: u64 = 20;
const CACHE_TTL_SECONDS: i64 = 10 * 60;
// Keep queries as large as the API allows to reduce the number of requests
const PLAYERS_PER_QUERY: usize = 5;
const RATINGS_PER_QUERY: usize = 100;
// A replay isn't uploaded until a few minutes after the match, and is gone after about a week
const MIN_REPLAY_AGE_SECONDS: i64 = 5 * 60;
const MAX_REPLAY_AGE_SECONDS: i64 = 7 * 24 * 60 * 60;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Match history request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Received status {status} from {url}")]
    UnexpectedStatus {
        status: u16,
        url: String,
    },

    #[error("Failed to decode match history response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP cache error: {0}")]
    Cache(#[from] sled::Error),

    #[error("Corrupt HTTP cache entry: {0}")]
    CacheEncoding(#[from] pot::Error),
}

#[derive(Serialize, Deserialize)]
struct CachedResponse {
    fetched_at: DateTime<Utc>,
    body: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListedPlayer {
    pub profile_id: i64,
    pub rating: i64,
}

/// A ranked match whose replay should be downloadable
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchListing {
    pub match_id: i64,
    pub leaderboard_id: i64,
    pub players: Vec<ListedPlayer>,
    /// The player whose history surfaced this match. Their replay is tried first.
    pub search_player: Option<i64>,
}

impl MatchListing {
    pub fn average_rating(&self) -> i64 {
        if self.players.is_empty() {
            return 0;
        }
        let total: i64 = self.players.iter().map(|p| p.rating).sum();
        (total as f64 / self.players.len() as f64).round() as i64
    }

    /// Download urls, one per player, with the search player's first
    pub fn replay_urls(&self) -> Vec<String> {
        self.players.iter()
            .map(|p| p.profile_id)
            .sorted_by_key(|&id| Some(id) != self.search_player)
            .map(|id| format!("{REPLAY_ENDPOINT}?gameId={}&profileId={}", self.match_id, id))
            .collect()
    }
}

/// A match from someone's history that passed the filters, before ratings are resolved
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateMatch {
    pub match_id: i64,
    pub profile_ids: Vec<i64>,
    pub search_player: Option<i64>,
}

/// Ranked automatch games of the wanted match types that finished recently enough for the replay
/// to still exist. Games where more than one searched player took part are skipped because there's
/// no telling whose replay to ask for.
pub fn candidate_matches(
    history: &MatchHistoryResponse,
    matchtype_ids: &[i64],
    searched: &HashSet<i64>,
    now: DateTime<Utc>,
) -> Vec<CandidateMatch> {
    let newest = now.timestamp() - MIN_REPLAY_AGE_SECONDS;
    let oldest = now.timestamp() - MAX_REPLAY_AGE_SECONDS;

    history.match_history_stats.iter()
        .filter(|stat| matchtype_ids.contains(&stat.matchtype_id))
        .filter(|stat| stat.description == "AUTOMATCH")
        .filter(|stat| !stat.matchurls.is_empty())
        .filter(|stat| stat.completiontime >= oldest && stat.completiontime <= newest)
        .filter_map(|stat| {
            let profile_ids = stat.matchhistoryreportresults.iter()
                .map(|r| r.profile_id)
                .collect_vec();
            let searched_players = profile_ids.iter()
                .filter(|id| searched.contains(id))
                .collect_vec();
            if searched_players.len() > 1 {
                return None;
            }
            Some(CandidateMatch {
                match_id: stat.id,
                search_player: searched_players.first().map(|&&id| id),
                profile_ids,
            })
        })
        .collect()
}

/// Crawl state: which players still need their history checked and what we know about ratings
pub struct DiscoveryState {
    leaderboard_id: i64,
    matchtype_ids: Vec<i64>,
    ratings: HashMap<i64, Option<i64>>,
    pending_players: BinaryHeap<Reverse<i64>>,
    seen_matches: HashSet<i64>,
}

impl DiscoveryState {
    pub fn from_leaderboard(leaderboard_id: i64, matchtype_ids: Vec<i64>, leaderboard: &LeaderboardResponse) -> Self {
        let ratings: HashMap<_, _> = leaderboard.ratings(leaderboard_id)
            .into_iter()
            .map(|(id, rating)| (id, Some(rating)))
            .collect();
        let pending_players = ratings.keys().map(|&id| Reverse(id)).collect();
        info!("Starting match discovery from {} players on leaderboard {leaderboard_id}", ratings.len());

        Self {
            leaderboard_id,
            matchtype_ids,
            ratings,
            pending_players,
            seen_matches: HashSet::new(),
        }
    }

    /// Skip matches that are already known, e.g. because they're already stored
    pub fn mark_seen(&mut self, match_ids: impl IntoIterator<Item=i64>) {
        self.seen_matches.extend(match_ids);
    }

    fn next_batch(&mut self) -> Vec<i64> {
        std::iter::from_fn(|| self.pending_players.pop())
            .take(PLAYERS_PER_QUERY)
            .map(|Reverse(id)| id)
            .collect()
    }

    fn unresolved(&self, candidate: &CandidateMatch) -> Vec<i64> {
        candidate.profile_ids.iter()
            .copied()
            .filter(|id| !matches!(self.ratings.get(id), Some(Some(_))))
            .collect()
    }

    fn listing(&self, candidate: &CandidateMatch) -> Option<MatchListing> {
        let players = candidate.profile_ids.iter()
            .map(|&profile_id| {
                let rating = (*self.ratings.get(&profile_id)?)?;
                Some(ListedPlayer { profile_id, rating })
            })
            .collect::<Option<Vec<_>>>()?;

        Some(MatchListing {
            match_id: candidate.match_id,
            leaderboard_id: self.leaderboard_id,
            players,
            search_player: candidate.search_player,
        })
    }
}

pub struct MatchHistoryClient {
    client: reqwest::Client,
    cache: sled::Db,
    request_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl MatchHistoryClient {
    pub fn new(cache_path: impl AsRef<Path>) -> Result<Self, ApiError> {
        Ok(Self {
            client: reqwest::Client::new(),
            cache: sled::open(cache_path)?,
            request_interval: Duration::from_millis(60_000 / REQUESTS_PER_MINUTE),
            last_request: Mutex::new(None),
        })
    }

    pub async fn leaderboard(&self, leaderboard_id: i64) -> Result<LeaderboardResponse, ApiError> {
        self.get_json("getLeaderBoard2", &[("leaderboard_id", leaderboard_id.to_string())]).await
    }

    pub async fn recent_match_history(&self, profile_ids: &[i64]) -> Result<MatchHistoryResponse, ApiError> {
        self.get_json("getRecentMatchHistory", &[("profile_ids", id_list(profile_ids))]).await
    }

    pub async fn personal_ratings(&self, profile_ids: &[i64], leaderboard_id: i64) -> Result<HashMap<i64, i64>, ApiError> {
        let stats: LeaderboardResponse = self.get_json("getPersonalStat", &[("profile_ids", id_list(profile_ids))]).await?;
        Ok(stats.ratings(leaderboard_id))
    }

    /// Walks match histories outwards from the starting players, yielding every listing whose
    /// players' ratings could be resolved. Request failures are yielded and the crawl continues.
    pub fn discover(&self, state: DiscoveryState) -> impl Stream<Item=Result<MatchListing, ApiError>> + '_ {
        stream::unfold(state, move |mut state| async move {
            let batch = state.next_batch();
            if batch.is_empty() {
                None
            } else {
                let listings = self.discover_batch(&mut state, &batch).await;
                Some((listings, state))
            }
        })
            .flat_map(|listings| stream::iter(listings.into_iter()))
    }

    async fn discover_batch(&self, state: &mut DiscoveryState, batch: &[i64]) -> Vec<Result<MatchListing, ApiError>> {
        let history = match self.recent_match_history(batch).await {
            Ok(history) => history,
            Err(err) => return vec![Err(err)],
        };

        let searched: HashSet<i64> = batch.iter().copied().collect();
        let candidates = candidate_matches(&history, &state.matchtype_ids, &searched, Utc::now())
            .into_iter()
            .filter(|candidate| state.seen_matches.insert(candidate.match_id))
            .collect_vec();

        for candidate in &candidates {
            for &profile_id in &candidate.profile_ids {
                if !state.ratings.contains_key(&profile_id) {
                    state.ratings.insert(profile_id, None);
                    state.pending_players.push(Reverse(profile_id));
                }
            }
        }

        let mut results = Vec::new();
        let to_resolve = candidates.iter()
            .flat_map(|candidate| state.unresolved(candidate))
            .unique()
            .collect_vec();
        for chunk in to_resolve.chunks(RATINGS_PER_QUERY) {
            match self.personal_ratings(chunk, state.leaderboard_id).await {
                Ok(ratings) => {
                    for (profile_id, rating) in ratings {
                        state.ratings.insert(profile_id, Some(rating));
                    }
                }
                Err(err) => results.push(Err(err)),
            }
        }

        for candidate in &candidates {
            match state.listing(candidate) {
                Some(listing) => results.push(Ok(listing)),
                None => debug!("Dropping match {} because a player's rating couldn't be resolved", candidate.match_id),
            }
        }

        results
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let request = self.client.get(format!("{API_ENDPOINT}/{endpoint}"))
            .query(&[("title", "age2")])
            .query(query)
            .build()?;

        let cache_key = request.url().to_string();

        if let Some(bytes) = self.cache.get(&cache_key)? {
            let cached: CachedResponse = pot::from_slice(&bytes)?;
            if Utc::now() - cached.fetched_at < chrono::Duration::seconds(CACHE_TTL_SECONDS) {
                debug!("Using cached response for {cache_key}");
                return Ok(serde_json::from_str(&cached.body)?);
            }
        }

        self.wait_for_request_slot().await;
        info!("Fetching {cache_key}");

        let response = self.client.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Received {status} from {cache_key}");
            return Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
                url: cache_key,
            });
        }

        let body = response.text().await?;
        let parsed = serde_json::from_str(&body)?;
        self.cache.insert(&cache_key, pot::to_vec(&CachedResponse { fetched_at: Utc::now(), body })?)?;

        Ok(parsed)
    }

    async fn wait_for_request_slot(&self) {
        let wait = {
            let mut last_request = self.last_request.lock().unwrap_or_else(|e| e.into_inner());
            let now = Instant::now();
            let next_slot = last_request.map_or(now, |last| last + self.request_interval);
            *last_request = Some(next_slot.max(now));
            next_slot.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

fn id_list(profile_ids: &[i64]) -> String {
    format!("[{}]", profile_ids.iter().join(","))
}
