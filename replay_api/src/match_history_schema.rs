use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use serde_json::Value;

// Only the fields we read are modeled. The API sends plenty more and serde ignores them.

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    #[serde(default)]
    pub stat_groups: Vec<StatGroup>,
    #[serde(default)]
    pub leaderboard_stats: Vec<LeaderboardStat>,
}

impl LeaderboardResponse {
    /// Ratings on one leaderboard, keyed by profile id. The first rating listed for a profile wins.
    pub fn ratings(&self, leaderboard_id: i64) -> HashMap<i64, i64> {
        let profile_for_group: HashMap<i64, i64> = self.stat_groups.iter()
            .flat_map(|group| group.members.iter())
            .map(|member| (member.personal_statgroup_id, member.profile_id))
            .collect();

        let mut ratings = HashMap::new();
        for stat in &self.leaderboard_stats {
            if stat.leaderboard_id != leaderboard_id {
                continue;
            }
            if let Some(&profile_id) = profile_for_group.get(&stat.statgroup_id) {
                ratings.entry(profile_id).or_insert(stat.rating);
            }
        }
        ratings
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatGroup {
    #[serde(default)]
    pub members: Vec<StatGroupMember>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatGroupMember {
    pub profile_id: i64,
    pub personal_statgroup_id: i64,
    #[serde(default)]
    pub alias: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaderboardStat {
    pub statgroup_id: i64,
    pub leaderboard_id: i64,
    pub rating: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchHistoryResponse {
    #[serde(default)]
    pub match_history_stats: Vec<MatchHistoryStat>,
}

//noinspection SpellCheckingInspection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchHistoryStat {
    pub id: i64,
    pub matchtype_id: i64,
    #[serde(default)]
    pub description: String,
    /// Unix seconds
    pub completiontime: i64,
    #[serde(default)]
    pub matchhistoryreportresults: Vec<ReportResult>,
    #[serde(default)]
    pub matchurls: Vec<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportResult {
    pub profile_id: i64,
}
