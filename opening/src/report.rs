use std::collections::BTreeMap;
use std::fmt::Write;
use itertools::Itertools;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::error::StoreError;
use crate::event::{format_game_time, EventKind};
use crate::record::{ClassifierVersion, PlayerMatchRecord, StoredAction, Victory};
use crate::store::Store;
use crate::tables;
use crate::taxonomy::{named_patterns, NamedPattern};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupStats {
    pub first: &'static str,
    pub second: &'static str,
    /// Concluded games between the two openings
    pub total: u64,
    pub first_wins: u64,
    pub second_wins: u64,
    /// Games between the two that never recorded a resignation
    pub unknown: u64,
    /// `total` as a fraction of every concluded game
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MirrorStats {
    pub opening: &'static str,
    pub total: u64,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CivilizationStats {
    pub civilization: String,
    pub civ_id: i32,
    pub total: u64,
    pub wins: u64,
    pub losses: u64,
    /// Fraction of player slots in concluded games that picked this civilization
    pub play_rate: f64,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeUpStats {
    pub age: &'static str,
    pub count: usize,
    pub mean_ms: u64,
    pub median_ms: u64,
    pub p10_ms: u64,
    pub p90_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub total_concluded: u64,
    pub matchups: Vec<MatchupStats>,
    pub mirrors: Vec<MirrorStats>,
    pub civilizations: Vec<CivilizationStats>,
    pub age_ups: Vec<AgeUpStats>,
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 { 0.0 } else { numerator as f64 / denominator as f64 }
}

fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Each concluded game has exactly one winner
pub fn total_concluded(records: &[PlayerMatchRecord]) -> u64 {
    records.iter().filter(|record| record.victory == Victory::Won).count() as u64
}

/// Every ordered pair of distinct classified players that shared a match
fn opposing_pairs(records: &[PlayerMatchRecord]) -> Vec<(&PlayerMatchRecord, &PlayerMatchRecord)> {
    let by_match: BTreeMap<i64, Vec<&PlayerMatchRecord>> = records.iter()
        .filter(|record| record.opening.is_some())
        .map(|record| (record.match_id, record))
        .into_group_map()
        .into_iter()
        .collect();

    by_match.values()
        .flat_map(|players| {
            players.iter()
                .cartesian_product(players.iter())
                .filter(|(a, b)| a.player_id != b.player_id)
                .map(|(a, b)| (*a, *b))
                .collect_vec()
        })
        .collect()
}

fn matches_pattern(record: &PlayerMatchRecord, named: &NamedPattern) -> bool {
    record.opening_flags().map_or(false, |mask| named.pattern.matches(mask))
}

/// Head-to-head results for every pair of distinct patterns, and mirror counts for each pattern.
/// Pairs with no concluded game and mirrors nobody played are left out.
pub fn matchup_stats(records: &[PlayerMatchRecord], patterns: &[NamedPattern]) -> (Vec<MatchupStats>, Vec<MirrorStats>) {
    let concluded = total_concluded(records);
    let pairs = opposing_pairs(records);

    let mut matchups = Vec::new();
    for (i, first) in patterns.iter().enumerate() {
        for second in &patterns[i + 1..] {
            let mut stats = MatchupStats {
                first: first.name,
                second: second.name,
                total: 0,
                first_wins: 0,
                second_wins: 0,
                unknown: 0,
                share: 0.0,
            };
            for (a, b) in &pairs {
                if !matches_pattern(a, first) || !matches_pattern(b, second) {
                    continue;
                }
                match a.victory {
                    Victory::Unknown => stats.unknown += 1,
                    victory => {
                        stats.total += 1;
                        if victory == Victory::Won {
                            stats.first_wins += 1;
                        }
                        if b.victory == Victory::Won {
                            stats.second_wins += 1;
                        }
                    }
                }
            }
            if stats.total > 0 {
                stats.share = ratio(stats.total, concluded);
                matchups.push(stats);
            }
        }
    }

    let mirrors = patterns.iter()
        .filter_map(|named| {
            let total = pairs.iter()
                .filter(|(a, b)| a.victory == Victory::Won && matches_pattern(a, named) && matches_pattern(b, named))
                .count() as u64;
            (total > 0).then(|| MirrorStats { opening: named.name, total, share: ratio(total, concluded) })
        })
        .collect();

    (matchups, mirrors)
}

pub fn civilization_stats(records: &[PlayerMatchRecord], catalog: &Catalog) -> Vec<CivilizationStats> {
    let concluded = total_concluded(records);
    records.iter()
        .filter(|record| record.victory.is_known())
        .map(|record| (record.civilization, record.victory))
        .into_group_map()
        .into_iter()
        .map(|(civ_id, victories)| {
            let wins = victories.iter().filter(|v| **v == Victory::Won).count() as u64;
            let total = victories.len() as u64;
            CivilizationStats {
                civilization: catalog.civilization_name(civ_id)
                    .map(str::to_string)
                    .unwrap_or_else(|| civ_id.to_string()),
                civ_id,
                total,
                wins,
                losses: total - wins,
                play_rate: ratio(total, concluded) / 2.0,
                win_rate: ratio(wins, total),
            }
        })
        .sorted_by(|a, b| a.civilization.cmp(&b.civilization).then(a.civ_id.cmp(&b.civ_id)))
        .collect()
}

/// Nearest-rank percentile of an already sorted, non-empty slice
fn percentile(sorted: &[u64], p: u64) -> u64 {
    let rank = (p as usize * sorted.len() + 99) / 100;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// When each age finished across every timeline
pub fn age_up_stats<'a>(timelines: impl IntoIterator<Item=&'a [StoredAction]>) -> Vec<AgeUpStats> {
    let ages = [
        (tables::FEUDAL_AGE, "Feudal Age"),
        (tables::CASTLE_AGE, "Castle Age"),
        (tables::IMPERIAL_AGE, "Imperial Age"),
    ];
    let mut completions: BTreeMap<i64, Vec<u64>> = BTreeMap::new();
    for timeline in timelines {
        for action in timeline {
            if action.kind == EventKind::Tech && ages.iter().any(|(id, _)| *id == action.entity_id) {
                completions.entry(action.entity_id).or_default().push(action.completed_at_ms());
            }
        }
    }

    ages.iter()
        .filter_map(|&(id, age)| {
            let mut times = completions.remove(&id)?;
            times.sort_unstable();
            Some(AgeUpStats {
                age,
                count: times.len(),
                mean_ms: times.iter().sum::<u64>() / times.len() as u64,
                median_ms: percentile(&times, 50),
                p10_ms: percentile(&times, 10),
                p90_ms: percentile(&times, 90),
            })
        })
        .collect()
}

impl Report {
    pub fn build<'a>(
        records: &[PlayerMatchRecord],
        timelines: impl IntoIterator<Item=&'a [StoredAction]>,
        catalog: &Catalog,
    ) -> Self {
        let (matchups, mirrors) = matchup_stats(records, &named_patterns());
        Self {
            total_concluded: total_concluded(records),
            matchups,
            mirrors,
            civilizations: civilization_stats(records, catalog),
            age_ups: age_up_stats(timelines),
        }
    }

    /// Reports on every player record classified at `version`
    pub fn from_store(store: &Store, catalog: &Catalog, version: ClassifierVersion) -> Result<Self, StoreError> {
        let records: Vec<PlayerMatchRecord> = store.iter_match_players()
            .filter_ok(|record| record.is_classified_at(version))
            .collect::<Result<_, _>>()?;
        let timelines: Vec<Vec<StoredAction>> = records.iter()
            .map(|record| store.actions(record.match_id, record.player_id))
            .collect::<Result<_, _>>()?;
        Ok(Self::build(&records, timelines.iter().map(Vec::as_slice), catalog))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing to a String can't fail
        let _ = self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "Concluded matches: {}", self.total_concluded)?;
        writeln!(out, "\nMatchups")?;
        for m in &self.matchups {
            writeln!(out, "{} vs {}: {} ({}), {}:{} ({}:{}) with {} unknowns",
                     m.first, m.second, m.total, percent(m.share), m.first_wins, m.second_wins,
                     percent(ratio(m.first_wins, m.total)), percent(ratio(m.second_wins, m.total)), m.unknown)?;
        }
        writeln!(out, "\nMirrors")?;
        for m in &self.mirrors {
            writeln!(out, "{} vs {} : {} ({})", m.opening, m.opening, m.total, percent(m.share))?;
        }
        writeln!(out, "\nCivilizations")?;
        for c in &self.civilizations {
            writeln!(out, "{} - {} ({}), {}:{} ({})",
                     c.civilization, c.total, percent(c.play_rate), c.wins, c.losses, percent(c.win_rate))?;
        }
        writeln!(out, "\nAge up times")?;
        for a in &self.age_ups {
            writeln!(out, "{}: n={}, mean {}, median {}, p10 {}, p90 {}", a.age, a.count,
                     format_game_time(a.mean_ms), format_game_time(a.median_ms),
                     format_game_time(a.p10_ms), format_game_time(a.p90_ms))?;
        }
        Ok(())
    }
}
