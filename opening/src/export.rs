use std::io::Write;
use chrono::{DateTime, Utc};
use log::debug;
use schemars::JsonSchema;
use serde::Serialize;

use crate::error::StoreError;
use crate::record::{ClassifierVersion, PlayerMatchRecord, Victory};
use crate::store::Store;

/// One player's half of an exported match
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct FlatPlayer {
    pub player_id: i64,
    /// Bit `i` of the opening mask at index `i`
    pub opening_flags: [bool; 32],
    pub civilization: i32,
    pub victory: Victory,
    pub parser_version: ClassifierVersion,
}

/// A concluded 1v1 match with both players classified, winner first
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct FlatMatchRow {
    pub match_id: i64,
    pub average_elo: i64,
    pub map_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub patch_id: f64,
    pub ladder_id: i64,
    pub patch_number: i64,
    pub winner: FlatPlayer,
    pub loser: FlatPlayer,
}

fn flat_player(record: &PlayerMatchRecord) -> Option<FlatPlayer> {
    Some(FlatPlayer {
        player_id: record.player_id,
        opening_flags: record.opening_flags()?.decompose(),
        civilization: record.civilization,
        victory: record.victory,
        parser_version: record.parser_version,
    })
}

/// Every stored match that has exactly two players classified at `version` and a known winner
pub fn flat_match_rows(store: &Store, version: ClassifierVersion) -> Result<Vec<FlatMatchRow>, StoreError> {
    let mut rows = Vec::new();
    for record in store.iter_matches() {
        let record = record?;
        let players = store.match_players(record.match_id)?;
        let [first, second] = players.as_slice() else {
            debug!("Not exporting match {} with {} players", record.match_id, players.len());
            continue;
        };
        if !first.is_classified_at(version) || !second.is_classified_at(version) {
            continue;
        }
        let (winner, loser) = match (first.victory, second.victory) {
            (Victory::Won, Victory::Lost) => (first, second),
            (Victory::Lost, Victory::Won) => (second, first),
            _ => continue,
        };
        let (Some(winner), Some(loser)) = (flat_player(winner), flat_player(loser)) else {
            continue;
        };

        rows.push(FlatMatchRow {
            match_id: record.match_id,
            average_elo: record.average_elo,
            map_id: record.map_id,
            recorded_at: record.recorded_at,
            patch_id: record.patch_id,
            ladder_id: record.ladder_id,
            patch_number: record.patch_number,
            winner,
            loser,
        });
    }
    Ok(rows)
}

/// Writes rows as newline-delimited JSON
pub fn write_ndjson<W: Write>(rows: &[FlatMatchRow], mut writer: W) -> std::io::Result<()> {
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_include;
    use chrono::TimeZone;
    use serde_json::json;
    use super::*;
    use crate::record::MatchRecord;
    use crate::taxonomy::OpeningFlags;

    fn add_match(store: &Store, match_id: i64, players: &[(i64, Victory, Option<OpeningFlags>)]) {
        store.insert_match(&MatchRecord {
            match_id,
            average_elo: 1650,
            map_id: 29,
            patch_id: 37.0,
            ladder_id: 3,
            patch_number: 104954,
            recorded_at: Utc.with_ymd_and_hms(2023, 11, 1, 12, 0, 0).unwrap(),
        }).unwrap();
        for &(player_id, victory, opening) in players {
            store.insert_match_player(&PlayerMatchRecord::unclassified(match_id, player_id, 7, victory), &[]).unwrap();
            if let Some(opening) = opening {
                store.set_opening(match_id, player_id, opening, 10).unwrap();
            }
        }
    }

    #[test]
    fn exports_concluded_classified_1v1s_winner_first() {
        let store = Store::temporary().unwrap();
        add_match(&store, 1, &[
            (10, Victory::Lost, Some(OpeningFlags::PREMILL_DRUSH)),
            (20, Victory::Won, Some(OpeningFlags::FAST_CASTLE)),
        ]);
        add_match(&store, 2, &[
            (10, Victory::Unknown, Some(OpeningFlags::MAA)),
            (20, Victory::Unknown, Some(OpeningFlags::MAA)),
        ]);
        add_match(&store, 3, &[
            (10, Victory::Won, Some(OpeningFlags::MAA)),
            (20, Victory::Lost, None),
        ]);
        add_match(&store, 4, &[(10, Victory::Won, Some(OpeningFlags::MAA))]);

        let rows = flat_match_rows(&store, 10).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.match_id, 1);
        assert_eq!(row.winner.player_id, 20);
        assert!(row.winner.opening_flags[20]);
        assert_eq!(row.loser.player_id, 10);
        assert!(row.loser.opening_flags[0]);

        assert!(flat_match_rows(&store, 11).unwrap().is_empty());
    }

    #[test]
    fn ndjson_has_one_row_per_line() {
        let store = Store::temporary().unwrap();
        add_match(&store, 1, &[
            (10, Victory::Won, Some(OpeningFlags::MAA)),
            (20, Victory::Lost, Some(OpeningFlags::DID_NOTHING)),
        ]);
        let rows = flat_match_rows(&store, 10).unwrap();

        let mut out = Vec::new();
        write_ndjson(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);

        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_json_include!(actual: parsed, expected: json!({
            "match_id": 1,
            "average_elo": 1650,
            "winner": {"player_id": 10, "civilization": 7, "victory": 1, "parser_version": 10},
            "loser": {"player_id": 20, "victory": 0},
        }));
        assert_eq!(parsed["loser"]["opening_flags"].as_array().unwrap().len(), 32);
    }
}
