use std::path::Path;
use chrono::Utc;
use itertools::Itertools;
use log::{debug, info, warn};
use replay_api::DecodedReplay;

use crate::catalog::Catalog;
use crate::classify::classify;
use crate::error::{Error, StoreError};
use crate::extract::extract_timelines;
use crate::file_name::ReplayFileName;
use crate::record::{ClassifierVersion, MatchRecord, PlayerMatchRecord, PlayerRecord, StoredAction};
use crate::store::Store;
use crate::stream::read_replay;

/// Civilization recorded when the header doesn't cover a player's slot
pub const UNKNOWN_CIVILIZATION: i32 = -1;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ClassifySummary {
    pub classified: usize,
    /// Records with no stored timeline to classify from
    pub skipped: usize,
}

/// Stores one decoded replay. Returns false without touching the store if the match is already
/// there. Nothing is written when the replay can't be extracted, and the match record is only
/// visible once all of its players are.
pub fn ingest_replay(
    store: &Store,
    catalog: &Catalog,
    file_name: &ReplayFileName,
    replay: &DecodedReplay,
    patch_number: i64,
) -> Result<bool, Error> {
    if store.contains_match(file_name.match_id)? {
        debug!("Match {} is already stored", file_name.match_id);
        return Ok(false);
    }

    let extracted = extract_timelines(&replay.operations, catalog)?;
    let active = extracted.active_slots().collect_vec();
    if active.len() > file_name.profile_ids.len() {
        return Err(Error::TooManyPlayers {
            active_players: active.len(),
            profiles: file_name.profile_ids.len(),
        });
    }

    for (&profile_id, (slot, _)) in file_name.profile_ids.iter().zip(&active) {
        let name = replay.header_player(*slot).map(|player| player.name.clone());
        store.insert_player(&PlayerRecord { id: profile_id, name })?;
    }

    let players = file_name.profile_ids.iter().zip(&active)
        .map(|(&profile_id, (slot, timeline))| {
            let civilization = replay.header_player(*slot)
                .map(|player| player.civ_id)
                .unwrap_or(UNKNOWN_CIVILIZATION);
            let record = PlayerMatchRecord::unclassified(
                file_name.match_id, profile_id, civilization, extracted.victory(*slot));
            (record, timeline.iter().map(StoredAction::from).collect_vec())
        })
        .collect_vec();

    let inserted = store.insert_match_with_players(&MatchRecord {
        match_id: file_name.match_id,
        average_elo: file_name.average_elo,
        map_id: replay.header.map_id,
        patch_id: replay.header.save_version,
        ladder_id: file_name.ladder_id,
        patch_number,
        recorded_at: Utc::now(),
    }, &players)?;
    if !inserted {
        debug!("Match {} was stored while this replay was being read", file_name.match_id);
        return Ok(false);
    }

    if active.len() < file_name.profile_ids.len() {
        warn!("Match {} named {} players but only {} did anything", file_name.match_id,
            file_name.profile_ids.len(), active.len());
    }
    Ok(true)
}

/// Reads, parses, and stores one decoded replay file
pub fn ingest_file(store: &Store, catalog: &Catalog, path: &Path, patch_number: i64) -> Result<bool, Error> {
    let file_name = ReplayFileName::from_path(path)?;
    if store.contains_match(file_name.match_id)? {
        debug!("Skipping {}, match is already stored", path.display());
        return Ok(false);
    }
    let replay = read_replay(path)?;
    ingest_replay(store, catalog, &file_name, &replay, patch_number)
}

/// Classifies every stored player whose opening is missing or stale
pub fn classify_pending(store: &Store, catalog: &Catalog, version: ClassifierVersion) -> Result<ClassifySummary, StoreError> {
    let pending = store.needing_classification(version)?;
    info!("Classifying {} player records at version {version}", pending.len());

    let mut summary = ClassifySummary::default();
    for record in pending {
        let actions = store.actions(record.match_id, record.player_id)?;
        if actions.is_empty() {
            debug!("No timeline for player {} in match {}", record.player_id, record.match_id);
            summary.skipped += 1;
            continue;
        }

        let events = actions.iter().map(|action| action.to_event(catalog)).collect_vec();
        let mask = classify(&events);
        store.set_opening(record.match_id, record.player_id, mask, version)?;
        summary.classified += 1;

        if summary.classified % 1000 == 0 {
            info!("Classified {} player records", summary.classified);
        }
    }

    store.flush()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use replay_api::{ActionRecord, ActionType, HeaderPlayerBuilder, Operation, ReplayHeader};
    use serde_json::json;
    use super::*;
    use crate::record::{Victory, CLASSIFIER_VERSION};
    use crate::taxonomy::OpeningFlags;

    fn replay(operations: Vec<Operation>) -> DecodedReplay {
        DecodedReplay {
            header: ReplayHeader {
                map_id: 29,
                map_name: Some("Arabia".to_string()),
                save_version: 37.0,
                players: vec![
                    HeaderPlayerBuilder::default().player_id(1usize).name("Hera").civ_id(9).build().unwrap(),
                    HeaderPlayerBuilder::default().player_id(2usize).name("Liereyy").civ_id(4).build().unwrap(),
                ],
            },
            operations,
        }
    }

    fn action(action_type: ActionType, fields: serde_json::Value) -> Operation {
        Operation::Action(ActionRecord::new(action_type, fields))
    }

    fn file_name() -> ReplayFileName {
        ReplayFileName::parse("100_11_vs_22-1800(3).aoe2record").unwrap()
    }

    #[test]
    fn stores_both_players_once() {
        let store = Store::temporary().unwrap();
        let catalog = Catalog::default();
        let replay = replay(vec![
            action(ActionType::BuildingConstructed, json!({"player_id": 1, "building_id": 12})),
            action(ActionType::UnitQueued, json!({"player_id": 1, "unit_id": 74})),
            action(ActionType::UnitQueued, json!({"player_id": 2, "unit_id": 83})),
            action(ActionType::PlayerResigned, json!({"player_id": 2})),
        ]);

        assert!(ingest_replay(&store, &catalog, &file_name(), &replay, 104954).unwrap());
        assert!(!ingest_replay(&store, &catalog, &file_name(), &replay, 104954).unwrap());

        let stored = store.get_match(100).unwrap().unwrap();
        assert_eq!(stored.average_elo, 1800);
        assert_eq!(stored.map_id, 29);

        let players = store.match_players(100).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!((players[0].player_id, players[0].civilization, players[0].victory), (11, 9, Victory::Won));
        assert_eq!((players[1].player_id, players[1].civilization, players[1].victory), (22, 4, Victory::Lost));
        assert_eq!(store.actions(100, 11).unwrap().len(), 2);
        assert_eq!(store.get_player(22).unwrap().unwrap().name.as_deref(), Some("Liereyy"));
    }

    #[test]
    fn interrupted_ingest_is_retried() {
        let store = Store::temporary().unwrap();
        let catalog = Catalog::default();
        // A player row that made it to disk without its match
        store.insert_match_player(&PlayerMatchRecord::unclassified(100, 11, 0, Victory::Unknown), &[]).unwrap();
        assert!(!store.contains_match(100).unwrap());

        let replay = replay(vec![
            action(ActionType::UnitQueued, json!({"player_id": 1, "unit_id": 74})),
            action(ActionType::UnitQueued, json!({"player_id": 2, "unit_id": 83})),
            action(ActionType::PlayerResigned, json!({"player_id": 1})),
        ]);
        assert!(ingest_replay(&store, &catalog, &file_name(), &replay, 104954).unwrap());

        let players = store.match_players(100).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!((players[0].civilization, players[0].victory), (9, Victory::Lost));
        assert_eq!(store.actions(100, 11).unwrap().len(), 1);
    }

    #[test]
    fn too_many_players_is_an_error() {
        let store = Store::temporary().unwrap();
        let replay = replay((1..=3)
            .map(|slot| action(ActionType::UnitQueued, json!({"player_id": slot, "unit_id": 83})))
            .collect());
        assert!(matches!(ingest_replay(&store, &Catalog::default(), &file_name(), &replay, 104954),
            Err(Error::TooManyPlayers { active_players: 3, profiles: 2 })));
        assert!(!store.contains_match(100).unwrap());
    }

    #[test]
    fn malformed_replays_store_nothing() {
        let store = Store::temporary().unwrap();
        let replay = replay(vec![action(ActionType::UnitQueued, json!({"player_id": 1}))]);
        assert!(matches!(ingest_replay(&store, &Catalog::default(), &file_name(), &replay, 104954),
            Err(Error::Extract(_))));
        assert!(!store.contains_match(100).unwrap());
        assert!(store.get_player(11).unwrap().is_none());
    }

    #[test]
    fn classifies_pending_records() {
        let store = Store::temporary().unwrap();
        let catalog = Catalog::default();
        let replay = replay(vec![
            action(ActionType::BuildingConstructed, json!({"player_id": 1, "building_id": 12})),
            action(ActionType::UnitQueued, json!({"player_id": 1, "unit_id": 74})),
            action(ActionType::UnitQueued, json!({"player_id": 2, "unit_id": 83})),
        ]);
        ingest_replay(&store, &catalog, &file_name(), &replay, 104954).unwrap();

        let summary = classify_pending(&store, &catalog, CLASSIFIER_VERSION).unwrap();
        assert_eq!(summary, ClassifySummary { classified: 2, skipped: 0 });

        let drusher = store.match_player(100, 11).unwrap().unwrap();
        assert_eq!(drusher.opening_flags(), Some(OpeningFlags::PREMILL_DRUSH));
        assert_eq!(drusher.parser_version, CLASSIFIER_VERSION);
        let idle = store.match_player(100, 22).unwrap().unwrap();
        assert_eq!(idle.opening_flags(), Some(OpeningFlags::DID_NOTHING));

        let again = classify_pending(&store, &catalog, CLASSIFIER_VERSION).unwrap();
        assert_eq!(again, ClassifySummary::default());
        let bumped = classify_pending(&store, &catalog, CLASSIFIER_VERSION + 1).unwrap();
        assert_eq!(bumped.classified, 2);
    }
}
