use std::convert::Infallible;
use std::path::Path;
use chrono::Utc;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;

use crate::error::StoreError;
use crate::record::{ClassifierVersion, MatchRecord, PlayerMatchRecord, PlayerRecord, StoredAction};
use crate::taxonomy::OpeningFlags;

/// Durable home for matches, players, per-match player results, and their action timelines.
///
/// Records are pot-encoded. Keys are big-endian ids so a match's players sit next to each other.
#[derive(Clone)]
pub struct Store {
    db: sled::Db,
    matches: sled::Tree,
    players: sled::Tree,
    match_players: sled::Tree,
    actions: sled::Tree,
}

fn match_key(match_id: i64) -> [u8; 8] {
    match_id.to_be_bytes()
}

fn match_player_key(match_id: i64, player_id: i64) -> [u8; 16] {
    let mut key = [0; 16];
    key[..8].copy_from_slice(&match_id.to_be_bytes());
    key[8..].copy_from_slice(&player_id.to_be_bytes());
    key
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(pot::from_slice(bytes)?)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(pot::to_vec(value)?)
}

fn transaction_error(err: TransactionError<Infallible>) -> StoreError {
    match err {
        TransactionError::Abort(never) => match never {},
        TransactionError::Storage(err) => StoreError::Database(err),
    }
}

fn decode_values<T: DeserializeOwned>(iter: sled::Iter) -> impl Iterator<Item=Result<T, StoreError>> {
    iter.map(|entry| {
        let (_, value) = entry?;
        decode(&value)
    })
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        debug!("Opening store at {}", path.display());
        Self::from_db(sled::open(path)?)
    }

    /// A store that disappears when dropped
    pub fn temporary() -> Result<Self, StoreError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            matches: db.open_tree("matches")?,
            players: db.open_tree("players")?,
            match_players: db.open_tree("match_players")?,
            actions: db.open_tree("match_player_actions")?,
            db,
        })
    }

    pub fn contains_match(&self, match_id: i64) -> Result<bool, StoreError> {
        Ok(self.matches.contains_key(match_key(match_id))?)
    }

    /// Returns false, and changes nothing, if the match was already stored
    pub fn insert_match(&self, record: &MatchRecord) -> Result<bool, StoreError> {
        let swapped = self.matches.compare_and_swap(
            &match_key(record.match_id)[..], None::<&[u8]>, Some(encode(record)?))?;
        Ok(swapped.is_ok())
    }

    pub fn get_match(&self, match_id: i64) -> Result<Option<MatchRecord>, StoreError> {
        self.matches.get(match_key(match_id))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Returns false, and changes nothing, if the player was already stored
    pub fn insert_player(&self, record: &PlayerRecord) -> Result<bool, StoreError> {
        let swapped = self.players.compare_and_swap(
            &record.id.to_be_bytes()[..], None::<&[u8]>, Some(encode(record)?))?;
        Ok(swapped.is_ok())
    }

    pub fn get_player(&self, player_id: i64) -> Result<Option<PlayerRecord>, StoreError> {
        self.players.get(player_id.to_be_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Stores a player's result together with their timeline. Neither is written if the player
    /// already has a record for this match.
    pub fn insert_match_player(&self, record: &PlayerMatchRecord, actions: &[StoredAction]) -> Result<bool, StoreError> {
        let key = match_player_key(record.match_id, record.player_id);
        let record_bytes = encode(record)?;
        let action_bytes = encode(&actions)?;

        (&self.match_players, &self.actions)
            .transaction(|(match_players, stored_actions)| {
                if match_players.get(&key[..])?.is_some() {
                    return Ok(false);
                }
                match_players.insert(&key[..], record_bytes.as_slice())?;
                stored_actions.insert(&key[..], action_bytes.as_slice())?;
                Ok::<_, ConflictableTransactionError<Infallible>>(true)
            })
            .map_err(transaction_error)
    }

    /// Stores a match with every player's result and timeline in one transaction, so a stored
    /// match always has all of its players. Returns false, and changes nothing, if the match was
    /// already stored. Player rows left behind without their match are overwritten.
    pub fn insert_match_with_players(
        &self,
        record: &MatchRecord,
        players: &[(PlayerMatchRecord, Vec<StoredAction>)],
    ) -> Result<bool, StoreError> {
        let key = match_key(record.match_id);
        let match_bytes = encode(record)?;
        let player_rows = players.iter()
            .map(|(player, actions)| {
                Ok((match_player_key(player.match_id, player.player_id), encode(player)?, encode(actions)?))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        (&self.matches, &self.match_players, &self.actions)
            .transaction(|(matches, match_players, stored_actions)| {
                if matches.get(&key[..])?.is_some() {
                    return Ok(false);
                }
                for (player_key, record_bytes, action_bytes) in &player_rows {
                    match_players.insert(&player_key[..], record_bytes.as_slice())?;
                    stored_actions.insert(&player_key[..], action_bytes.as_slice())?;
                }
                matches.insert(&key[..], match_bytes.as_slice())?;
                Ok::<_, ConflictableTransactionError<Infallible>>(true)
            })
            .map_err(transaction_error)
    }

    pub fn match_player(&self, match_id: i64, player_id: i64) -> Result<Option<PlayerMatchRecord>, StoreError> {
        self.match_players.get(match_player_key(match_id, player_id))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Every player record for one match, in player id order
    pub fn match_players(&self, match_id: i64) -> Result<Vec<PlayerMatchRecord>, StoreError> {
        decode_values(self.match_players.scan_prefix(match_key(match_id))).collect()
    }

    /// A player's stored timeline. Empty if nothing was stored.
    pub fn actions(&self, match_id: i64, player_id: i64) -> Result<Vec<StoredAction>, StoreError> {
        match self.actions.get(match_player_key(match_id, player_id))? {
            Some(bytes) => decode(&bytes),
            None => Ok(Vec::new()),
        }
    }

    /// Player records whose opening is missing or came from an older classifier
    pub fn needing_classification(&self, version: ClassifierVersion) -> Result<Vec<PlayerMatchRecord>, StoreError> {
        self.iter_match_players()
            .filter(|record| match record {
                Ok(record) => record.needs_classification(version),
                Err(_) => true,
            })
            .collect()
    }

    /// Records a classification. The read and the write happen in one transaction.
    pub fn set_opening(&self, match_id: i64, player_id: i64, mask: OpeningFlags, version: ClassifierVersion) -> Result<(), StoreError> {
        let key = match_player_key(match_id, player_id);
        let time_parsed = Utc::now();

        self.match_players
            .transaction(|match_players| {
                let bytes = match_players.get(&key[..])?
                    .ok_or_else(|| ConflictableTransactionError::Abort(
                        StoreError::MissingMatchPlayer { match_id, player_id }))?;
                let mut record: PlayerMatchRecord = decode(&bytes).map_err(ConflictableTransactionError::Abort)?;
                record.opening = Some(mask.bits());
                record.parser_version = version;
                record.time_parsed = Some(time_parsed);
                let encoded = encode(&record).map_err(ConflictableTransactionError::Abort)?;
                match_players.insert(&key[..], encoded)?;
                Ok(())
            })
            .map_err(|err| match err {
                TransactionError::Abort(err) => err,
                TransactionError::Storage(err) => StoreError::Database(err),
            })
    }

    pub fn iter_matches(&self) -> impl Iterator<Item=Result<MatchRecord, StoreError>> {
        decode_values(self.matches.iter())
    }

    pub fn iter_match_players(&self) -> impl Iterator<Item=Result<PlayerMatchRecord, StoreError>> {
        decode_values(self.match_players.iter())
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use super::*;
    use crate::event::EventKind;
    use crate::record::{Victory, CLASSIFIER_VERSION};

    fn match_record(match_id: i64) -> MatchRecord {
        MatchRecord {
            match_id,
            average_elo: 1500,
            map_id: 9,
            patch_id: 37.0,
            ladder_id: 3,
            patch_number: 104954,
            recorded_at: Utc.with_ymd_and_hms(2023, 11, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn matches_are_insert_once() {
        let store = Store::temporary().unwrap();
        assert!(!store.contains_match(7).unwrap());
        assert!(store.insert_match(&match_record(7)).unwrap());
        assert!(store.contains_match(7).unwrap());

        let mut changed = match_record(7);
        changed.average_elo = 2000;
        assert!(!store.insert_match(&changed).unwrap());
        assert_eq!(store.get_match(7).unwrap().unwrap().average_elo, 1500);
        assert_eq!(store.match_count(), 1);
    }

    #[test]
    fn players_are_insert_once() {
        let store = Store::temporary().unwrap();
        assert!(store.insert_player(&PlayerRecord { id: 5, name: Some("Hera".to_string()) }).unwrap());
        assert!(!store.insert_player(&PlayerRecord { id: 5, name: None }).unwrap());
        assert_eq!(store.get_player(5).unwrap().unwrap().name.as_deref(), Some("Hera"));
    }

    #[test]
    fn match_players_keep_their_actions() {
        let store = Store::temporary().unwrap();
        let actions = vec![
            StoredAction { kind: EventKind::Unit, entity_id: 83, timestamp_ms: 0, duration_ms: 0 },
            StoredAction { kind: EventKind::Tech, entity_id: 101, timestamp_ms: 400_000, duration_ms: 130_000 },
        ];
        let record = PlayerMatchRecord::unclassified(7, 5, 2, Victory::Won);
        assert!(store.insert_match_player(&record, &actions).unwrap());
        assert!(!store.insert_match_player(&record, &[]).unwrap());

        assert_eq!(store.actions(7, 5).unwrap(), actions);
        assert!(store.actions(7, 6).unwrap().is_empty());
        assert_eq!(store.match_player(7, 5).unwrap(), Some(record));
    }

    #[test]
    fn matches_are_written_with_all_their_players() {
        let store = Store::temporary().unwrap();
        let actions = vec![StoredAction { kind: EventKind::Unit, entity_id: 74, timestamp_ms: 60_000, duration_ms: 0 }];
        let players = vec![
            (PlayerMatchRecord::unclassified(7, 1, 2, Victory::Won), actions.clone()),
            (PlayerMatchRecord::unclassified(7, 2, 3, Victory::Lost), Vec::new()),
        ];
        assert!(store.insert_match_with_players(&match_record(7), &players).unwrap());
        assert!(store.contains_match(7).unwrap());
        assert_eq!(store.match_players(7).unwrap().len(), 2);
        assert_eq!(store.actions(7, 1).unwrap(), actions);

        let replaced = vec![(PlayerMatchRecord::unclassified(7, 1, 9, Victory::Lost), Vec::new())];
        assert!(!store.insert_match_with_players(&match_record(7), &replaced).unwrap());
        assert_eq!(store.match_player(7, 1).unwrap().unwrap().civilization, 2);
        assert_eq!(store.actions(7, 1).unwrap(), actions);
    }

    #[test]
    fn leftover_players_without_a_match_are_replaced() {
        let store = Store::temporary().unwrap();
        store.insert_match_player(&PlayerMatchRecord::unclassified(8, 1, 2, Victory::Unknown), &[]).unwrap();
        assert!(!store.contains_match(8).unwrap());

        let players = vec![(PlayerMatchRecord::unclassified(8, 1, 5, Victory::Won), Vec::new())];
        assert!(store.insert_match_with_players(&match_record(8), &players).unwrap());
        let stored = store.match_player(8, 1).unwrap().unwrap();
        assert_eq!((stored.civilization, stored.victory), (5, Victory::Won));
    }

    #[test]
    fn reclassifying_keeps_the_rest_of_the_record() {
        let store = Store::temporary().unwrap();
        store.insert_match_player(&PlayerMatchRecord::unclassified(7, 1, 4, Victory::Won), &[]).unwrap();
        store.set_opening(7, 1, OpeningFlags::MAA, 9).unwrap();
        store.set_opening(7, 1, OpeningFlags::FAST_CASTLE, 10).unwrap();

        let record = store.match_player(7, 1).unwrap().unwrap();
        assert_eq!(record.opening_flags(), Some(OpeningFlags::FAST_CASTLE));
        assert_eq!(record.parser_version, 10);
        assert_eq!((record.civilization, record.victory), (4, Victory::Won));
    }

    #[test]
    fn match_players_are_grouped_by_match() {
        let store = Store::temporary().unwrap();
        for (match_id, player_id) in [(7, 2), (8, 1), (7, 1)] {
            let record = PlayerMatchRecord::unclassified(match_id, player_id, 1, Victory::Unknown);
            store.insert_match_player(&record, &[]).unwrap();
        }
        let players: Vec<i64> = store.match_players(7).unwrap().iter().map(|r| r.player_id).collect();
        assert_eq!(players, vec![1, 2]);
    }

    #[test]
    fn classification_round_trip() {
        let store = Store::temporary().unwrap();
        store.insert_match_player(&PlayerMatchRecord::unclassified(7, 1, 1, Victory::Won), &[]).unwrap();
        store.insert_match_player(&PlayerMatchRecord::unclassified(7, 2, 1, Victory::Lost), &[]).unwrap();
        assert_eq!(store.needing_classification(CLASSIFIER_VERSION).unwrap().len(), 2);

        store.set_opening(7, 1, OpeningFlags::MAA, CLASSIFIER_VERSION).unwrap();
        let pending = store.needing_classification(CLASSIFIER_VERSION).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].player_id, 2);

        let classified = store.match_player(7, 1).unwrap().unwrap();
        assert_eq!(classified.opening_flags(), Some(OpeningFlags::MAA));
        assert!(classified.time_parsed.is_some());
        assert_eq!(store.needing_classification(CLASSIFIER_VERSION + 1).unwrap().len(), 2);

        assert!(matches!(store.set_opening(9, 9, OpeningFlags::MAA, CLASSIFIER_VERSION),
            Err(StoreError::MissingMatchPlayer { match_id: 9, player_id: 9 })));
    }

    #[test]
    fn survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = Store::open(dir.path()).unwrap();
            store.insert_match(&match_record(11)).unwrap();
            store.flush().unwrap();
        }
        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.get_match(11).unwrap(), Some(match_record(11)));
    }
}
