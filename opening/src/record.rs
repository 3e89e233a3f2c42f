use chrono::{DateTime, Utc};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::catalog::Catalog;
use crate::event::{Event, EventKind};
use crate::taxonomy::OpeningFlags;

/// Revision of the classification rules. Stored openings from an older version get redone.
pub type ClassifierVersion = u32;

pub const CLASSIFIER_VERSION: ClassifierVersion = 10;

/// Patch the bundled game data corresponds to
pub const DEFAULT_PATCH_NUMBER: i64 = 104954;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr, JsonSchema,
IntoPrimitive, TryFromPrimitive)]
#[repr(i8)]
pub enum Victory {
    Won = 1,
    Lost = 0,
    Unknown = -1,
}

impl Victory {
    pub fn is_known(&self) -> bool {
        *self != Victory::Unknown
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatchRecord {
    pub match_id: i64,
    pub average_elo: i64,
    pub map_id: i64,
    /// Recording format version reported by the decoder
    pub patch_id: f64,
    pub ladder_id: i64,
    pub patch_number: i64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlayerRecord {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlayerMatchRecord {
    pub match_id: i64,
    pub player_id: i64,
    /// Raw opening mask. `None` until the player has been classified.
    pub opening: Option<u32>,
    pub civilization: i32,
    pub victory: Victory,
    /// Classifier version that produced `opening`, or 0 if it hasn't run
    pub parser_version: ClassifierVersion,
    pub time_parsed: Option<DateTime<Utc>>,
}

impl PlayerMatchRecord {
    pub fn unclassified(match_id: i64, player_id: i64, civilization: i32, victory: Victory) -> Self {
        Self {
            match_id,
            player_id,
            opening: None,
            civilization,
            victory,
            parser_version: 0,
            time_parsed: None,
        }
    }

    pub fn opening_flags(&self) -> Option<OpeningFlags> {
        self.opening.map(OpeningFlags::from_bits_retain)
    }

    /// Whether this record carries an opening from exactly this classifier version
    pub fn is_classified_at(&self, version: ClassifierVersion) -> bool {
        self.opening.is_some() && self.parser_version == version
    }

    pub fn needs_classification(&self, version: ClassifierVersion) -> bool {
        self.parser_version < version
    }
}

/// An event as it's kept in the store. Names aren't stored; they're resolved again on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoredAction {
    pub kind: EventKind,
    pub entity_id: i64,
    pub timestamp_ms: u64,
    pub duration_ms: u64,
}

impl From<&Event> for StoredAction {
    fn from(event: &Event) -> Self {
        Self {
            kind: event.kind(),
            entity_id: event.entity_id(),
            timestamp_ms: event.timestamp_ms(),
            duration_ms: event.duration_ms(),
        }
    }
}

impl StoredAction {
    pub fn to_event(&self, catalog: &Catalog) -> Event {
        match self.kind {
            EventKind::Resign => Event::resignation(self.timestamp_ms),
            kind => Event::new(kind, self.entity_id, self.timestamp_ms, self.duration_ms, catalog),
        }
    }

    /// When this action finished, for research with a duration
    pub fn completed_at_ms(&self) -> u64 {
        self.timestamp_ms.saturating_add(self.duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn victory_serializes_as_a_number() {
        assert_eq!(serde_json::to_string(&Victory::Won).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Victory::Unknown).unwrap(), "-1");
        assert_eq!(serde_json::from_str::<Victory>("0").unwrap(), Victory::Lost);
        assert_eq!(Victory::try_from(-1i8).unwrap(), Victory::Unknown);
    }

    #[test]
    fn stored_actions_rebuild_the_same_event() {
        let catalog = Catalog::default();
        let event = Event::new(EventKind::Tech, 101, 500_000, 130_000, &catalog);
        let rebuilt = StoredAction::from(&event).to_event(&catalog);
        assert_eq!(rebuilt, event);
        assert_eq!(rebuilt.timestamp_ms(), 500_000);
        assert_eq!(rebuilt.completed_at_ms(), 630_000);
    }

    #[test]
    fn classification_state() {
        let mut record = PlayerMatchRecord::unclassified(1, 2, 3, Victory::Won);
        assert!(record.needs_classification(CLASSIFIER_VERSION));
        assert!(!record.is_classified_at(CLASSIFIER_VERSION));
        assert_eq!(record.opening_flags(), None);

        record.opening = Some(0xffffffff);
        record.parser_version = CLASSIFIER_VERSION;
        assert!(!record.needs_classification(CLASSIFIER_VERSION));
        assert!(record.needs_classification(CLASSIFIER_VERSION + 1));
        assert_eq!(record.opening_flags(), Some(OpeningFlags::DID_NOTHING));
    }
}
