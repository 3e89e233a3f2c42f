use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use schemars::JsonSchema;
use serde::{Serialize, Deserialize};
use serde_repr::{Serialize_repr, Deserialize_repr};

use crate::catalog::Catalog;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize_repr, Deserialize_repr,
JsonSchema, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum EventKind {
    Unit = 1,
    Building = 2,
    Tech = 3,
    Resign = 4,
    Tribute = 5,
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EventKind::Unit => "UNIT",
            EventKind::Building => "BUILDING",
            EventKind::Tech => "TECH",
            EventKind::Resign => "RESIGN",
            EventKind::Tribute => "TRIBUTE",
        })
    }
}

/// Resources one player sent another. Receiver is a roster slot like the sender.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tribute {
    pub sender: usize,
    pub receiver: usize,
    pub food: f64,
    pub wood: f64,
    pub gold: f64,
    pub stone: f64,
}

impl Tribute {
    pub fn is_empty(&self) -> bool {
        self.food <= 0.0 && self.wood <= 0.0 && self.gold <= 0.0 && self.stone <= 0.0
    }
}

/// What makes two events "the same" for deduplication and membership tests
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub kind: EventKind,
    pub name: String,
}

/// One timestamped action a player took. Names are resolved once, at construction.
///
/// Equality and hashing only look at the kind and the resolved name, so the same tech researched
/// twice compares equal no matter when each research happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    kind: EventKind,
    entity_id: i64,
    name: String,
    timestamp_ms: u64,
    duration_ms: u64,
    tribute: Option<Tribute>,
}

impl Event {
    pub fn new(kind: EventKind, entity_id: i64, timestamp_ms: u64, duration_ms: u64, catalog: &Catalog) -> Self {
        Self {
            kind,
            entity_id,
            name: catalog.resolve_name(kind, entity_id),
            timestamp_ms,
            duration_ms,
            tribute: None,
        }
    }

    /// For callers that already know the display name
    pub fn with_name(kind: EventKind, entity_id: i64, name: impl Into<String>, timestamp_ms: u64, duration_ms: u64) -> Self {
        Self {
            kind,
            entity_id,
            name: name.into(),
            timestamp_ms,
            duration_ms,
            tribute: None,
        }
    }

    pub fn resignation(timestamp_ms: u64) -> Self {
        Self::with_name(EventKind::Resign, 0, "Resignation", timestamp_ms, 0)
    }

    pub fn tribute(timestamp_ms: u64, tribute: Tribute) -> Self {
        Self {
            tribute: Some(tribute),
            ..Self::with_name(EventKind::Tribute, 0, "Tribute", timestamp_ms, 0)
        }
    }

    pub fn kind(&self) -> EventKind { self.kind }

    pub fn entity_id(&self) -> i64 { self.entity_id }

    pub fn name(&self) -> &str { &self.name }

    pub fn timestamp_ms(&self) -> u64 { self.timestamp_ms }

    pub fn duration_ms(&self) -> u64 { self.duration_ms }

    pub fn tribute_payload(&self) -> Option<&Tribute> { self.tribute.as_ref() }

    /// When a research finishes. Everything else completes the moment it happens.
    pub fn completed_at_ms(&self) -> u64 {
        self.timestamp_ms.saturating_add(self.duration_ms)
    }

    pub fn key(&self) -> EventKey {
        EventKey { kind: self.kind, name: self.name.clone() }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

impl Eq for Event {}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.name.hash(state);
    }
}

/// Formats a game time as zero-padded `mm:ss`. Minutes keep counting past an hour.
pub fn format_game_time(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms / 1000) % 60;
    format!("{:02}:{:02}", minutes, seconds)
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} {}", self.kind, self.name, format_game_time(self.timestamp_ms))?;
        if self.duration_ms > 0 {
            write!(f, " -> {}", format_game_time(self.completed_at_ms()))?;
        }
        if let Some(tribute) = &self.tribute {
            write!(f, " (food {}, wood {}, gold {}, stone {} to player {})",
                   tribute.food, tribute.wood, tribute.gold, tribute.stone, tribute.receiver)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use super::*;

    #[test]
    fn equality_ignores_time_and_id() {
        let catalog = Catalog::default();
        let early = Event::new(EventKind::Tech, 22, 10_000, 25_000, &catalog);
        let late = Event::new(EventKind::Tech, 22, 90_000, 25_000, &catalog);
        assert_eq!(early, late);

        let set: HashSet<Event> = [early, late].into_iter().collect();
        assert_eq!(set.len(), 1);

        let unit = Event::with_name(EventKind::Unit, 22, "Loom", 0, 0);
        assert_ne!(unit, Event::new(EventKind::Tech, 22, 0, 0, &catalog));
    }

    #[test]
    fn names_resolve_at_construction() {
        let catalog = Catalog::default();
        assert_eq!(Event::new(EventKind::Unit, 448, 0, 0, &catalog).name(), "Scout");
        assert_eq!(Event::new(EventKind::Unit, 123456, 0, 0, &catalog).name(), "123456");
        assert_eq!(Event::resignation(5).name(), "Resignation");
    }

    #[test]
    fn game_time_formatting() {
        assert_eq!(format_game_time(0), "00:00");
        assert_eq!(format_game_time(59_999), "00:59");
        assert_eq!(format_game_time(61_000), "01:01");
        assert_eq!(format_game_time(3_723_000), "62:03");
    }

    #[test]
    fn display_includes_completion_for_research() {
        let catalog = Catalog::default();
        let feudal = Event::with_name(EventKind::Tech, 101, "Feudal Age", 500_000, 130_000);
        assert_eq!(feudal.to_string(), "TECH: Feudal Age 08:20 -> 10:30");
        assert_eq!(Event::new(EventKind::Unit, 4, 65_000, 0, &catalog).to_string(), "UNIT: Archer 01:05");
    }

    #[test]
    fn kinds_round_trip_through_their_numbers() {
        assert_eq!(u8::from(EventKind::Tribute), 5);
        assert_eq!(EventKind::try_from(2u8).unwrap(), EventKind::Building);
        assert!(EventKind::try_from(0u8).is_err());
    }
}
