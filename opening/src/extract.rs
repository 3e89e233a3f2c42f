use std::collections::HashSet;
use log::{debug, warn};
use replay_api::{ActionRecord, ActionType, Operation};

use crate::catalog::Catalog;
use crate::error::ExtractError;
use crate::event::{Event, EventKey, EventKind, Tribute};
use crate::record::Victory;

/// Fixed number of player slots in a recorded game. Slot 0 is gaia.
pub const ROSTER_SIZE: usize = 9;

/// One player's events in the order they were recorded, with a key set for fast membership tests
#[derive(Debug, Clone, Default)]
pub struct PlayerTimeline {
    events: Vec<Event>,
    keys: HashSet<EventKey>,
}

impl PlayerTimeline {
    pub fn from_events(events: Vec<Event>) -> Self {
        let keys = events.iter().map(Event::key).collect();
        Self { events, keys }
    }

    pub fn push(&mut self, event: Event) {
        self.keys.insert(event.key());
        self.events.push(event);
    }

    /// Appends `event` after removing the first earlier event equal to it
    pub fn push_replacing(&mut self, event: Event) {
        if self.keys.contains(&event.key()) {
            if let Some(position) = self.events.iter().position(|e| *e == event) {
                self.events.remove(position);
            }
        }
        self.push(event);
    }

    pub fn contains(&self, key: &EventKey) -> bool {
        self.keys.contains(key)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item=&Event> {
        self.events.iter()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtractedReplay {
    pub timelines: [PlayerTimeline; ROSTER_SIZE],
    /// Slot of the last player to resign, if anyone did
    pub loser: Option<usize>,
}

impl ExtractedReplay {
    /// Slots that did anything at all, in slot order
    pub fn active_slots(&self) -> impl Iterator<Item=(usize, &PlayerTimeline)> {
        self.timelines.iter()
            .enumerate()
            .filter(|(_, timeline)| !timeline.is_empty())
    }

    pub fn victory(&self, slot: usize) -> Victory {
        match self.loser {
            None => Victory::Unknown,
            Some(loser) if loser == slot => Victory::Lost,
            Some(_) => Victory::Won,
        }
    }

    /// Time of the last recorded event across every player
    pub fn duration_ms(&self) -> u64 {
        self.timelines.iter()
            .filter_map(|timeline| timeline.events().last())
            .map(Event::timestamp_ms)
            .max()
            .unwrap_or(0)
    }
}

fn required_field(record: &ActionRecord, action_type: ActionType, field: &'static str) -> Result<i64, ExtractError> {
    record.field_i64(field)
        .ok_or(ExtractError::MissingField { action: action_type.as_tag(), field })
}

fn slot_field(record: &ActionRecord, action_type: ActionType, field: &'static str) -> Result<usize, ExtractError> {
    let slot = required_field(record, action_type, field)?;
    usize::try_from(slot).ok()
        .filter(|slot| *slot < ROSTER_SIZE)
        .ok_or(ExtractError::PlayerSlotOutOfRange {
            action: action_type.as_tag(),
            slot,
            roster_size: ROSTER_SIZE,
        })
}

/// Turns a decoded operation stream into per-player timelines.
///
/// Sync operations advance the clock. Actions this crate doesn't recognize are skipped, but a
/// recognized action missing its player or object is an error.
pub fn extract_timelines<'a>(
    operations: impl IntoIterator<Item=&'a Operation>,
    catalog: &Catalog,
) -> Result<ExtractedReplay, ExtractError> {
    let mut extracted = ExtractedReplay::default();
    let mut clock_ms: u64 = 0;
    let mut skipped_actions = 0usize;

    for operation in operations {
        let record = match operation {
            Operation::Sync { delta_ms } => {
                clock_ms = clock_ms.saturating_add(*delta_ms);
                continue;
            }
            Operation::Action(record) => record,
        };

        let Some(action_type) = record.action_type() else {
            skipped_actions += 1;
            continue;
        };
        let slot = slot_field(record, action_type, "player_id")?;
        let timeline = &mut extracted.timelines[slot];

        match action_type {
            ActionType::UnitQueued => {
                let unit_id = required_field(record, action_type, "unit_id")?;
                timeline.push(Event::new(EventKind::Unit, unit_id, clock_ms, 0, catalog));
            }
            ActionType::TechResearched => {
                let tech_id = required_field(record, action_type, "technology_id")?;
                let duration = catalog.research_time_ms(tech_id);
                timeline.push_replacing(Event::new(EventKind::Tech, tech_id, clock_ms, duration, catalog));
            }
            ActionType::BuildingConstructed => {
                let building_id = required_field(record, action_type, "building_id")?;
                if catalog.is_ignored_building(building_id) {
                    continue;
                }
                timeline.push(Event::new(EventKind::Building, building_id, clock_ms, 0, catalog));
            }
            ActionType::PlayerResigned => {
                timeline.push(Event::resignation(clock_ms));
                if let Some(previous) = extracted.loser.replace(slot) {
                    warn!("Player {slot} resigned after player {previous} already had");
                }
            }
            ActionType::TributeSent => {
                let receiver = slot_field(record, action_type, "player_id_to")?;
                let amount = |resource| record.field_f64(resource).unwrap_or(0.0);
                timeline.push(Event::tribute(clock_ms, Tribute {
                    sender: slot,
                    receiver,
                    food: amount("food"),
                    wood: amount("wood"),
                    gold: amount("gold"),
                    stone: amount("stone"),
                }));
            }
        }
    }

    debug!("Extracted {} events, skipped {skipped_actions} unrecognized actions, game ran {clock_ms}ms",
        extracted.timelines.iter().map(PlayerTimeline::len).sum::<usize>());
    Ok(extracted)
}
