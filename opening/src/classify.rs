use std::ops::ControlFlow;
use log::trace;

use crate::event::{Event, EventKind};
use crate::tables;
use crate::taxonomy::OpeningFlags;

/// Castle Age has to be clicked before this (15:20) for the opening to count as a fast castle
pub const FAST_CASTLE_THRESHOLD_MS: u64 = 920_000;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Age {
    #[default]
    Dark,
    Feudal,
    Castle,
    Imperial,
}

#[derive(Debug, Clone, Default)]
struct ClassifierState {
    mask: OpeningFlags,
    age: Age,
    /// Set once the first military production has decided the opening. Later production only
    /// counts as a follow-up.
    opening_locked: bool,
    mill_built: bool,
    barracks_before_mill: bool,
    has_archers: bool,
    has_scouts: bool,
    has_skirmishers: bool,
}

impl ClassifierState {
    fn apply(&mut self, event: &Event) -> ControlFlow<()> {
        match event.kind() {
            EventKind::Tech => return self.apply_tech(event),
            EventKind::Building => self.apply_building(event),
            EventKind::Unit => self.apply_unit(event),
            EventKind::Resign | EventKind::Tribute => {}
        }
        ControlFlow::Continue(())
    }

    fn apply_tech(&mut self, event: &Event) -> ControlFlow<()> {
        match event.name() {
            "Feudal Age" => self.age = Age::Feudal,
            "Castle Age" => {
                self.age = Age::Castle;
                if event.timestamp_ms() < FAST_CASTLE_THRESHOLD_MS {
                    self.mask |= OpeningFlags::FAST_CASTLE;
                }
            }
            "Imperial Age" => {
                self.age = Age::Imperial;
                return ControlFlow::Break(());
            }
            "Crossbowman" => self.in_castle(OpeningFlags::CASTLE_CROSSBOWS),
            "Elite Skirmisher" => self.in_castle(OpeningFlags::CASTLE_ELITE_SKIRM),
            "Pikeman" => self.in_castle(OpeningFlags::CASTLE_PIKEMEN),
            "Eagle Warrior" => self.in_castle(OpeningFlags::CASTLE_EAGLES),
            "Man-at-Arms" => {
                // Only upgrades a pure drush into a drush into men-at-arms
                let drush_only = self.mask == OpeningFlags::PREMILL_DRUSH
                    || self.mask == OpeningFlags::POSTMILL_DRUSH;
                if self.age == Age::Feudal && drush_only {
                    self.mask |= OpeningFlags::MAA;
                }
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn apply_building(&mut self, event: &Event) {
        match event.name() {
            "Mill" => self.mill_built = true,
            "Barracks" => self.barracks_before_mill = !self.mill_built,
            "Watch Tower" if self.age == Age::Feudal => self.mask |= OpeningFlags::FEUDAL_TOWERS,
            _ => {}
        }
    }

    fn apply_unit(&mut self, event: &Event) {
        match event.name() {
            "Militia" => {
                if self.opening_locked {
                    return;
                }
                match self.age {
                    Age::Dark if self.barracks_before_mill => self.mask |= OpeningFlags::PREMILL_DRUSH,
                    Age::Dark => self.mask |= OpeningFlags::POSTMILL_DRUSH,
                    Age::Feudal => self.mask |= OpeningFlags::MAA,
                    Age::Castle | Age::Imperial => {}
                }
                self.opening_locked = true;
            }
            "Archer" => if !self.has_archers {
                self.has_archers = true;
                self.feudal_production(OpeningFlags::FEUDAL_ARCHER_OPENING, OpeningFlags::FEUDAL_ARCHER_FOLLOWUP);
            }
            "Scout" => if !self.has_scouts {
                self.has_scouts = true;
                self.feudal_production(OpeningFlags::FEUDAL_SCOUT_OPENING, OpeningFlags::FEUDAL_SCOUT_FOLLOWUP);
            }
            "Skirmisher" => if !self.has_skirmishers {
                self.has_skirmishers = true;
                self.feudal_production(OpeningFlags::FEUDAL_SKIRM_OPENING, OpeningFlags::FEUDAL_SKIRM_FOLLOWUP);
            }
            "Eagle" => {
                if self.age == Age::Feudal {
                    self.mask |= OpeningFlags::FEUDAL_EAGLES;
                }
                self.opening_locked = true;
            }
            "Knight" => self.in_castle(OpeningFlags::CASTLE_KNIGHTS),
            "Camel" => self.in_castle(OpeningFlags::CASTLE_CAMELS),
            "Mangonel" | "Scorpion" | "Battering Ram" => self.in_castle(OpeningFlags::CASTLE_SIEGE),
            _ if tables::is_unique_unit(event.entity_id()) => self.in_castle(OpeningFlags::CASTLE_UU),
            _ => {}
        }
    }

    /// The first production of a feudal unit type is the opening if nothing else was, and a
    /// follow-up otherwise. Either way the opening is decided afterwards.
    fn feudal_production(&mut self, opening: OpeningFlags, followup: OpeningFlags) {
        if self.age == Age::Feudal {
            self.mask |= if self.opening_locked { followup } else { opening };
        }
        self.opening_locked = true;
    }

    fn in_castle(&mut self, flag: OpeningFlags) {
        if self.age == Age::Castle {
            self.mask |= flag;
        }
    }
}

/// Classifies one player's opening from their event timeline. Events after Imperial Age is
/// clicked are never looked at, and a player who did nothing recognizable gets
/// [OpeningFlags::DID_NOTHING].
pub fn classify<'a>(events: impl IntoIterator<Item=&'a Event>) -> OpeningFlags {
    let mut state = ClassifierState::default();
    for event in events {
        if state.apply(event).is_break() {
            trace!("Stopped classifying at {event}");
            break;
        }
    }
    state.mask.normalized()
}
