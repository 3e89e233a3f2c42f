use std::collections::HashSet;
use std::fmt::Write;
use itertools::Itertools;
use num_enum::TryFromPrimitive;
use replay_api::DecodedReplay;
use strum::IntoStaticStr;

use crate::catalog::Catalog;
use crate::classify::classify;
use crate::event::{format_game_time, Event, EventKind};
use crate::extract::{ExtractedReplay, PlayerTimeline};
use crate::record::Victory;
use crate::tables;

#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive, IntoStaticStr)]
#[repr(i32)]
pub enum Color {
    Blue = 0,
    Red,
    Green,
    Yellow,
    Cyan,
    Purple,
    Grey,
    Orange,
}

/// Which per-player sections a summary includes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
    pub include_units: bool,
    /// List each unit type once, at its first production
    pub only_unique_units: bool,
    pub include_buildings: bool,
    pub only_unique_buildings: bool,
    pub include_techs: bool,
    pub include_player_openings: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            include_units: true,
            only_unique_units: true,
            include_buildings: true,
            only_unique_buildings: true,
            include_techs: true,
            include_player_openings: true,
        }
    }
}

impl SummaryOptions {
    /// Just the roster, tributes, and duration
    pub fn roster_only() -> Self {
        Self {
            include_units: false,
            only_unique_units: false,
            include_buildings: false,
            only_unique_buildings: false,
            include_techs: false,
            include_player_openings: false,
        }
    }

    fn any_player_section(&self) -> bool {
        self.include_units || self.include_buildings || self.include_techs || self.include_player_openings
    }
}

struct RosterLine {
    name: String,
    civilization: String,
    color: String,
    team: usize,
    victory: &'static str,
    ages: [String; 3],
}

fn age_completion(timeline: &PlayerTimeline, tech_id: i64) -> String {
    timeline.iter()
        .find(|event| event.kind() == EventKind::Tech && event.entity_id() == tech_id)
        .map(|event| format_game_time(event.completed_at_ms()))
        .unwrap_or_else(|| "N/A".to_string())
}

fn victory_label(victory: Victory) -> &'static str {
    match victory {
        Victory::Won => "Won",
        Victory::Lost => "Lost",
        Victory::Unknown => "Unknown",
    }
}

fn player_name(replay: &DecodedReplay, slot: usize) -> String {
    replay.header_player(slot)
        .map(|player| player.name.clone())
        .unwrap_or_else(|| format!("Player {slot}"))
}

fn write_events<'a>(
    out: &mut String,
    heading: &str,
    events: impl Iterator<Item=&'a Event>,
    only_unique: bool,
) -> std::fmt::Result {
    writeln!(out, "\n{heading}")?;
    let mut seen = HashSet::new();
    for event in events {
        if only_unique && !seen.insert(event.key()) {
            continue;
        }
        if event.duration_ms() > 0 {
            writeln!(out, "{}, {}, {}", event.name(), format_game_time(event.timestamp_ms()),
                     format_game_time(event.completed_at_ms()))?;
        } else {
            writeln!(out, "{}, {}", event.name(), format_game_time(event.timestamp_ms()))?;
        }
    }
    Ok(())
}

fn write_player_section(
    out: &mut String,
    name: &str,
    timeline: &PlayerTimeline,
    options: &SummaryOptions,
) -> std::fmt::Result {
    writeln!(out, "\n\n{name}:")?;
    if options.include_player_openings {
        let mask = classify(timeline.events());
        writeln!(out, "Opening Flags: {:#x}", mask.bits())?;
        for opening in mask.named_openings() {
            writeln!(out, "{opening}")?;
        }
    }
    let of_kind = |kind| timeline.iter().filter(move |event| event.kind() == kind);
    if options.include_units {
        write_events(out, "Units", of_kind(EventKind::Unit), options.only_unique_units)?;
    }
    if options.include_buildings {
        write_events(out, "Buildings", of_kind(EventKind::Building), options.only_unique_buildings)?;
    }
    if options.include_techs {
        write_events(out, "Techs", of_kind(EventKind::Tech), false)?;
    }
    Ok(())
}

fn write_summary(
    out: &mut String,
    replay: &DecodedReplay,
    extracted: &ExtractedReplay,
    catalog: &Catalog,
    options: &SummaryOptions,
) -> std::fmt::Result {
    let map = replay.header.map_name.clone()
        .unwrap_or_else(|| replay.header.map_id.to_string());
    writeln!(out, "Map, {map}")?;

    let mut teams = Vec::new();
    let mut roster = Vec::new();
    for (slot, timeline) in extracted.active_slots() {
        let header = replay.header_player(slot);
        let name = player_name(replay, slot);
        let team_id = header.map(|player| player.team_id).unwrap_or(0);
        let team = match teams.iter().position(|t| *t == team_id) {
            Some(position) => position + 1,
            None => {
                teams.push(team_id);
                teams.len()
            }
        };
        let civilization = header
            .map(|player| catalog.civilization_name(player.civ_id)
                .map(str::to_string)
                .unwrap_or_else(|| player.civ_id.to_string()))
            .unwrap_or_else(|| "Unknown".to_string());
        let color = header
            .map(|player| match Color::try_from(player.color_id) {
                Ok(color) => <&'static str>::from(color).to_string(),
                Err(_) => player.color_id.to_string(),
            })
            .unwrap_or_else(|| "Unknown".to_string());

        if options.any_player_section() {
            write_player_section(out, &name, timeline, options)?;
        }

        roster.push(RosterLine {
            name,
            civilization,
            color,
            team,
            victory: victory_label(extracted.victory(slot)),
            ages: [
                age_completion(timeline, tables::FEUDAL_AGE),
                age_completion(timeline, tables::CASTLE_AGE),
                age_completion(timeline, tables::IMPERIAL_AGE),
            ],
        });
    }

    writeln!(out, "\nName, Civ, Color, Team, Victory State, Feudal Time, Castle Time, Imp Time")?;
    for line in &roster {
        writeln!(out, "{}, {}, {}, {}, {}, {}", line.name, line.civilization, line.color, line.team,
                 line.victory, line.ages.iter().join(", "))?;
    }

    let tributes = extracted.timelines.iter()
        .flat_map(PlayerTimeline::iter)
        .filter_map(|event| Some((event.timestamp_ms(), event.tribute_payload()?)))
        .filter(|(_, tribute)| !tribute.is_empty())
        .sorted_by_key(|(timestamp, _)| *timestamp)
        .collect_vec();
    if !tributes.is_empty() {
        writeln!(out, "\nTribute from Player, To Player, Time, Food, Wood, Gold, Stone")?;
        for (timestamp, tribute) in tributes {
            writeln!(out, "{}, {}, {}, {}, {}, {}, {}",
                     player_name(replay, tribute.sender), player_name(replay, tribute.receiver),
                     format_game_time(timestamp), tribute.food, tribute.wood, tribute.gold, tribute.stone)?;
        }
    }

    writeln!(out, "\nDuration, {}", format_game_time(extracted.duration_ms()))?;
    Ok(())
}

/// A CSV-like, human-readable summary of one match
pub fn render_summary(
    replay: &DecodedReplay,
    extracted: &ExtractedReplay,
    catalog: &Catalog,
    options: &SummaryOptions,
) -> String {
    let mut out = String::new();
    // Writing to a String can't fail
    let _ = write_summary(&mut out, replay, extracted, catalog, options);
    out
}
