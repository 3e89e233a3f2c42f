use std::io::Read;
use derive_builder::Builder;
use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};
use strum::{EnumString, IntoStaticStr};

/// The output of the external replay decoder for one recorded match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecodedReplay {
    pub header: ReplayHeader,
    pub operations: Vec<Operation>,
}

impl DecodedReplay {
    /// Header entry for a roster slot, if the decoder reported one
    pub fn header_player(&self, slot: usize) -> Option<&HeaderPlayer> {
        self.header.players.iter().find(|p| p.player_id == slot)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayHeader {
    pub map_id: i64,
    #[serde(default)]
    pub map_name: Option<String>,
    /// Recording format version. The store keeps this as the match's patch id.
    pub save_version: f64,
    #[serde(default)]
    pub players: Vec<HeaderPlayer>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct HeaderPlayer {
    /// 0-based roster slot, the same number actions carry in their `player_id` field
    pub player_id: usize,
    pub name: String,
    pub civ_id: i32,
    #[builder(default)]
    pub color_id: i32,
    #[builder(default)]
    pub team_id: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Advances the game clock
    Sync { delta_ms: u64 },
    Action(ActionRecord),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Raw action tag. Tags this crate doesn't know are kept so nothing is lost on a round trip.
    pub action: String,

    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl ActionRecord {
    pub fn new(action_type: ActionType, fields: Value) -> Self {
        Self {
            action: action_type.as_tag().to_string(),
            fields: match fields {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }

    pub fn action_type(&self) -> Option<ActionType> {
        self.action.parse().ok()
    }

    pub fn field_i64(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_i64)
    }

    pub fn field_f64(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ActionType {
    UnitQueued,
    TechResearched,
    BuildingConstructed,
    PlayerResigned,
    TributeSent,
}

impl ActionType {
    pub fn as_tag(self) -> &'static str {
        self.into()
    }
}

pub fn replay_from_str(s: &str) -> serde_json::Result<DecodedReplay> {
    serde_json::from_str(s)
}

pub fn replay_from_reader<R: Read>(reader: R) -> serde_json::Result<DecodedReplay> {
    serde_json::from_reader(reader)
}
