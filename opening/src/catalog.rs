use std::collections::HashMap;
use std::fs;
use std::path::Path;
use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::error::CatalogError;
use crate::event::EventKind;
use crate::tables;

/// Civilization string ids in the game data start right after this one
const CIVILIZATION_STRING_BASE: i64 = 10270;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub internal_name: String,
    #[serde(rename = "LanguageNameId", default)]
    pub language_name_id: Option<i64>,
    /// Seconds
    #[serde(rename = "ResearchTime", default)]
    pub research_time: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct GameDataTables {
    #[serde(default)]
    units: HashMap<String, CatalogEntry>,
    #[serde(default)]
    techs: HashMap<String, CatalogEntry>,
    #[serde(default)]
    buildings: HashMap<String, CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct GameDataFile {
    #[serde(default)]
    data: GameDataTables,
    #[serde(default)]
    civ_names: HashMap<String, Value>,
}

/// Read-only lookup of unit, building, tech, and civilization data. A default catalog knows only
/// the curated tables.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    units: HashMap<i64, CatalogEntry>,
    techs: HashMap<i64, CatalogEntry>,
    buildings: HashMap<i64, CatalogEntry>,
    civilizations: HashMap<i32, String>,
    strings: HashMap<i64, String>,
}

fn read_game_data_file(path: &Path) -> Result<String, CatalogError> {
    fs::read_to_string(path)
        .map_err(|source| CatalogError::Io { path: path.to_path_buf(), source })
}

fn by_numeric_id(table: HashMap<String, CatalogEntry>) -> HashMap<i64, CatalogEntry> {
    table.into_iter()
        .filter_map(|(id, entry)| Some((id.parse().ok()?, entry)))
        .collect()
}

impl Catalog {
    /// Loads `data.json` and `locales/en/strings.json` from an aoe2techtree data directory
    pub fn load(data_dir: &Path) -> Result<Self, CatalogError> {
        let data_path = data_dir.join("data.json");
        let strings_path = data_dir.join("locales").join("en").join("strings.json");
        let data = read_game_data_file(&data_path)?;
        let strings = read_game_data_file(&strings_path)?;

        let data: GameDataFile = serde_json::from_str(&data)
            .map_err(|source| CatalogError::Json { path: data_path, source })?;
        let strings: HashMap<String, String> = serde_json::from_str(&strings)
            .map_err(|source| CatalogError::Json { path: strings_path, source })?;

        let catalog = Self::from_parts(data, strings);
        debug!("Loaded game data from {}: {} units, {} techs, {} buildings, {} civilizations",
            data_dir.display(), catalog.units.len(), catalog.techs.len(), catalog.buildings.len(),
            catalog.civilizations.len());
        Ok(catalog)
    }

    /// Builds a catalog from the contents of `data.json` and `strings.json`
    pub fn from_json(data: &str, strings: &str) -> serde_json::Result<Self> {
        Ok(Self::from_parts(serde_json::from_str(data)?, serde_json::from_str(strings)?))
    }

    fn from_parts(data: GameDataFile, strings: HashMap<String, String>) -> Self {
        let civilizations = data.civ_names.into_iter()
            .filter_map(|(name, string_id)| {
                let string_id = match string_id {
                    Value::String(s) => s.parse::<i64>().ok()?,
                    other => other.as_i64()?,
                };
                Some(((string_id - CIVILIZATION_STRING_BASE) as i32, name))
            })
            .collect();

        Self {
            units: by_numeric_id(data.data.units),
            techs: by_numeric_id(data.data.techs),
            buildings: by_numeric_id(data.data.buildings),
            civilizations,
            strings: strings.into_iter()
                .filter_map(|(id, text)| Some((id.parse().ok()?, text)))
                .collect(),
        }
    }

    fn entry(&self, kind: EventKind, id: i64) -> Option<&CatalogEntry> {
        match kind {
            EventKind::Unit => self.units.get(&id),
            EventKind::Tech => self.techs.get(&id),
            EventKind::Building => self.buildings.get(&id),
            EventKind::Resign | EventKind::Tribute => None,
        }
    }

    fn curated_name(kind: EventKind, id: i64) -> Option<&'static str> {
        match kind {
            EventKind::Unit => tables::lookup(tables::UNITS, id)
                .or_else(|| tables::lookup(tables::UNIQUE_UNITS, id)),
            EventKind::Tech => tables::lookup(tables::TECHS, id),
            EventKind::Building => tables::lookup(tables::BUILDINGS, id),
            EventKind::Resign => Some("Resignation"),
            EventKind::Tribute => Some("Tribute"),
        }
    }

    /// Curated name first, then the catalog's localized name, then the id itself
    pub fn resolve_name(&self, kind: EventKind, id: i64) -> String {
        if let Some(name) = Self::curated_name(kind, id) {
            return name.to_string();
        }

        match self.entry(kind, id) {
            Some(entry) => entry.language_name_id
                .and_then(|string_id| self.strings.get(&string_id))
                .cloned()
                .unwrap_or_else(|| format!("{} ({})", entry.internal_name, id)),
            None => id.to_string(),
        }
    }

    /// How long a tech takes to research, or 0 when the catalog doesn't say
    pub fn research_time_ms(&self, tech_id: i64) -> u64 {
        self.techs.get(&tech_id)
            .and_then(|entry| entry.research_time)
            .map(|seconds| (seconds * 1000.0).round().max(0.0) as u64)
            .unwrap_or(0)
    }

    pub fn civilization_name(&self, civ_id: i32) -> Option<&str> {
        self.civilizations.get(&civ_id).map(String::as_str)
    }

    pub fn is_ignored_building(&self, building_id: i64) -> bool {
        tables::is_ignored_building(building_id)
    }
}
