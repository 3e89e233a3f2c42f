use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Expected field \"{field}\" for {action} action")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },

    #[error("Player slot {slot} in {action} action is outside the roster of {roster_size}")]
    PlayerSlotOutOfRange {
        action: &'static str,
        slot: i64,
        roster_size: usize,
    },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read game data file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse game data file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Couldn't encode or decode a stored record: {0}")]
    Encoding(#[from] pot::Error),

    #[error("No record for player {player_id} in match {match_id}")]
    MissingMatchPlayer {
        match_id: i64,
        player_id: i64,
    },
}

#[derive(Error, Debug)]
pub enum FileNameError {
    #[error("Replay file name {name} has no usable file name component")]
    NoFileName {
        name: String,
    },

    #[error("Couldn't parse replay file name {name}: {err}")]
    Unrecognized {
        name: String,
        err: String,
    },
}

/// Everything that can stop one replay from making it into the store
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read replay {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to decode replay {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Replay has {active_players} active players but its file name only names {profiles}")]
    TooManyPlayers {
        active_players: usize,
        profiles: usize,
    },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    FileName(#[from] FileNameError),
}
