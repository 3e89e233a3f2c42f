use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use flate2::read::GzDecoder;
use itertools::Itertools;
use replay_api::{replay_from_reader, DecodedReplay};

use crate::error::Error;

fn is_gzipped(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}

/// Reads one decoded replay, gunzipping it if the name ends in `.gz`
pub fn read_replay(path: &Path) -> Result<DecodedReplay, Error> {
    let file = File::open(path)
        .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    let reader: Box<dyn Read> = if is_gzipped(path) {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    replay_from_reader(reader)
        .map_err(|source| Error::Decode { path: path.to_path_buf(), source })
}

/// Decoded replays (`.json` or `.json.gz`) directly inside `dir`, sorted by name
pub fn replay_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let io_error = |source| Error::Io { path: dir.to_path_buf(), source };
    let entries = fs::read_dir(dir).map_err(io_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error)?;
    Ok(entries.into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.ends_with(".json") || name.ends_with(".json.gz")
        })
        .sorted()
        .collect())
}
