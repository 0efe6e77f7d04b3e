use crate::catalog::JdNextEntry;
use log::debug;
use snatcher_core::SnatchError;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Per-map completion record, written last.
pub const SONG_INFO: &str = "SongInfo.json";

/// What an existing map folder says about itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Sidecar {
    Missing,
    Corrupt(String),
    Valid(JdNextEntry),
}

/// Reads `<map_dir>/SongInfo.json`. Anything short of a parseable entry
/// means the folder cannot be trusted.
pub fn inspect(map_dir: &Path) -> Sidecar {
    let path = map_dir.join(SONG_INFO);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Sidecar::Missing,
        Err(e) => return Sidecar::Corrupt(e.to_string()),
    };
    match serde_json::from_str(&content) {
        Ok(entry) => Sidecar::Valid(entry),
        Err(e) => Sidecar::Corrupt(e.to_string()),
    }
}

pub async fn write_sidecar(map_dir: &Path, entry: &JdNextEntry) -> Result<(), SnatchError> {
    let path = map_dir.join(SONG_INFO);
    let json = serde_json::to_string_pretty(entry)?;
    async_std::fs::write(&path, json).await?;
    debug!("Wrote {}", path.display());
    Ok(())
}
