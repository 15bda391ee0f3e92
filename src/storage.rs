use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use color_eyre::{
    Result,
    eyre::{Context, bail},
};
use log::debug;

use crate::roster::Roster;

/// Last-known roster per event.
pub trait SnapshotStore {
    /// `Ok(None)` means this event has never been saved before.
    fn load(&self, event_id: &str) -> Result<Option<Roster>>;
    fn save(&self, event_id: &str, roster: &Roster) -> Result<()>;
}

/// Stores each event's roster as `<dir>/<event_id>_teams.json`.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Event ids must name a file inside the store's directory.
    pub fn snapshot_path(&self, event_id: &str) -> Result<PathBuf> {
        if event_id.is_empty() || event_id.contains(['/', '\\']) || event_id.contains("..") {
            bail!("event ID {event_id:?} cannot be used as a file name");
        }
        Ok(self.dir.join(format!("{event_id}_teams.json")))
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self, event_id: &str) -> Result<Option<Roster>> {
        let path = self.snapshot_path(event_id)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).wrap_err_with(|| format!("failed to read {}", path.display()));
            }
        };

        let roster = serde_json::from_str(&contents)
            .wrap_err_with(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(roster))
    }

    fn save(&self, event_id: &str, roster: &Roster) -> Result<()> {
        let path = self.snapshot_path(event_id)?;
        let json = serde_json::to_string_pretty(roster)?;
        write_atomic(&path, json.as_bytes())
            .wrap_err_with(|| format!("failed to write {}", path.display()))?;
        debug!("Saved {} teams to {}", roster.data.len(), path.display());
        Ok(())
    }
}

/// Writes to `<path>.tmp` and renames it over `path`.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        fs::remove_file(&tmp).ok();
    })
}
