use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    constants::{FILE_NAMES, MAX_BACKUPS},
    domain::{CategoryKey, Tracker, TrackerError},
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One parsed `key: name` line of the category file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigEntry {
    pub depth: usize,
    pub key: char,
    pub name: String,
}

/// Banked seconds per category, written between runs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub seconds: BTreeMap<String, u64>,
}

impl TimeSnapshot {
    pub const VERSION: u32 = 1;

    pub fn capture(tracker: &Tracker) -> Self {
        let seconds = tracker
            .walk()
            .into_iter()
            .filter_map(|(_, key)| {
                let category = tracker.get(key)?;
                Some((key.0.to_string(), category.accumulated_seconds))
            })
            .collect();

        Self {
            version: Self::VERSION,
            saved_at: Utc::now(),
            seconds,
        }
    }

    /// Restores banked seconds for keys still present in the tree. Returns
    /// how many categories were restored.
    pub fn apply(&self, tracker: &mut Tracker) -> usize {
        let mut restored = 0;
        for (raw_key, seconds) in &self.seconds {
            let mut chars = raw_key.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                warn!(key = %raw_key, "ignoring malformed snapshot key");
                continue;
            };
            match tracker.set_accumulated(CategoryKey::new(c), *seconds) {
                Ok(()) => restored += 1,
                Err(TrackerError::UnknownKey(key)) => {
                    debug!(%key, "snapshot key no longer in tree");
                }
                Err(e) => warn!(error = %e, "could not restore snapshot entry"),
            }
        }
        restored
    }
}

pub fn parse_config(content: &str) -> Vec<ConfigEntry> {
    let mut entries = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let depth = line.chars().take_while(|c| *c == '-').count();
        let rest = line[depth..].trim_start();

        let Some((raw_key, name)) = rest.split_once(':') else {
            warn!(line = line_no + 1, "config line has no ':', skipping");
            continue;
        };

        let raw_key = raw_key.trim();
        let mut chars = raw_key.chars();
        let key = match (chars.next(), chars.next()) {
            (Some(c), None) if CategoryKey::is_valid_shortcut(c) => c,
            _ => {
                warn!(line = line_no + 1, key = raw_key, "config key must be a single letter, skipping");
                continue;
            }
        };

        entries.push(ConfigEntry {
            depth,
            key,
            name: name.trim().to_string(),
        });
    }

    entries
}

/// Builds a tracker from parsed entries. An entry nests under the most
/// recent entry one level shallower; a depth jump attaches to the deepest
/// category seen so far. Later duplicates of a key are dropped.
pub fn build_tracker(entries: &[ConfigEntry]) -> Tracker {
    let mut tracker = Tracker::new();
    let mut ancestors: Vec<CategoryKey> = Vec::new();

    for entry in entries {
        let depth = entry.depth.min(ancestors.len());
        let parent = if depth == 0 {
            CategoryKey::ROOT
        } else {
            ancestors[depth - 1]
        };

        match tracker.insert_category_under(entry.key, entry.name.clone(), parent) {
            Ok(key) => {
                ancestors.truncate(depth);
                ancestors.push(key);
            }
            Err(e) => warn!(error = %e, "skipping config entry"),
        }
    }

    tracker
}

pub fn load_tracker(path: &Path) -> Result<Tracker, StorageError> {
    let content = fs::read_to_string(path)?;
    let entries = parse_config(&content);
    debug!(path = %path.display(), entries = entries.len(), "loaded category config");
    Ok(build_tracker(&entries))
}

pub fn render_config(tracker: &Tracker) -> String {
    let mut content = String::new();
    content.push_str("# key: name, leading '-' nests under the line above\n");

    for (depth, key) in tracker.walk() {
        if let Some(category) = tracker.get(key) {
            content.push_str(&format!("{}{}: {}\n", "-".repeat(depth), key, category.name));
        }
    }
    content
}

pub fn save_config(path: &Path, tracker: &Tracker) -> Result<(), StorageError> {
    atomic_write(path, &render_config(tracker))
}

/// Creates an empty category file if none exists yet.
pub fn ensure_config(path: &Path) -> Result<(), StorageError> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    File::create(path)?;
    Ok(())
}

pub fn get_data_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "tracktime", "tracktime") {
        let data_dir = proj_dirs.data_dir().to_path_buf();
        fs::create_dir_all(&data_dir).ok();
        data_dir
    } else {
        PathBuf::from(".")
    }
}

pub fn get_state_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "tracktime", "tracktime") {
        if let Some(state_dir) = proj_dirs.state_dir() {
            let dir = state_dir.to_path_buf();
            fs::create_dir_all(&dir).ok();
            return dir;
        }
    }
    PathBuf::from(".")
}

/// A category file in the working directory wins over the per-user one.
pub fn default_config_path() -> PathBuf {
    let local = Path::new(".").join(FILE_NAMES.config);
    if local.exists() {
        return local;
    }
    get_data_dir().join(FILE_NAMES.config)
}

/// Banked times live beside the category file they belong to, so two
/// category files never share times for the same shortcut.
pub fn snapshot_path_for(config_path: &Path) -> PathBuf {
    let stem = config_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tracktime".to_string());
    config_path.with_file_name(format!("{}.{}", stem, FILE_NAMES.snapshot))
}

pub fn get_log_path() -> PathBuf {
    get_state_dir().join(FILE_NAMES.log)
}

pub fn load_snapshot(path: &Path) -> Option<TimeSnapshot> {
    if !path.exists() {
        return None;
    }

    match read_json::<TimeSnapshot>(path) {
        Ok(snapshot) if snapshot.version == TimeSnapshot::VERSION => Some(snapshot),
        Ok(snapshot) => {
            warn!(version = snapshot.version, "unsupported snapshot version, ignoring saved times");
            None
        }
        Err(e) => {
            warn!(error = %e, "could not load time snapshot");
            None
        }
    }
}

pub fn save_snapshot(path: &Path, snapshot: &TimeSnapshot) -> Result<(), StorageError> {
    write_json_atomic(path, snapshot)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, &json)
}

/// Serializes rows as CSV with a header taken from the field names.
pub fn render_csv<T: Serialize>(rows: &[T]) -> Result<String, StorageError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

pub fn write_text_file(path: &Path, content: &str) -> Result<(), StorageError> {
    atomic_write(path, content)
}

pub fn create_backup(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        return Ok(());
    }

    let backup_dir = path.parent().unwrap_or(Path::new(".")).join("backups");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!(
        "{}.{}",
        path.file_name().unwrap_or_default().to_string_lossy(),
        timestamp
    );
    fs::copy(path, backup_dir.join(&filename))?;

    let prefix = format!("{}.", path.file_name().unwrap_or_default().to_string_lossy());
    if let Ok(entries) = fs::read_dir(&backup_dir) {
        let mut backups: Vec<_> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
            .collect();
        backups.sort_by_key(|e| e.metadata().ok().and_then(|m| m.modified().ok()));

        while backups.len() > MAX_BACKUPS {
            let oldest = backups.remove(0);
            let _ = fs::remove_file(oldest.path());
        }
    }

    Ok(())
}

pub fn atomic_write(path: &Path, content: &str) -> Result<(), StorageError> {
    if path.exists() {
        create_backup(path)?;
    }

    let tmp_path = path.with_extension("tmp");
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(content.as_bytes())?;
    tmp_file.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
