// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RevealError, RevealResult};

/// Persisted state of the current day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayState {
    /// Source image of the day.
    pub image_url: Option<String>,
    /// When `image_url` was fetched, in Unix milliseconds.
    pub last_fetch_ms: Option<i64>,
    /// Raw step counter at the start of the day.
    pub step_baseline: Option<f64>,
    /// Steps counted today.
    pub daily_steps: u64,
    /// Last raw step counter reading.
    pub latest_raw_steps: Option<f64>,
    /// Step count the current wallpaper was rendered for.
    pub last_rendered_steps: Option<u64>,
}

impl DayState {
    /// Resets the day around a freshly fetched image.
    pub fn start_new_day(&mut self, url: String, fetch_ms: i64, baseline: Option<f64>) {
        self.image_url = Some(url);
        self.last_fetch_ms = Some(fetch_ms);
        self.daily_steps = 0;
        self.step_baseline = baseline;
        self.last_rendered_steps = None;
    }
}

/// Durable key-value storage for [`DayState`].
///
/// A `save` must be visible to every later `load` in the same process.
pub trait StateStore: Send + Sync {
    fn load(&self) -> RevealResult<DayState>;

    fn save(&self, state: &DayState) -> RevealResult<()>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<DayState>,
}

impl MemoryStore {
    pub fn new(state: DayState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> RevealResult<DayState> {
        Ok(self.state.lock().clone())
    }

    fn save(&self, state: &DayState) -> RevealResult<()> {
        *self.state.lock() = state.clone();
        Ok(())
    }
}

/// Store backed by a JSON file. A missing file loads as the default state.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> RevealResult<DayState> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file, starting fresh");
                return Ok(DayState::default());
            }
            Err(e) => {
                return Err(RevealError::store(format!(
                    "read '{}': {e}",
                    self.path.display()
                )))
            }
        };

        serde_json::from_slice(&bytes)
            .map_err(|e| RevealError::store(format!("parse '{}': {e}", self.path.display())))
    }

    fn save(&self, state: &DayState) -> RevealResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| RevealError::store(format!("create '{}': {e}", parent.display())))?;
        }

        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| RevealError::store(format!("serialize state: {e}")))?;

        // Write then rename so readers never see a torn file.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .map_err(|e| RevealError::store(format!("write '{}': {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| RevealError::store(format!("replace '{}': {e}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DayState {
        DayState {
            image_url: Some("file:///tmp/a.png".into()),
            last_fetch_ms: Some(1_700_000_000_000),
            step_baseline: Some(120.0),
            daily_steps: 4321,
            latest_raw_steps: Some(4441.0),
            last_rendered_steps: Some(4300),
        }
    }

    #[test]
    fn start_new_day_resets_counters() {
        let mut state = sample();
        state.start_new_day("file:///b.png".into(), 42, None);
        assert_eq!(state.image_url.as_deref(), Some("file:///b.png"));
        assert_eq!(state.last_fetch_ms, Some(42));
        assert_eq!(state.daily_steps, 0);
        assert_eq!(state.step_baseline, None);
        assert_eq!(state.last_rendered_steps, None);
        assert_eq!(state.latest_raw_steps, Some(4441.0));
    }

    #[test]
    fn memory_store_reads_its_writes() {
        let store = MemoryStore::default();
        assert_eq!(store.load().unwrap(), DayState::default());
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn json_store_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().unwrap(), DayState::default());
    }

    #[test]
    fn json_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        JsonFileStore::new(&path).save(&sample()).unwrap();
        assert_eq!(JsonFileStore::new(&path).load().unwrap(), sample());
    }

    #[test]
    fn json_store_tolerates_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"image_url": "x", "daily_steps": 7}"#).unwrap();
        let state = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(state.image_url.as_deref(), Some("x"));
        assert_eq!(state.daily_steps, 7);
        assert_eq!(state.last_fetch_ms, None);
    }

    #[test]
    fn json_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).load(),
            Err(RevealError::Store(_))
        ));
    }
}
