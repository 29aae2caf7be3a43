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

//! The two jobs a scheduler runs periodically: fetching the day's image
//! and re-rendering the wallpaper as steps accumulate.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collab::{ImageLoader, PhotoSource, StepReading, StepSource, WallpaperSink};
use crate::day::{daily_steps, is_same_calendar_day, progress_for, seed_for_day};
use crate::error::{RevealError, RevealResult};
use crate::reveal::RevealEngine;
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Steps at which the image is fully revealed.
    pub step_goal: u64,
    /// Step change needed before re-rendering.
    pub min_step_delta: u64,
    /// Local time zone for day boundaries.
    pub utc_offset_minutes: i32,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            step_goal: 10_000,
            min_step_delta: 100,
            utc_offset_minutes: 0,
        }
    }
}

impl CycleConfig {
    /// Reads a JSON config file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> RevealResult<Self> {
        let bytes = fs::read(path)
            .map_err(|e| RevealError::invalid_input(format!("read '{}': {e}", path.display())))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| RevealError::invalid_input(format!("parse '{}': {e}", path.display())))
    }
}

/// Result of one scheduled run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A new image was fetched; run a forced step check next.
    NewDay,
    /// The wallpaper was rendered and applied.
    Updated { steps: u64 },
    /// Nothing to do.
    Skipped(String),
    /// Transient failure; run again later.
    Retry(String),
    /// Permanent failure for the current inputs.
    Failed(String),
}

impl CycleOutcome {
    fn from_error(context: &str, err: RevealError) -> Self {
        let msg = format!("{context}: {err}");
        if err.is_retryable() {
            warn!("{msg}, will retry");
            Self::Retry(msg)
        } else {
            warn!("{msg}");
            Self::Failed(msg)
        }
    }
}

/// Day cycle over a state store and the reveal engine.
pub struct UpdateCycle<'a> {
    engine: &'a RevealEngine,
    store: &'a dyn StateStore,
    config: CycleConfig,
}

impl<'a> UpdateCycle<'a> {
    pub fn new(engine: &'a RevealEngine, store: &'a dyn StateStore, config: CycleConfig) -> Self {
        Self {
            engine,
            store,
            config,
        }
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Fetches a new image once per calendar day.
    ///
    /// The latest raw step reading becomes the new day's baseline.
    #[tracing::instrument(skip(self, photos))]
    pub fn daily_fetch(
        &self,
        now_ms: i64,
        photos: &dyn PhotoSource,
        query: Option<&str>,
    ) -> CycleOutcome {
        let mut state = match self.store.load() {
            Ok(s) => s,
            Err(e) => return CycleOutcome::from_error("load state", e),
        };

        if let Some(last) = state.last_fetch_ms {
            if is_same_calendar_day(last, now_ms, self.config.utc_offset_minutes) {
                debug!(last, "image already fetched today");
                return CycleOutcome::Skipped("already fetched today".into());
            }
        }

        let url = match photos.fetch_random_photo_url(query) {
            Ok(u) => u,
            Err(e) => return CycleOutcome::from_error("fetch photo", e),
        };

        let baseline = state.latest_raw_steps;
        info!(%url, ?baseline, "starting new day");
        state.start_new_day(url, now_ms, baseline);

        match self.store.save(&state) {
            Ok(()) => CycleOutcome::NewDay,
            Err(e) => CycleOutcome::from_error("save new day", e),
        }
    }

    /// Records today's steps and re-renders the wallpaper when forced,
    /// on the first check of the day, or once steps moved by
    /// `min_step_delta`.
    #[tracing::instrument(skip(self, steps, loader, sink))]
    pub fn step_check(
        &self,
        force: bool,
        steps: &dyn StepSource,
        loader: &dyn ImageLoader,
        sink: &dyn WallpaperSink,
    ) -> CycleOutcome {
        let mut state = match self.store.load() {
            Ok(s) => s,
            Err(e) => return CycleOutcome::from_error("load state", e),
        };

        let today = if let Some(raw) = steps.raw_counter() {
            let counted = daily_steps(raw, state.step_baseline);
            state.latest_raw_steps = Some(raw);
            state.step_baseline = Some(counted.baseline);
            counted.steps
        } else {
            match steps.steps_today() {
                Ok(StepReading::Available(n)) => n,
                Ok(StepReading::Unavailable) => {
                    return CycleOutcome::Skipped("step count unavailable".into())
                }
                Err(e) => return CycleOutcome::from_error("read steps", e),
            }
        };
        state.daily_steps = today;

        // Readings survive a failed render.
        if let Err(e) = self.store.save(&state) {
            return CycleOutcome::from_error("save steps", e);
        }

        let render = force
            || match state.last_rendered_steps {
                None => true,
                Some(prev) => today.abs_diff(prev) >= self.config.min_step_delta,
            };

        let url = match (&state.image_url, render) {
            (Some(url), true) => url.clone(),
            (url, _) => {
                return if url.is_none() {
                    CycleOutcome::Skipped("no image for today".into())
                } else {
                    debug!(today, "step change below threshold");
                    CycleOutcome::Skipped("step change below threshold".into())
                };
            }
        };

        let source = match loader.load(&url) {
            Ok(im) => im,
            Err(e) => return CycleOutcome::from_error("load image", e),
        };

        let progress = progress_for(today, self.config.step_goal);
        let seed = seed_for_day(state.last_fetch_ms.unwrap_or_default());
        let revealed = match self.engine.generate_revealed_image(&source, progress, seed) {
            Ok(im) => im,
            Err(e) => return CycleOutcome::from_error("reveal image", e),
        };

        if let Err(e) = sink.set_wallpaper(&revealed) {
            return CycleOutcome::from_error("set wallpaper", e);
        }

        state.last_rendered_steps = Some(today);
        if let Err(e) = self.store.save(&state) {
            return CycleOutcome::from_error("save steps", e);
        }

        info!(today, progress, "wallpaper updated");
        CycleOutcome::Updated { steps: today }
    }

    /// Daily fetch followed by a step check, forced on a new day.
    pub fn run(
        &self,
        now_ms: i64,
        photos: &dyn PhotoSource,
        steps: &dyn StepSource,
        loader: &dyn ImageLoader,
        sink: &dyn WallpaperSink,
        force: bool,
    ) -> CycleOutcome {
        match self.daily_fetch(now_ms, photos, None) {
            CycleOutcome::NewDay => self.step_check(true, steps, loader, sink),
            CycleOutcome::Skipped(_) => self.step_check(force, steps, loader, sink),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_fills_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycle.json");
        fs::write(&path, r#"{"step_goal": 8000, "utc_offset_minutes": -300}"#).unwrap();

        let config = CycleConfig::from_json_file(&path).unwrap();
        assert_eq!(
            config,
            CycleConfig {
                step_goal: 8000,
                min_step_delta: 100,
                utc_offset_minutes: -300,
            }
        );
    }

    #[test]
    fn config_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycle.json");
        let config = CycleConfig {
            step_goal: 6000,
            min_step_delta: 250,
            utc_offset_minutes: 60,
        };
        fs::write(&path, serde_json::to_vec(&config).unwrap()).unwrap();
        assert_eq!(CycleConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn bad_config_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            CycleConfig::from_json_file(&missing),
            Err(RevealError::InvalidInput(_))
        ));

        let path = dir.path().join("cycle.json");
        fs::write(&path, "{\"step_goal\": \"lots\"}").unwrap();
        assert!(matches!(
            CycleConfig::from_json_file(&path),
            Err(RevealError::InvalidInput(_))
        ));
    }
}
