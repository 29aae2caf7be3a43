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

//! Contracts for the services around the reveal engine, with
//! file-backed implementations for offline use.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use image::io::Reader as ImageReader;
use image::{ImageFormat, RgbaImage};
use tracing::info;

use crate::error::RevealResult;

/// Supplies the URL of a full-resolution photo.
pub trait PhotoSource: Send + Sync {
    fn fetch_random_photo_url(&self, query: Option<&str>) -> RevealResult<String>;
}

/// Today's step count as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepReading {
    Available(u64),
    /// No permission or no sensor. Not the same as zero steps.
    Unavailable,
}

/// Supplies step data.
pub trait StepSource: Send + Sync {
    fn steps_today(&self) -> RevealResult<StepReading>;

    /// Raw since-boot counter, when the platform has one.
    fn raw_counter(&self) -> Option<f64> {
        None
    }
}

/// Loads a source image by URL.
pub trait ImageLoader: Send + Sync {
    fn load(&self, url: &str) -> RevealResult<RgbaImage>;
}

/// Applies a bitmap as the device wallpaper.
pub trait WallpaperSink: Send + Sync {
    fn set_wallpaper(&self, image: &RgbaImage) -> RevealResult<()>;
}

/// Decodes images from local paths or `file://` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageLoader;

impl ImageLoader for FileImageLoader {
    fn load(&self, url: &str) -> RevealResult<RgbaImage> {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        let im = ImageReader::new(BufReader::new(
            File::open(path).with_context(|| format!("open image '{}'", path.display()))?,
        ))
        .with_guessed_format()
        .with_context(|| format!("detect format of '{}'", path.display()))?
        .decode()
        .with_context(|| format!("decode image '{}'", path.display()))?;

        Ok(im.into_rgba8())
    }
}

/// Writes the wallpaper to a PNG file.
#[derive(Debug, Clone)]
pub struct PngWallpaperSink {
    path: PathBuf,
}

impl PngWallpaperSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl WallpaperSink for PngWallpaperSink {
    fn set_wallpaper(&self, image: &RgbaImage) -> RevealResult<()> {
        image
            .save_with_format(&self.path, ImageFormat::Png)
            .with_context(|| format!("write png '{}'", self.path.display()))?;
        info!(path = %self.path.display(), "wallpaper written");
        Ok(())
    }
}

/// Step source with a fixed answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixedSteps {
    /// Raw since-boot counter value.
    Raw(f64),
    /// Steps already counted for today.
    Today(u64),
    Unavailable,
}

impl StepSource for FixedSteps {
    fn steps_today(&self) -> RevealResult<StepReading> {
        Ok(match *self {
            Self::Today(n) => StepReading::Available(n),
            Self::Raw(_) | Self::Unavailable => StepReading::Unavailable,
        })
    }

    fn raw_counter(&self) -> Option<f64> {
        match *self {
            Self::Raw(v) => Some(v),
            _ => None,
        }
    }
}
