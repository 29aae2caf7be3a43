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

use std::sync::Arc;

use image::{DynamicImage, Rgba, RgbaImage};
use ndarray::prelude::*;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{RevealError, RevealResult};
use crate::order::{Cell, MaskSize, OrderCache};

/// Opaque black.
pub const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Builder for [`RevealEngine`].
#[derive(Debug, Clone)]
pub struct EngineBuilder {
    mask_width: usize,
    mask_height: usize,
    background: Rgba<u8>,
    cache: Option<Arc<OrderCache>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            mask_width: MaskSize::DEFAULT.width,
            mask_height: MaskSize::DEFAULT.height,
            background: BACKGROUND,
            cache: None,
        }
    }

    pub fn mask_size(mut self, width: usize, height: usize) -> Self {
        self.mask_width = width;
        self.mask_height = height;
        self
    }

    pub fn background(mut self, background: [u8; 4]) -> Self {
        self.background = Rgba(background);
        self
    }

    /// Shares an order cache between engines.
    pub fn cache(mut self, cache: Arc<OrderCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> RevealResult<RevealEngine> {
        Ok(RevealEngine {
            mask: MaskSize::new(self.mask_width, self.mask_height)?,
            background: self.background,
            cache: self.cache.unwrap_or_default(),
        })
    }
}

/// Progressive reveal engine.
///
/// Maps a progress value to a copy of the source image where a
/// progress-proportional prefix of the seeded cell order shows the
/// source and the remaining cells show the background.
///
/// The engine is `Sync`; concurrent calls share the order cache.
#[derive(Debug)]
pub struct RevealEngine {
    mask: MaskSize,
    background: Rgba<u8>,
    cache: Arc<OrderCache>,
}

impl Default for RevealEngine {
    fn default() -> Self {
        Self {
            mask: MaskSize::DEFAULT,
            background: BACKGROUND,
            cache: Default::default(),
        }
    }
}

/// Clamps progress into `[0, 1]`. NaN counts as no progress.
pub fn clamp_progress(progress: f32) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        f64::from(progress).clamp(0.0, 1.0)
    }
}

impl RevealEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn mask_size(&self) -> MaskSize {
        self.mask
    }

    pub fn background(&self) -> Rgba<u8> {
        self.background
    }

    /// Shuffled cell order for `seed`, served from the cache.
    pub fn shuffled_order(&self, seed: i64) -> Arc<[Cell]> {
        self.cache.get_or_compute(seed, self.mask)
    }

    /// Number of cells revealed at `progress` (rounded, not truncated).
    pub fn reveal_count(&self, progress: f32) -> usize {
        let total = self.mask.cell_count();
        let n = (total as f64 * clamp_progress(progress)).round() as usize;
        n.min(total)
    }

    /// Builds the reveal mask, indexed `[[y, x]]`.
    pub fn reveal_mask(&self, progress: f32, seed: i64) -> Array2<bool> {
        let order = self.shuffled_order(seed);
        let count = self.reveal_count(progress);

        let mut mask = Array2::from_elem((self.mask.height, self.mask.width), false);
        for &(x, y) in &order[..count] {
            mask[[y, x]] = true;
        }
        mask
    }

    /// Renders `source` revealed up to `progress`.
    ///
    /// Each source pixel maps to the mask cell
    /// `(x * MASK_W / W, y * MASK_H / H)` without interpolation.
    /// Out-of-range progress is clamped. Fails only for a zero-area source.
    pub fn generate_revealed_image(
        &self,
        source: &RgbaImage,
        progress: f32,
        seed: i64,
    ) -> RevealResult<RgbaImage> {
        let (w, h) = source.dimensions();
        if w == 0 || h == 0 {
            return Err(RevealError::invalid_input(format!(
                "source image has zero area ({w}x{h})"
            )));
        }

        let mask = self.reveal_mask(progress, seed);
        debug!(
            width = w,
            height = h,
            seed,
            revealed = self.reveal_count(progress),
            "compositing revealed image"
        );

        let (mw, mh) = (self.mask.width as u64, self.mask.height as u64);
        let columns: Vec<usize> = (0..u64::from(w))
            .map(|x| (x * mw / u64::from(w)) as usize)
            .collect();
        let background = self.background.0;

        let row_len = w as usize * 4;
        let mut out = RgbaImage::new(w, h);
        out.par_chunks_exact_mut(row_len)
            .zip(source.as_raw().par_chunks_exact(row_len))
            .enumerate()
            .for_each(|(y, (dst, src))| {
                let cy = (y as u64 * mh / u64::from(h)) as usize;
                let row = mask.row(cy);
                for ((d, s), &cx) in dst
                    .chunks_exact_mut(4)
                    .zip(src.chunks_exact(4))
                    .zip(&columns)
                {
                    if row[cx] {
                        d.copy_from_slice(s);
                    } else {
                        d.copy_from_slice(&background);
                    }
                }
            });

        Ok(out)
    }

    /// Like [`generate_revealed_image`](Self::generate_revealed_image),
    /// treating a missing source as invalid input.
    pub fn generate_revealed_image_opt(
        &self,
        source: Option<&RgbaImage>,
        progress: f32,
        seed: i64,
    ) -> RevealResult<RgbaImage> {
        let source = source.ok_or_else(|| RevealError::invalid_input("source image is missing"))?;
        self.generate_revealed_image(source, progress, seed)
    }

    /// Converts any decoded image to RGBA8 before revealing it.
    pub fn generate_revealed_dynamic(
        &self,
        source: &DynamicImage,
        progress: f32,
        seed: i64,
    ) -> RevealResult<RgbaImage> {
        self.generate_revealed_image(&source.to_rgba8(), progress, seed)
    }
}
