//! Library to progressively reveal an image as daily steps accumulate.
//!
//! The core is [`RevealEngine`]. Given a source image, a progress value
//! and a seed, it produces an image where a progress-proportional set of
//! mask cells shows the source and the rest is background, such that:
//!
//! * The same inputs always give the same pixels, on any machine.
//! * Increasing progress never hides a previously revealed cell.
//! * Reveal granularity is a fixed low-resolution grid, independent
//!   of the source resolution.
//!
//! Around it, [`cycle`] drives the daily fetch and step check against
//! the collaborator traits in [`collab`] and a [`StateStore`].

// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//

pub mod collab;
pub mod cycle;
pub mod day;
mod error;
pub mod order;
pub mod photo;
mod reveal;
pub mod store;

#[doc(inline)]
pub use crate::error::{RevealError, RevealResult};
#[doc(inline)]
pub use crate::order::{shuffled_order, Cell, MaskSize, OrderCache};
#[doc(inline)]
pub use crate::reveal::{clamp_progress, EngineBuilder, RevealEngine, BACKGROUND};
#[doc(inline)]
pub use crate::store::{DayState, StateStore};
