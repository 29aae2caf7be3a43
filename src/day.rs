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

//! Calendar and step arithmetic for the daily cycle.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

fn offset(utc_offset_minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
}

/// Local calendar date of a millisecond timestamp.
pub fn local_date(timestamp_ms: i64, utc_offset_minutes: i32) -> Option<NaiveDate> {
    let utc = DateTime::<Utc>::from_timestamp_millis(timestamp_ms)?;
    Some(utc.with_timezone(&offset(utc_offset_minutes)).date_naive())
}

/// Whether both timestamps fall on the same local calendar day.
pub fn is_same_calendar_day(a_ms: i64, b_ms: i64, utc_offset_minutes: i32) -> bool {
    match (
        local_date(a_ms, utc_offset_minutes),
        local_date(b_ms, utc_offset_minutes),
    ) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Steps counted today from a raw since-boot counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailySteps {
    pub steps: u64,
    /// Baseline to persist for the next reading.
    pub baseline: f64,
}

/// Turns a raw counter reading into today's steps.
///
/// Without a baseline the reading becomes the baseline. A counter below
/// the baseline means the device rebooted; the raw value is then the
/// count since reboot and the baseline resets to zero.
pub fn daily_steps(raw: f64, baseline: Option<f64>) -> DailySteps {
    let raw = raw.max(0.0);
    match baseline {
        None => DailySteps {
            steps: 0,
            baseline: raw,
        },
        Some(b) if raw >= b => DailySteps {
            steps: (raw - b) as u64,
            baseline: b,
        },
        Some(_) => DailySteps {
            steps: raw as u64,
            baseline: 0.0,
        },
    }
}

/// Fraction of the step goal reached. Unclamped; a zero goal is complete.
pub fn progress_for(steps: u64, goal: u64) -> f32 {
    if goal == 0 {
        1.0
    } else {
        (steps as f64 / goal as f64) as f32
    }
}

/// Reveal seed for the image fetched at `fetch_ms`.
///
/// Stable for the day and changes with every new image.
pub fn seed_for_day(fetch_ms: i64) -> i64 {
    fetch_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 3_600_000;
    // 2024-03-10T00:00:00Z
    const MIDNIGHT: i64 = 1_710_028_800_000;

    #[test]
    fn same_day_in_utc() {
        assert!(is_same_calendar_day(MIDNIGHT, MIDNIGHT + 23 * HOUR, 0));
        assert!(!is_same_calendar_day(MIDNIGHT - 1, MIDNIGHT, 0));
    }

    #[test]
    fn same_day_respects_offset() {
        // 23:00Z on the 9th and 21:00Z on the 10th are both the 10th at UTC+2.
        let a = MIDNIGHT - HOUR;
        let b = MIDNIGHT + 21 * HOUR;
        assert!(!is_same_calendar_day(a, b, 0));
        assert!(is_same_calendar_day(a, b, 120));
        assert!(!is_same_calendar_day(b, b + 2 * HOUR, 120));
        assert_eq!(
            local_date(MIDNIGHT, -60),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
    }

    #[test]
    fn out_of_range_timestamps_are_never_same_day() {
        assert!(!is_same_calendar_day(i64::MAX, i64::MAX, 0));
    }

    #[test]
    fn first_reading_sets_baseline() {
        assert_eq!(
            daily_steps(1234.0, None),
            DailySteps {
                steps: 0,
                baseline: 1234.0
            }
        );
    }

    #[test]
    fn steps_since_baseline() {
        assert_eq!(daily_steps(1500.0, Some(1000.0)).steps, 500);
        assert_eq!(daily_steps(1000.0, Some(1000.0)).steps, 0);
    }

    #[test]
    fn reboot_resets_baseline() {
        assert_eq!(
            daily_steps(40.0, Some(9000.0)),
            DailySteps {
                steps: 40,
                baseline: 0.0
            }
        );
    }

    #[test]
    fn progress_is_a_fraction_of_goal() {
        assert_eq!(progress_for(5000, 10_000), 0.5);
        assert_eq!(progress_for(20_000, 10_000), 2.0);
        assert_eq!(progress_for(0, 0), 1.0);
    }
}
