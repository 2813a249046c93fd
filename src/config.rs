//! Configuration records for the simulation pipeline.
//!
//! Everything the original wiring kept as process-wide settings is passed
//! here as plain value types, one record per pipeline stage. Constructors
//! take the record they need; nothing reads global state.

use glam::DVec3;

/// Site location and orientation for solar sampling.
#[derive(Debug, Clone, Copy)]
pub struct SiteConfig {
    /// Degrees north.
    pub latitude_deg: f64,
    /// Degrees east.
    pub longitude_deg: f64,
    /// Fixed UTC offset in hours. DST is not modeled.
    pub timezone_hours: f64,
    /// World-space up axis.
    pub up: DVec3,
    /// World-space north axis. East is `north x up`.
    pub north: DVec3,
    /// Samples at or below this apparent elevation yield no sun vector.
    pub min_elevation_deg: f64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        // Nanjing
        Self {
            latitude_deg: 32.0603,
            longitude_deg: 118.7969,
            timezone_hours: 8.0,
            up: DVec3::Z,
            north: DVec3::Y,
            min_elevation_deg: 0.0,
        }
    }
}

/// A civil calendar date. No time zone is attached; pairing with a wall
/// clock hour and a [`SiteConfig`] timezone fixes the instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl Date {
    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    pub fn is_leap_year(&self) -> bool {
        self.year % 4 == 0 && (self.year % 100 != 0 || self.year % 400 == 0)
    }

    /// 1-based ordinal day within the year.
    pub fn day_of_year(&self) -> u32 {
        const DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
        let mut doy = self.day;
        for days in DAYS.iter().take(self.month.saturating_sub(1) as usize) {
            doy += days;
        }
        if self.month > 2 && self.is_leap_year() {
            doy += 1;
        }
        doy
    }
}

/// Daily sun-sampling window for one season.
#[derive(Debug, Clone, Copy)]
pub struct SamplingWindow {
    pub date: Date,
    /// First sampled wall-clock hour (fractional hours allowed).
    pub start_hour: f64,
    /// Last sampled wall-clock hour, inclusive.
    pub end_hour: f64,
    pub interval_hours: f64,
}

/// The two seasonal windows the optimizer scores against.
#[derive(Debug, Clone, Copy)]
pub struct SamplingConfig {
    pub summer: SamplingWindow,
    pub winter: SamplingWindow,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            summer: SamplingWindow {
                date: Date::new(2025, 6, 21),
                start_hour: 8.0,
                end_hour: 16.0,
                interval_hours: 2.0,
            },
            winter: SamplingWindow {
                date: Date::new(2025, 12, 21),
                start_hour: 8.0,
                end_hour: 16.0,
                interval_hours: 2.0,
            },
        }
    }
}

/// Interior floor footprint receiving light, at z = 0.
#[derive(Debug, Clone, Copy)]
pub struct RoomConfig {
    pub width: f64,
    pub height: f64,
    /// Edge length of one floor grid cell.
    pub cell_size: f64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 1000.0,
            cell_size: 50.0,
        }
    }
}

/// Differential growth tuning.
#[derive(Debug, Clone, Copy)]
pub struct GrowthConfig {
    /// Toroidal tile period along x.
    pub tile_width: f64,
    /// Toroidal tile period along y.
    pub tile_height: f64,
    /// Target spacing between adjacent vertices at density 1.
    pub base_dist: f64,
    /// Upper bound of the repeller density factor.
    pub max_factor: f64,
    /// Repeller influence radius.
    pub max_effect_dist: f64,
    /// Hard cap on the vertex count.
    pub max_points: usize,
    /// Iteration cap for one growth run.
    pub max_iters: usize,
    /// Treat the curve as a closed loop (index wraps n-1 -> 0).
    pub closed: bool,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            tile_width: 1000.0,
            tile_height: 1000.0,
            base_dist: 75.0,
            max_factor: 1.5,
            max_effect_dist: 300.0,
            max_points: 200,
            max_iters: 200,
            closed: true,
        }
    }
}
