//! Free-form curtain-wall design against seasonal daylight.
//!
//! The crate implements the deterministic simulation pipeline behind a
//! two-objective daylighting search, organized into progressive stages:
//!
//! **Stage 1: Planform** - a closed curve grown by differential repulsion
//! on a toroidal tile, with repeller-modulated local spacing.
//!
//! **Stage 2: Curtain** - the planform rotated into the facade plane and
//! extruded per vertex into a quad strip.
//!
//! **Stage 3: Daylight** - NOAA sun positions sampled over a daily window,
//! and the strip's shadow rasterized onto an interior floor grid.
//!
//! **Stage 4: Search** - an NSGA-II driver that treats repeller factors and
//! extrusion offsets as the genome and the two seasonal light-hour totals
//! as objectives.

pub mod config;
pub mod evaluator;
pub mod geometry;
pub mod io;
pub mod optim;
pub mod shadow;
pub mod solar;
pub mod util;
