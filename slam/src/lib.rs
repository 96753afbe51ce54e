//! Occupancy grid mapping from rotating range sensor scans.
//!
//! The [`grid::GridMap`] owns a grayscale raster where every cell holds the belief about the
//! space it covers: `0` is occupied, `255` is free and `125` has not been seen yet. Scans are
//! ingested one at a time; the first scan initializes the raster, every following scan blends
//! new evidence into it.

pub mod error;
pub mod grid;

pub use error::MapError;
pub use grid::{Cell, GridData, GridMap, GridMapConfig, SensorPose};
