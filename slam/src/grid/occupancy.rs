use std::{f32::consts::TAU, path::Path};

use common::robot::ScanReading;
use nalgebra::Vector2;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{
    io,
    map::{Cell, GridData},
    ray::RayMarcher,
    sensor_model::{inverse_sensor_model, UNSEEN_VALUE},
};
use crate::error::{MapError, Result};

pub const DEFAULT_READINGS_PER_SCAN: usize = 40;
pub const DEFAULT_SENSOR_COV: f32 = 0.2;
pub const DEFAULT_DECAY_RATE: f32 = 1.0;
pub const DEFAULT_SENSOR_RANGE: f32 = 8.0;

/// Where the sensor sits in the grid and which way it is facing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct SensorPose {
    /// The cell of the sensor. `None` until set, the grid center is used on first use then.
    #[serde(default)]
    pub origin: Option<Cell>,

    /// Heading offset in radians, subtracted from every bearing before ray casting.
    #[serde(default)]
    pub heading: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GridMapConfig {
    /// grid width in cells
    pub width: usize,
    /// grid height in cells
    pub height: usize,
    /// map units per cell
    pub resolution: f32,

    #[serde(default = "default_sensor_range")]
    pub sensor_range: f32,
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f32,
    #[serde(default = "default_sensor_cov")]
    pub sensor_cov: f32,
    #[serde(default = "default_readings_per_scan")]
    pub readings_per_scan: usize,

    #[serde(default)]
    pub pose: SensorPose,
}

fn default_sensor_range() -> f32 {
    DEFAULT_SENSOR_RANGE
}

fn default_decay_rate() -> f32 {
    DEFAULT_DECAY_RATE
}

fn default_sensor_cov() -> f32 {
    DEFAULT_SENSOR_COV
}

fn default_readings_per_scan() -> usize {
    DEFAULT_READINGS_PER_SCAN
}

/// Occupancy grid built from consecutive range scans.
///
/// Configure the geometry, then feed scans through [`GridMap::ingest`]. The first scan allocates
/// and initializes the raster, every later scan updates it using the decay rate.
#[derive(Debug, Clone)]
pub struct GridMap {
    /** the size of the map in cells */
    size: Vector2<usize>,

    /** the resolution of this map, given in map units per cell */
    resolution: f32,

    sensor_range: f32,
    sensor_cov: f32,
    decay_rate: f32,
    readings_per_scan: usize,
    increment_angle: f32,

    pose: SensorPose,

    raster: Option<GridData<u8>>,

    /// set when the raster was restored from a file
    resumed: bool,
}

impl Default for GridMap {
    fn default() -> Self {
        Self {
            size: Vector2::new(0, 0),
            resolution: 0.0,
            sensor_range: DEFAULT_SENSOR_RANGE,
            sensor_cov: DEFAULT_SENSOR_COV,
            decay_rate: DEFAULT_DECAY_RATE,
            readings_per_scan: DEFAULT_READINGS_PER_SCAN,
            increment_angle: TAU / DEFAULT_READINGS_PER_SCAN as f32,
            pose: SensorPose::default(),
            raster: None,
            resumed: false,
        }
    }
}

impl GridMap {
    pub fn new(config: &GridMapConfig) -> Self {
        let mut map = GridMap {
            size: Vector2::new(config.width, config.height),
            resolution: config.resolution,
            sensor_range: config.sensor_range,
            sensor_cov: config.sensor_cov,
            decay_rate: config.decay_rate,
            pose: config.pose,
            ..Default::default()
        };
        map.set_readings_per_scan(config.readings_per_scan);
        map
    }

    /// Sets the grid size in cells. Has no effect once the raster exists, the size of an
    /// allocated raster never changes.
    pub fn set_size(&mut self, width: usize, height: usize) {
        if self.raster.is_some() {
            warn!(
                "Ignoring resize to {width}x{height}, the {}x{} raster is already allocated",
                self.size.x, self.size.y
            );
            return;
        }
        self.size = Vector2::new(width, height);
    }

    pub fn width(&self) -> usize {
        self.size.x
    }

    pub fn height(&self) -> usize {
        self.size.y
    }

    pub fn set_resolution(&mut self, resolution: f32) {
        self.resolution = resolution;
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// Readings with a range beyond this are ignored.
    pub fn set_sensor_range(&mut self, range: f32) {
        self.sensor_range = range;
    }

    pub fn sensor_range(&self) -> f32 {
        self.sensor_range
    }

    /// Blend factor in `[0, 1]` used when updating an existing raster. Values outside of the
    /// range are accepted and saturate the blended cells.
    pub fn set_decay_rate(&mut self, decay_rate: f32) {
        self.decay_rate = decay_rate;
    }

    pub fn decay_rate(&self) -> f32 {
        self.decay_rate
    }

    /// Width of the band around a measured range that is considered occupied.
    pub fn set_sensor_cov(&mut self, cov: f32) {
        self.sensor_cov = cov;
    }

    pub fn sensor_cov(&self) -> f32 {
        self.sensor_cov
    }

    /// Sets the number of readings in every scan and recomputes the angular increment.
    pub fn set_readings_per_scan(&mut self, count: usize) {
        self.readings_per_scan = count;
        self.increment_angle = TAU / count as f32;
    }

    pub fn readings_per_scan(&self) -> usize {
        self.readings_per_scan
    }

    /// Overrides the angular increment between two readings.
    pub fn set_increment_angle(&mut self, increment: f32) {
        self.increment_angle = increment;
    }

    pub fn increment_angle(&self) -> f32 {
        self.increment_angle
    }

    pub fn set_origin(&mut self, origin: Cell) {
        self.pose.origin = Some(origin);
    }

    pub fn origin(&self) -> Option<Cell> {
        self.pose.origin
    }

    pub fn set_heading(&mut self, heading: f32) {
        self.pose.heading = heading;
    }

    pub fn heading(&self) -> f32 {
        self.pose.heading
    }

    pub fn set_pose(&mut self, pose: SensorPose) {
        self.pose = pose;
    }

    pub fn pose(&self) -> SensorPose {
        self.pose
    }

    pub fn raster(&self) -> Option<&GridData<u8>> {
        self.raster.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.raster.is_some()
    }

    /// True if the raster was restored with [`GridMap::load`] instead of built from scratch.
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    /// Integrates one scan into the map. The first scan initializes the raster, every later
    /// scan updates it in place.
    ///
    /// Fails with [`MapError::InvalidGeometry`] if width or height is zero and with
    /// [`MapError::InvalidResolution`] if the resolution is not positive. Only the first
    /// `readings_per_scan` readings are used.
    pub fn ingest(&mut self, readings: &[ScanReading]) -> Result<()> {
        if self.size.x == 0 || self.size.y == 0 {
            return Err(MapError::InvalidGeometry {
                width: self.size.x,
                height: self.size.y,
            });
        }
        if self.resolution.is_nan() || self.resolution <= 0.0 {
            return Err(MapError::InvalidResolution(self.resolution));
        }

        if readings.len() != self.readings_per_scan {
            warn!(
                "Expected {} readings per scan but got {}",
                self.readings_per_scan,
                readings.len()
            );
        }
        let readings = &readings[..readings.len().min(self.readings_per_scan)];

        match self.raster.take() {
            None => {
                debug!("Initializing {}x{} map", self.size.x, self.size.y);
                let raster = self.initialize(readings);
                self.raster = Some(raster);
            }
            Some(mut raster) => {
                debug!("Updating map with {} readings", readings.len());
                self.update(&mut raster, readings);
                self.raster = Some(raster);
            }
        }

        Ok(())
    }

    /// Resolves an unset origin to the grid center and returns the mirrored origin used for
    /// ray casting.
    fn ray_origin(&mut self) -> Vector2<f32> {
        let center = Cell::new(self.size.x / 2, self.size.y / 2);
        let origin = *self.pose.origin.get_or_insert(center);

        Vector2::new(
            self.size.x as f32 - origin.column as f32,
            self.size.y as f32 - origin.row as f32,
        )
    }

    fn march(&self, origin: Vector2<f32>, bearing: f32, limit: f32) -> RayMarcher {
        RayMarcher::new(
            origin,
            bearing - self.pose.heading,
            self.resolution,
            limit,
            self.size,
        )
    }

    /// Allocates a raster of unseen cells and classifies every cell along every reading. A cell
    /// is written only while it is still unseen, so the first reading to reach it wins.
    fn initialize(&mut self, readings: &[ScanReading]) -> GridData<u8> {
        let mut raster = GridData::new_fill(self.size.x, self.size.y, UNSEEN_VALUE);
        let origin = self.ray_origin();

        for reading in readings {
            if reading.range > self.sensor_range {
                continue;
            }

            let limit = reading.range + 4.0 * self.sensor_cov;
            for (distance, cell) in self.march(origin, reading.bearing, limit) {
                let Some(value) = raster.get_mut(cell) else {
                    continue;
                };
                if *value != UNSEEN_VALUE {
                    continue;
                }
                *value = inverse_sensor_model(reading.range, distance, self.sensor_cov).intensity();
            }
        }

        raster
    }

    /// Blends every cell along every reading up to the maximum sensor range with its new target
    /// value: `target - current * (1 - decay_rate)`, saturated to the raster range.
    fn update(&mut self, raster: &mut GridData<u8>, readings: &[ScanReading]) {
        let origin = self.ray_origin();

        for reading in readings {
            if reading.range > self.sensor_range {
                continue;
            }

            for (distance, cell) in self.march(origin, reading.bearing, self.sensor_range) {
                let Some(value) = raster.get_mut(cell) else {
                    continue;
                };
                let target =
                    inverse_sensor_model(reading.range, distance, self.sensor_cov).intensity();
                *value = blend(target, *value, self.decay_rate);
            }
        }
    }

    /// Writes the raster as a single channel grayscale image. The format follows the file
    /// extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let raster = self.raster.as_ref().ok_or(MapError::NotInitialized)?;

        io::write_raster(raster, path)?;
        info!("Map has been written to {}", path.display());
        Ok(())
    }

    /// Replaces the raster with a previously saved one. The grid size follows the loaded image,
    /// later scans update the restored map.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let raster = io::read_raster(path)?;

        info!(
            "Resuming {}x{} map from {}",
            raster.width(),
            raster.height(),
            path.display()
        );
        self.size = raster.size();
        self.raster = Some(raster);
        self.resumed = true;
        Ok(())
    }
}

fn blend(target: u8, current: u8, decay_rate: f32) -> u8 {
    let value = (target as f32 - current as f32 * (1.0 - decay_rate)) as i32;
    value.clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;
    use crate::grid::sensor_model::{FREE_VALUE, OCCUPIED_VALUE};

    /// A map with one cell per map unit, so sample `j` lands `j` cells away from the origin.
    fn unit_map(width: usize, height: usize, readings_per_scan: usize) -> GridMap {
        GridMap::new(&GridMapConfig {
            width,
            height,
            resolution: 1.0,
            sensor_range: 8.0,
            decay_rate: 1.0,
            sensor_cov: 0.2,
            readings_per_scan,
            pose: SensorPose::default(),
        })
    }

    fn value(map: &GridMap, column: usize, row: usize) -> u8 {
        *map.raster()
            .and_then(|r| r.get(Cell::new(column, row)))
            .unwrap()
    }

    #[test]
    fn zero_size_is_invalid_geometry() {
        let mut map = GridMap::default();
        map.set_resolution(0.2);

        let err = map.ingest(&[ScanReading::new(1.0, 0.0)]).unwrap_err();
        assert!(matches!(err, MapError::InvalidGeometry { width: 0, height: 0 }));

        map.set_size(80, 0);
        let err = map.ingest(&[ScanReading::new(1.0, 0.0)]).unwrap_err();
        assert!(matches!(err, MapError::InvalidGeometry { width: 80, height: 0 }));
        assert!(!map.is_initialized());
    }

    #[test]
    fn zero_resolution_is_invalid_resolution() {
        let mut map = GridMap::default();
        map.set_size(80, 80);

        let err = map.ingest(&[]).unwrap_err();
        assert!(matches!(err, MapError::InvalidResolution(r) if r == 0.0));

        map.set_resolution(-0.2);
        let err = map.ingest(&[]).unwrap_err();
        assert!(matches!(err, MapError::InvalidResolution(_)));
        assert!(!map.is_initialized());
    }

    #[test]
    fn geometry_is_checked_before_resolution() {
        let mut map = GridMap::default();

        let err = map.ingest(&[]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn first_scan_allocates_unseen_raster_centered_on_sensor() {
        let mut map = unit_map(10, 10, 1);
        assert_eq!(map.origin(), None);

        // beyond the sensor range, nothing is classified
        map.ingest(&[ScanReading::new(9.0, 0.0)]).unwrap();

        let raster = map.raster().unwrap();
        assert_eq!(raster.width(), 10);
        assert_eq!(raster.height(), 10);
        assert!(raster.iter().all(|&v| v == UNSEEN_VALUE));
        assert_eq!(map.origin(), Some(Cell::new(5, 5)));
    }

    #[test]
    fn initialize_classifies_single_ray() {
        let mut map = unit_map(20, 20, 1);
        map.ingest(&[ScanReading::new(5.0, 0.0)]).unwrap();

        for row in 6..=9 {
            assert_eq!(value(&map, 10, row), FREE_VALUE, "row {row}");
        }
        assert_eq!(value(&map, 10, 5), OCCUPIED_VALUE);
        assert_eq!(value(&map, 10, 4), UNSEEN_VALUE);
        assert_eq!(value(&map, 10, 10), UNSEEN_VALUE);

        let classified = map.raster().unwrap().iter().filter(|&&v| v != UNSEEN_VALUE);
        assert_eq!(classified.count(), 5);
    }

    #[test]
    fn initialize_first_write_wins() {
        let mut map = unit_map(20, 20, 2);
        map.ingest(&[ScanReading::new(3.0, 0.0), ScanReading::new(5.0, 0.0)])
            .unwrap();

        // the second ray would mark row 7 as free, but the first already placed its hit there
        assert_eq!(value(&map, 10, 7), OCCUPIED_VALUE);
        assert_eq!(value(&map, 10, 6), FREE_VALUE);
        assert_eq!(value(&map, 10, 5), OCCUPIED_VALUE);
    }

    #[test]
    fn mirrored_origin_convention() {
        let mut map = unit_map(10, 10, 2);
        map.set_origin(Cell::new(3, 4));
        map.ingest(&[
            ScanReading::new(2.0, 0.0),
            ScanReading::new(2.0, FRAC_PI_2),
        ])
        .unwrap();

        // the origin is reflected to column 10 - 3, row 10 - 4
        assert_eq!(value(&map, 7, 5), FREE_VALUE);
        assert_eq!(value(&map, 7, 4), OCCUPIED_VALUE);
        assert_eq!(value(&map, 6, 6), FREE_VALUE);
        assert_eq!(value(&map, 5, 6), OCCUPIED_VALUE);
        assert_eq!(value(&map, 3, 4), UNSEEN_VALUE);
    }

    #[test]
    fn heading_rotates_every_bearing() {
        let mut rotated = unit_map(20, 20, 1);
        rotated.set_heading(FRAC_PI_2);
        rotated.ingest(&[ScanReading::new(5.0, FRAC_PI_2)]).unwrap();

        let mut straight = unit_map(20, 20, 1);
        straight.ingest(&[ScanReading::new(5.0, 0.0)]).unwrap();

        assert_eq!(rotated.raster(), straight.raster());
    }

    #[test]
    fn readings_beyond_range_change_nothing() {
        let mut map = unit_map(20, 20, 1);
        map.ingest(&[ScanReading::new(5.0, 0.0)]).unwrap();
        let before = map.raster().cloned();

        map.set_decay_rate(0.5);
        map.ingest(&[ScanReading::new(8.5, 0.0)]).unwrap();

        assert_eq!(map.raster().cloned(), before);
    }

    #[test]
    fn update_with_full_decay_overwrites() {
        let mut map = unit_map(20, 20, 1);
        map.ingest(&[ScanReading::new(5.0, 0.0)]).unwrap();
        map.ingest(&[ScanReading::new(3.0, 0.0)]).unwrap();

        assert_eq!(value(&map, 10, 9), FREE_VALUE);
        assert_eq!(value(&map, 10, 8), FREE_VALUE);
        assert_eq!(value(&map, 10, 7), OCCUPIED_VALUE);
        // behind the new hit, up to the sensor range
        assert_eq!(value(&map, 10, 6), UNSEEN_VALUE);
        assert_eq!(value(&map, 10, 5), UNSEEN_VALUE);
        assert_eq!(value(&map, 10, 3), UNSEEN_VALUE);
        assert_eq!(value(&map, 10, 2), UNSEEN_VALUE);
    }

    #[test]
    fn update_follows_linear_decay() {
        let mut map = unit_map(20, 20, 1);
        map.ingest(&[ScanReading::new(5.0, 0.0)]).unwrap();
        map.set_decay_rate(0.5);
        map.ingest(&[ScanReading::new(5.0, 0.0)]).unwrap();

        // 255 - 255 * 0.5
        assert_eq!(value(&map, 10, 9), 127);
        // 0 - 0 * 0.5
        assert_eq!(value(&map, 10, 5), 0);
        // 125 - 125 * 0.5, never reached by the first scan
        assert_eq!(value(&map, 10, 4), 62);
    }

    #[test]
    fn update_saturates() {
        let mut map = unit_map(20, 20, 1);
        map.ingest(&[ScanReading::new(5.0, 0.0)]).unwrap();

        // free cell hit by an obstacle: 0 - 255 * 0.5
        map.set_decay_rate(0.5);
        map.ingest(&[ScanReading::new(1.0, 0.0)]).unwrap();
        assert_eq!(value(&map, 10, 9), 0);

        // unseen target behind the hit: 125 - 255 * 0.5
        assert_eq!(value(&map, 10, 8), 0);

        // an out of range decay adds the current value instead
        map.set_decay_rate(2.0);
        map.ingest(&[ScanReading::new(1.0, 0.0)]).unwrap();
        assert_eq!(value(&map, 10, 8), 125);
        map.ingest(&[ScanReading::new(1.0, 0.0)]).unwrap();
        assert_eq!(value(&map, 10, 8), 250);
        map.ingest(&[ScanReading::new(1.0, 0.0)]).unwrap();
        assert_eq!(value(&map, 10, 8), 255);
    }

    #[test]
    fn blend_formula() {
        assert_eq!(blend(255, 255, 0.0), 0);
        assert_eq!(blend(255, 100, 1.0), 255);
        assert_eq!(blend(0, 200, 1.0), 0);
        assert_eq!(blend(125, 125, 0.5), 62);
        assert_eq!(blend(255, 10, 0.0), 245);
    }

    #[test]
    fn extra_readings_are_ignored() {
        let mut map = unit_map(20, 20, 1);
        map.ingest(&[ScanReading::new(5.0, 0.0), ScanReading::new(5.0, FRAC_PI_2)])
            .unwrap();

        // the second reading would have cleared the cells left of the origin
        assert_eq!(value(&map, 9, 10), UNSEEN_VALUE);
    }

    #[test]
    fn size_is_fixed_once_allocated() {
        let mut map = unit_map(10, 10, 1);
        map.ingest(&[ScanReading::new(2.0, 0.0)]).unwrap();
        map.set_size(30, 30);

        assert_eq!(map.width(), 10);
        assert_eq!(map.raster().unwrap().width(), 10);
        map.ingest(&[ScanReading::new(2.0, 0.0)]).unwrap();
    }

    #[test]
    fn readings_per_scan_sets_increment() {
        let mut map = GridMap::default();
        assert_eq!(map.readings_per_scan(), 40);

        map.set_readings_per_scan(360);
        approx::assert_relative_eq!(map.increment_angle(), 1f32.to_radians(), epsilon = 1e-6);

        map.set_increment_angle(0.5);
        approx::assert_relative_eq!(map.increment_angle(), 0.5);
        assert_eq!(map.readings_per_scan(), 360);
    }

    #[test]
    fn config_from_yaml() {
        let config: GridMapConfig = serde_yaml::from_str(
            "width: 80\nheight: 60\nresolution: 0.2\npose:\n  origin: {column: 10, row: 20}\n",
        )
        .unwrap();
        let map = GridMap::new(&config);

        assert_eq!(map.width(), 80);
        assert_eq!(map.height(), 60);
        assert_eq!(map.readings_per_scan(), DEFAULT_READINGS_PER_SCAN);
        assert_eq!(map.sensor_range(), DEFAULT_SENSOR_RANGE);
        assert_eq!(map.decay_rate(), DEFAULT_DECAY_RATE);
        assert_eq!(map.origin(), Some(Cell::new(10, 20)));
        assert_eq!(map.heading(), 0.0);
    }
}
