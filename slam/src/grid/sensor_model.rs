//! Inverse sensor model of a single range reading.

use std::f32::consts::PI;

/// Raster value of a cell that is confidently occupied.
pub const OCCUPIED_VALUE: u8 = 0;

/// Raster value of a cell that is confidently free.
pub const FREE_VALUE: u8 = 255;

/// Raster value of a cell that has not been observed.
pub const UNSEEN_VALUE: u8 = 125;

/// Classification of a point along a measured ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Free,
    Occupied,
    Unseen,
}

impl Occupancy {
    /// The raster value that represents this classification.
    pub fn intensity(self) -> u8 {
        match self {
            Occupancy::Free => FREE_VALUE,
            Occupancy::Occupied => OCCUPIED_VALUE,
            Occupancy::Unseen => UNSEEN_VALUE,
        }
    }
}

/// Classifies the point at distance `query` along a ray whose reading measured `range`.
///
/// Points within `±cov/2` of the measured range hold the obstacle. Points the beam passed on its
/// way to the obstacle are free, everything behind the obstacle is unseen.
pub fn inverse_sensor_model(range: f32, query: f32, cov: f32) -> Occupancy {
    let band = cov / 2.0;

    if range > query - band && range < query + band {
        Occupancy::Occupied
    } else if range > query + band {
        Occupancy::Free
    } else {
        Occupancy::Unseen
    }
}

/// Reduces a bearing above π by exactly one π. Bearings at or below π are returned unchanged,
/// this is not a normalization into `[-π, π]`.
pub fn wrap_angle(theta: f32) -> f32 {
    if theta > PI {
        theta - PI
    } else {
        theta
    }
}
