mod io;
mod map;
mod occupancy;
mod ray;
pub mod sensor_model;

pub use map::{Cell, GridData};
pub use occupancy::{GridMap, GridMapConfig, SensorPose};
