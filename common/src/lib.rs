//! Contains the sensor data types shared between the map builder and the tools that drive it.

pub mod robot;
