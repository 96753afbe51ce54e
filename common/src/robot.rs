use std::f32::consts::TAU;

/// A single reading of a rotating range sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScanReading {
    /// The measured distance, given in the same linear unit as the map resolution.
    pub range: f32,

    /// The angle this reading was acquired at (relative to the sensor zero) in radians.
    pub bearing: f32,
}

impl ScanReading {
    pub fn new(range: f32, bearing: f32) -> Self {
        Self { range, bearing }
    }
}

/// Contains all readings of a single scan (a complete revolution), ordered by increasing bearing
/// starting at angle 0.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub id: usize,
    pub readings: Vec<ScanReading>,
}

impl Scan {
    /// Builds a scan from ranges only. The bearing of each reading is derived from its index,
    /// using a fixed angular increment of `2π / ranges.len()`.
    pub fn from_ranges(id: usize, ranges: &[f32]) -> Self {
        let increment = TAU / ranges.len() as f32;

        Self {
            id,
            readings: ranges
                .iter()
                .enumerate()
                .map(|(i, &range)| ScanReading::new(range, i as f32 * increment))
                .collect(),
        }
    }

    /// A scan where every one of the `count` readings measured the same `range`.
    pub fn uniform(id: usize, count: usize, range: f32) -> Self {
        Self::from_ranges(id, &vec![range; count])
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
