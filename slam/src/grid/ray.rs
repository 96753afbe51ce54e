use nalgebra::Vector2;

use super::map::Cell;

/// Samples a ray at fixed steps and yields the grid cell under every sample.
///
/// Targets are placed relative to the mirrored sensor origin: the sample at distance `j` lands on
/// `origin - j * (sin φ, cos φ) / resolution`, truncated toward zero. Samples outside of the grid
/// are skipped.
pub struct RayMarcher {
    /// Number of columns and rows in the grid to generate `Cell`s for.
    size: Vector2<usize>,

    origin: Vector2<f32>,
    direction: Vector2<f32>,
    resolution: f32,
    distance: f32,
    limit: f32,
}

impl RayMarcher {
    /// Create an iterator over the samples `resolution, 2·resolution, …` strictly below `limit`.
    /// `origin` is given in (fractional) grid coordinates, `angle` in radians.
    pub fn new(
        origin: Vector2<f32>,
        angle: f32,
        resolution: f32,
        limit: f32,
        size: Vector2<usize>,
    ) -> Self {
        // no sample further away than the farthest corner (plus truncation slack) can hit the grid
        let corners = [
            Vector2::new(0.0, 0.0),
            Vector2::new(size.x as f32, 0.0),
            Vector2::new(0.0, size.y as f32),
            Vector2::new(size.x as f32, size.y as f32),
        ];
        let reach = corners
            .iter()
            .map(|c| (c - origin).norm())
            .fold(0.0f32, f32::max);
        let limit = limit.min((reach + 2.0) * resolution);

        Self {
            size,
            origin,
            direction: Vector2::new(angle.sin(), angle.cos()),
            resolution,
            distance: resolution,
            limit,
        }
    }

    fn target(&self, distance: f32) -> Option<Cell> {
        let column = self.origin.x - (distance * self.direction.x) / self.resolution;
        let row = self.origin.y - (distance * self.direction.y) / self.resolution;

        let column = column.trunc();
        let row = row.trunc();

        let inside = column >= 0.0
            && row >= 0.0
            && column < self.size.x as f32
            && row < self.size.y as f32;

        inside.then(|| Cell::new(column as usize, row as usize))
    }
}

impl Iterator for RayMarcher {
    type Item = (f32, Cell);

    fn next(&mut self) -> Option<Self::Item> {
        // stop when the limit is reached or the step no longer advances the sample
        while self.distance < self.limit {
            let distance = self.distance;
            self.distance += self.resolution;

            if self.distance <= distance {
                self.limit = distance;
            }

            if let Some(cell) = self.target(distance) {
                return Some((distance, cell));
            }
        }
        None
    }
}
