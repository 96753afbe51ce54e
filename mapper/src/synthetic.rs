//! Generates laser scans of a small scene with static walls and obstacles moving around the
//! sensor at a constant angular velocity.

use std::f32::consts::TAU;

use anyhow::Context;
use common::robot::{Scan, ScanReading};
use nalgebra::{Point2, Vector2};
use rand::Rng;
use serde::Deserialize;
use statrs::distribution::Normal;

use crate::scene::{Intersect, LineSegment, Ray, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub enum SceneObject {
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// An obstacle at a fixed distance from the sensor that circles around it.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MovingObstacle {
    pub distance: f32,
    pub length: f32,
    /// angle at the first scan, in radians
    pub angle: f32,
    /// radians per scan
    pub angular_velocity: f32,
}

impl MovingObstacle {
    fn at(&self, scan: usize) -> LineSegment {
        let angle = self.angle + scan as f32 * self.angular_velocity;
        LineSegment::facing_origin(self.distance, angle, self.length)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub objects: Vec<SceneObject>,

    #[serde(default)]
    pub moving: Vec<MovingObstacle>,

    /// standard deviation of the range noise, 0 disables noise
    #[serde(default)]
    pub range_noise: f64,
}

impl Default for SceneConfig {
    /// A wall in front of the sensor, a box behind it, a person and a car passing by.
    fn default() -> Self {
        Self {
            objects: vec![
                SceneObject::Line {
                    x1: 6.0,
                    y1: -2.0,
                    x2: 6.0,
                    y2: 2.0,
                },
                SceneObject::Rectangle {
                    x: -7.0,
                    y: -1.5,
                    width: 3.0,
                    height: 3.0,
                },
            ],
            moving: vec![
                MovingObstacle {
                    distance: 3.0,
                    length: 0.5,
                    angle: 0.8 * std::f32::consts::FRAC_PI_2,
                    angular_velocity: 0.05 * std::f32::consts::FRAC_PI_2,
                },
                MovingObstacle {
                    distance: 5.0,
                    length: 2.0,
                    angle: 2.8 * std::f32::consts::FRAC_PI_2,
                    angular_velocity: 0.1 * std::f32::consts::FRAC_PI_2,
                },
            ],
            range_noise: 0.0,
        }
    }
}

pub struct SyntheticScene {
    config: SceneConfig,
    noise: Option<Normal>,
}

impl SyntheticScene {
    pub fn new(config: &SceneConfig) -> anyhow::Result<Self> {
        let noise = if config.range_noise != 0.0 {
            Some(Normal::new(0.0, config.range_noise).context("Invalid range noise")?)
        } else {
            None
        };

        Ok(Self {
            config: config.clone(),
            noise,
        })
    }

    /// Builds the scene as it looks at scan number `scan`.
    fn scene_at(&self, scan: usize) -> Scene {
        let mut scene = Scene::new();

        for o in &self.config.objects {
            match *o {
                SceneObject::Line { x1, y1, x2, y2 } => {
                    scene.add(Box::new(LineSegment::new(x1, y1, x2, y2)));
                }
                SceneObject::Rectangle {
                    x,
                    y,
                    width,
                    height,
                } => {
                    scene.add_rect(Point2::new(x, y), Vector2::new(width, height));
                }
            }
        }

        for m in &self.config.moving {
            scene.add(Box::new(m.at(scan)));
        }

        scene
    }

    /// Takes scan number `id` with `count` readings from the world origin. Beams that hit
    /// nothing within `max_range` report a range just beyond it.
    pub fn scan<R: Rng>(&self, id: usize, count: usize, max_range: f32, rng: &mut R) -> Scan {
        let scene = self.scene_at(id);
        let increment = TAU / count as f32;
        let origin = Point2::new(0.0, 0.0);

        let readings = (0..count)
            .map(|i| {
                let bearing = i as f32 * increment;
                let range = match scene.intersect(&Ray::from_origin_angle(origin, bearing)) {
                    Some(u) if u <= max_range => {
                        let noise: f64 = self.noise.as_ref().map_or(0.0, |n| rng.sample(n));
                        (u + noise as f32).max(0.0)
                    }
                    _ => max_range + 1.0,
                };
                ScanReading::new(range, bearing)
            })
            .collect();

        Scan { id, readings }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn static_wall() -> SceneConfig {
        SceneConfig {
            objects: vec![SceneObject::Line {
                x1: 6.0,
                y1: -2.0,
                x2: 6.0,
                y2: 2.0,
            }],
            moving: vec![],
            range_noise: 0.0,
        }
    }

    #[test]
    fn wall_ahead_is_measured() {
        let scene = SyntheticScene::new(&static_wall()).unwrap();
        let scan = scene.scan(0, 360, 8.0, &mut StdRng::seed_from_u64(1));

        assert_eq!(scan.len(), 360);
        assert_relative_eq!(scan.readings[0].range, 6.0, epsilon = 1e-4);
        assert_relative_eq!(scan.readings[0].bearing, 0.0);
        // nothing behind the sensor
        assert_relative_eq!(scan.readings[180].range, 9.0);
    }

    #[test]
    fn obstacles_move_between_scans() {
        let config = SceneConfig {
            objects: vec![],
            moving: vec![MovingObstacle {
                distance: 3.0,
                length: 0.5,
                angle: 0.0,
                angular_velocity: std::f32::consts::FRAC_PI_2,
            }],
            range_noise: 0.0,
        };
        let scene = SyntheticScene::new(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let first = scene.scan(0, 4, 8.0, &mut rng);
        let second = scene.scan(1, 4, 8.0, &mut rng);

        assert_relative_eq!(first.readings[0].range, 3.0, epsilon = 1e-4);
        assert_relative_eq!(first.readings[1].range, 9.0);
        assert_relative_eq!(second.readings[0].range, 9.0);
        assert_relative_eq!(second.readings[1].range, 3.0, epsilon = 1e-4);
    }

    #[test]
    fn noise_perturbs_ranges() {
        let mut config = static_wall();
        config.range_noise = 0.05;
        let scene = SyntheticScene::new(&config).unwrap();

        let scan = scene.scan(0, 360, 8.0, &mut StdRng::seed_from_u64(7));
        let hits: Vec<f32> = scan.readings.iter().map(|r| r.range).filter(|&r| r <= 8.0).collect();

        assert!(!hits.is_empty());
        assert!(hits.iter().all(|&r| (5.5..7.0).contains(&r)));
    }

    #[test]
    fn negative_noise_is_rejected() {
        let mut config = static_wall();
        config.range_noise = -0.1;

        assert!(SyntheticScene::new(&config).is_err());
    }

    #[test]
    fn default_scene_is_visible() {
        let scene = SyntheticScene::new(&SceneConfig::default()).unwrap();
        let scan = scene.scan(0, 360, 8.0, &mut StdRng::seed_from_u64(1));

        let hits = scan.readings.iter().filter(|r| r.range <= 8.0).count();
        assert!(hits > 0);
        assert!(hits < 360);
    }
}
