use std::cmp::Ordering;

use nalgebra::{Point2, Vector2};

pub struct Ray {
    origin: Point2<f32>,
    direction: Vector2<f32>,
}

impl Ray {
    pub fn from_origin_angle(origin: Point2<f32>, angle: f32) -> Self {
        Self {
            origin,
            direction: Vector2::new(angle.cos(), angle.sin()),
        }
    }
}

pub trait Intersect {
    /// Returns the intersection between the object and the `Ray` as a
    /// length `u` along the `direction` of the ray such that the
    /// intersection point can be described by `ray.origin + u*ray.direction`,
    /// or `None` if no intersection occurs.
    fn intersect(&self, ray: &Ray) -> Option<f32>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    p1: Point2<f32>,
    p2: Point2<f32>,
}

impl LineSegment {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            p1: Point2::new(x1, y1),
            p2: Point2::new(x2, y2),
        }
    }

    /// A segment of `length` centered at `distance` from the world origin in direction `angle`,
    /// lying perpendicular to that direction.
    pub fn facing_origin(distance: f32, angle: f32, length: f32) -> Self {
        let center = Point2::new(distance * angle.cos(), distance * angle.sin());
        let half = Vector2::new(-angle.sin(), angle.cos()) * (length / 2.0);

        Self {
            p1: center - half,
            p2: center + half,
        }
    }
}

impl Intersect for LineSegment {
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        let x1 = self.p1.x;
        let y1 = self.p1.y;
        let x2 = self.p2.x;
        let y2 = self.p2.y;

        let x3 = ray.origin.x;
        let y3 = ray.origin.y;
        let x4 = ray.origin.x + ray.direction.x;
        let y4 = ray.origin.y + ray.direction.y;

        let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);

        // make sure lines are not parallell
        if denom == 0.0 {
            return None;
        }

        let t = ((x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4)) / denom;
        let u = -((x1 - x2) * (y1 - y3) - (y1 - y2) * (x1 - x3)) / denom;

        if (0.0..=1.0).contains(&t) && u > 0.0 {
            return Some(u);
        }
        None
    }
}

#[derive(Default)]
pub struct Scene {
    objects: Vec<Box<dyn Intersect + Send + Sync>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, obj: Box<dyn Intersect + Send + Sync>) -> &mut Self {
        self.objects.push(obj);
        self
    }

    pub fn add_rect(&mut self, origin: Point2<f32>, size: Vector2<f32>) -> &mut Self {
        self.add(Box::new(LineSegment::new(
            origin.x,
            origin.y,
            origin.x + size.x,
            origin.y,
        )))
        .add(Box::new(LineSegment::new(
            origin.x + size.x,
            origin.y,
            origin.x + size.x,
            origin.y + size.y,
        )))
        .add(Box::new(LineSegment::new(
            origin.x + size.x,
            origin.y + size.y,
            origin.x,
            origin.y + size.y,
        )))
        .add(Box::new(LineSegment::new(
            origin.x,
            origin.y + size.y,
            origin.x,
            origin.y,
        )))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Intersect for Scene {
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        // keep lowest u value to only get closest intersection
        self.objects
            .iter()
            .filter_map(|o| o.intersect(ray))
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Less))
    }
}
