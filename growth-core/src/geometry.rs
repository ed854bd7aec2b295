//! Plain 2-D shapes and the scalar helpers shared by the sampler and the graph.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Axis-aligned rectangle covering the half-open region `[x, x+w) × [y, y+h)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Area {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Square area of side `2 * half_extent` centred on `center`.
    pub fn centered(center: Vec2, half_extent: f32) -> Self {
        Self::new(
            center.x - half_extent,
            center.y - half_extent,
            2.0 * half_extent,
            2.0 * half_extent,
        )
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Half-open containment test.
    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }

    /// Returns `true` if the circle overlaps this area.
    ///
    /// Uses the point of the area closest to the circle centre; touching
    /// the boundary exactly does not count as an intersection.
    #[inline]
    pub fn intersects_circle(&self, circle: &Circle) -> bool {
        let nearest = Vec2::new(
            clamp(circle.x, self.x, self.x + self.w),
            clamp(circle.y, self.y, self.y + self.h),
        );
        (circle.center() - nearest).length_squared() < circle.radius * circle.radius
    }

    /// Uniformly random point inside the area.
    pub fn random_point(&self, rng: &mut impl Rng) -> Vec2 {
        Vec2::new(
            random(rng, self.x, self.x + self.w),
            random(rng, self.y, self.y + self.h),
        )
    }
}

/// Circle used as a query shape.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl Circle {
    pub const fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { x, y, radius }
    }

    pub fn around(center: Vec2, radius: f32) -> Self {
        Self::new(center.x, center.y, radius)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Strict containment: points on the boundary are outside.
    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        (p - self.center()).length_squared() < self.radius * self.radius
    }
}

/// `max(min, min(max, value))`, without the `min <= max` assertion of [`f32::clamp`].
#[inline]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    min.max(max.min(value))
}

/// Linearly maps `x` from `[a1, a2]` to `[b1, b2]` (no clamping).
///
/// A degenerate source range (`a1 == a2`) maps everything to `b1`.
#[inline]
pub fn map_linear(x: f32, a1: f32, a2: f32, b1: f32, b2: f32) -> f32 {
    let span = a2 - a1;
    if span == 0.0 {
        return b1;
    }
    b1 + (x - a1) * (b2 - b1) / span
}

/// Uniform value in `[min, max)`. Unlike `Rng::random_range` an empty or
/// inverted range is accepted.
#[inline]
pub fn random(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    rng.random::<f32>() * (max - min) + min
}

pub fn random_unit_vector(rng: &mut impl Rng) -> Vec2 {
    let angle = rng.random::<f32>() * TAU;
    Vec2::new(angle.cos(), angle.sin())
}

/// Picks a uniformly random element of `items`.
///
/// ### Errors
/// [`Error::EmptyCollection`] if `items` is empty.
pub fn random_element<'a, T>(items: &'a [T], rng: &mut impl Rng) -> Result<&'a T, Error> {
    if items.is_empty() {
        return Err(Error::EmptyCollection);
    }
    Ok(&items[rng.random_range(0..items.len())])
}
