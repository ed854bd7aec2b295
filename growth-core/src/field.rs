//! Per-point scalar fields.
//!
//! Every tunable of the sampler and the growth graph (distances, step size,
//! random deviation, ...) may either be a constant or vary over space. A
//! varying field is usually derived from a height map that itself changes
//! over time, so fields are always evaluated on demand and never cached.

use std::fmt;
use std::rc::Rc;

use glam::Vec2;

use crate::geometry::map_linear;

/// Shared, caller-supplied function `Vec2 -> f32`.
pub type HeightMap = Rc<dyn Fn(Vec2) -> f32>;

/// A scalar value evaluated at a point.
#[derive(Clone)]
pub enum ScalarField {
    Constant(f32),
    Varying(HeightMap),
}

impl ScalarField {
    pub fn from_fn(f: impl Fn(Vec2) -> f32 + 'static) -> Self {
        Self::Varying(Rc::new(f))
    }

    /// `map_linear(height(p), 0, 1, min, max)`: the value sweeps from `min`
    /// where the height map is 0 to `max` where it is 1.
    pub fn mapped(height_map: &HeightMap, min: f32, max: f32) -> Self {
        let height_map = Rc::clone(height_map);
        Self::from_fn(move |p| map_linear(height_map(p), 0.0, 1.0, min, max))
    }

    #[inline]
    pub fn eval(&self, p: Vec2) -> f32 {
        match self {
            Self::Constant(v) => *v,
            Self::Varying(f) => f(p),
        }
    }
}

impl Default for ScalarField {
    fn default() -> Self {
        Self::Constant(1.0)
    }
}

impl From<f32> for ScalarField {
    fn from(value: f32) -> Self {
        Self::Constant(value)
    }
}

impl fmt::Debug for ScalarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            Self::Varying(_) => f.write_str("Varying(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn constant_ignores_position() {
        let field = ScalarField::from(3.5);
        assert_eq!(field.eval(Vec2::ZERO), 3.5);
        assert_eq!(field.eval(Vec2::new(-100.0, 42.0)), 3.5);
    }

    #[test]
    fn mapped_follows_height_map() {
        let height: HeightMap = Rc::new(|p: Vec2| p.x);
        let field = ScalarField::mapped(&height, 10.0, 30.0);
        assert_eq!(field.eval(Vec2::new(0.0, 5.0)), 10.0);
        assert_eq!(field.eval(Vec2::new(0.5, 5.0)), 20.0);
        assert_eq!(field.eval(Vec2::new(1.0, 5.0)), 30.0);
    }

    #[test]
    fn varying_field_is_reevaluated_every_time() {
        let time = Rc::new(Cell::new(0.0_f32));
        let t = Rc::clone(&time);
        let field = ScalarField::from_fn(move |_| t.get());

        assert_eq!(field.eval(Vec2::ZERO), 0.0);
        time.set(0.75);
        assert_eq!(field.eval(Vec2::ZERO), 0.75);
    }
}
