//! Time-varying height map driving the growth fields.

use std::{cell::Cell, rc::Rc};

use glam::Vec2;
use growth_core::{config::HeightMapConfig, field::HeightMap};
use noise::{NoiseFn, Perlin};

/// `perlin(x * f, (y + speed * t) * f) ^ pow`, remapped into `[0, 1]`.
///
/// Clones share the same clock, so fields handed to the core keep following
/// [`DriftingHeightMap::set_time`].
#[derive(Clone, Debug)]
pub struct DriftingHeightMap {
    perlin: Perlin,
    config: HeightMapConfig,
    time: Rc<Cell<f64>>,
}

impl DriftingHeightMap {
    pub fn new(seed: u32, config: HeightMapConfig) -> Self {
        Self {
            perlin: Perlin::new(seed),
            config,
            time: Rc::new(Cell::new(0.0)),
        }
    }

    /// Sets the clock, in seconds.
    pub fn set_time(&self, seconds: f64) {
        self.time.set(seconds);
    }

    pub fn time(&self) -> f64 {
        self.time.get()
    }

    /// Height at `p`, in `[0, 1]`.
    pub fn sample(&self, p: Vec2) -> f32 {
        let f = self.config.frequency as f64;
        let drift = self.config.speed as f64 * self.time.get();
        let n = unit_noise(&self.perlin, p.x as f64 * f, (p.y as f64 + drift) * f);
        n.powf(self.config.pow)
    }

    /// Shareable closure for [`growth_core::field::ScalarField`]s.
    pub fn field(&self) -> HeightMap {
        let map = self.clone();
        Rc::new(move |p| map.sample(p))
    }
}

/// Perlin noise squeezed from `[-1, 1]` into `[0, 1]`.
pub fn unit_noise(perlin: &Perlin, x: f64, y: f64) -> f32 {
    ((perlin.get([x, y]) + 1.0) * 0.5).clamp(0.0, 1.0) as f32
}
