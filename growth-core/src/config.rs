//! Configuration values.
//!
//! Everything here is plain data: it can be loaded from TOML, copied and
//! handed to a constructor. Spatially varying behaviour comes from
//! combining a [`FieldRange`] with a height map at construction time.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    field::{HeightMap, ScalarField},
    geometry::Area,
};

/// A `{min, max}` pair mapped over a height map: `min` where the map is 0,
/// `max` where it is 1. `min` may exceed `max` to invert the relation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldRange {
    pub min: f32,
    pub max: f32,
}

impl FieldRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub const fn constant(value: f32) -> Self {
        Self::new(value, value)
    }

    pub fn field(&self, height_map: &HeightMap) -> ScalarField {
        if self.min == self.max {
            ScalarField::Constant(self.min)
        } else {
            ScalarField::mapped(height_map, self.min, self.max)
        }
    }
}

/// Which tips a leaf pulls on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrowthMode {
    /// Only the closest eligible tip.
    #[default]
    Open,
    /// Every tip in the leaf's relative neighbourhood; tips that reached a
    /// leaf stay in the index without growing.
    Closed,
    /// Like [`GrowthMode::Closed`], but reached tips are dropped from the
    /// index instead of being kept.
    BrokenClosed,
}

/// How many children a segment may have.
///
/// In TOML: `max_children = { limited = 2 }` or `max_children = "unlimited"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChildLimit {
    Limited(usize),
    Unlimited,
}

impl ChildLimit {
    /// The limit as used by the growth graph, `None` for unlimited.
    pub fn max(self) -> Option<usize> {
        match self {
            Self::Limited(max) => Some(max),
            Self::Unlimited => None,
        }
    }
}

impl From<Option<usize>> for ChildLimit {
    fn from(max: Option<usize>) -> Self {
        max.map_or(Self::Unlimited, Self::Limited)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Steps the host runs before starting a new graph.
    pub max_steps: u32,
    pub mode: GrowthMode,
    pub max_children: ChildLimit,
    /// Closed modes: reached tips at or above this depth keep growing.
    pub min_depth: u32,

    pub min_distance: FieldRange,
    pub max_distance: FieldRange,
    pub dynamics: FieldRange,
    pub step_size: FieldRange,
    pub random_deviation: FieldRange,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            max_steps: 280,
            mode: GrowthMode::Open,
            max_children: ChildLimit::Limited(2),
            min_depth: 1,
            min_distance: FieldRange::new(5.0, 50.0),
            max_distance: FieldRange::new(50.0, 140.0),
            dynamics: FieldRange::new(1.0, 0.4),
            step_size: FieldRange::new(1.5, 8.0),
            random_deviation: FieldRange::new(0.2, 0.5),
        }
    }
}

/// Distance-dependent pull of the growth direction towards a moving point.
///
/// The pull strength is `map_linear(clamp(d, min_range, max_range),
/// min_range, max_range, min, max) ^ pow` where `d` is the distance from
/// the growing tip to `point`. Without a `point` there is no pull.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gravity {
    pub pow: f32,
    pub min: f32,
    pub max: f32,
    pub min_range: f32,
    pub max_range: f32,
    #[serde(skip)]
    pub point: Option<Vec2>,
}

impl Default for Gravity {
    fn default() -> Self {
        Self {
            pow: 1.0,
            min: 0.7,
            max: 1.1,
            min_range: 1.0,
            max_range: 500.0,
            point: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttractorConfig {
    pub speed: f32,
    pub max_force: f32,
    pub max_speed: f32,
    /// Within this distance of its target the steering force falls off.
    pub falloff_from: f32,
    pub falloff: f32,
    pub friction: f32,

    // Wandering, used by the host while nothing steers the attractor.
    pub noise_frequency: f32,
    pub noise_speed: f32,
    pub noise_amount: f32,
    pub gravity_amount: f32,
    pub gravity_falloff: f32,
}

impl Default for AttractorConfig {
    fn default() -> Self {
        Self {
            speed: 500.0,
            max_force: 2000.0,
            max_speed: 500.0,
            falloff_from: 100.0,
            falloff: 2.0,
            friction: 1.0,
            noise_frequency: 0.01,
            noise_speed: 0.0001,
            noise_amount: 400.0,
            gravity_amount: 0.04,
            gravity_falloff: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub area: Area,
    pub tries: u32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub initial_spawner: Option<Vec2>,
}

impl SamplerConfig {
    pub fn new(area: Area, tries: u32) -> Self {
        Self {
            area,
            tries,
            min_radius: 0.0,
            max_radius: 1.0,
            initial_spawner: None,
        }
    }
}

/// Leaf sampling parameters of a preset; the area is decided by the host.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeavesConfig {
    pub count: usize,
    pub tries: u32,
    pub min_radius: f32,
    pub max_radius: f32,
    /// Fraction of the smaller canvas side used as the radius of the
    /// circular leaf region; 0 uses the whole canvas.
    pub circle_radius: f32,
}

impl Default for LeavesConfig {
    fn default() -> Self {
        Self {
            count: 10_000,
            tries: 8,
            min_radius: 5.0,
            max_radius: 160.0,
            circle_radius: 0.5,
        }
    }
}

impl LeavesConfig {
    pub fn sampler(&self, area: Area, initial_spawner: Option<Vec2>) -> SamplerConfig {
        SamplerConfig {
            area,
            tries: self.tries,
            min_radius: self.min_radius,
            max_radius: self.max_radius,
            initial_spawner,
        }
    }
}

/// Coherent-noise height map shape: `noise(p * frequency) ^ pow`, drifting
/// along y at `speed` units per second.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightMapConfig {
    pub frequency: f32,
    pub pow: f32,
    pub speed: f32,
}

impl Default for HeightMapConfig {
    fn default() -> Self {
        Self {
            frequency: 0.01,
            pow: 2.3,
            speed: 3.0,
        }
    }
}

/// Stroke widths used by the host, in world units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub min_thickness: f32,
    pub max_thickness: f32,
    /// Fraction of its parent's thickness a new segment loses.
    pub thickness_delta: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            min_thickness: 1.0,
            max_thickness: 130.0,
            thickness_delta: 0.2,
        }
    }
}

/// A complete preset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub height_map: HeightMapConfig,
    pub leaves: LeavesConfig,
    pub growth: GrowthConfig,
    pub gravity: Gravity,
    pub attractor: AttractorConfig,
    pub renderer: RendererConfig,
}

impl Settings {
    /// Parses and validates a TOML preset. Missing keys take their default.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, what: &str) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(Error::InvalidConfig(what.to_owned()))
            }
        }

        let l = &self.leaves;
        check(l.tries > 0, "leaves.tries must be positive")?;
        check(l.min_radius >= 0.0, "leaves.min_radius must not be negative")?;
        check(l.max_radius > 0.0, "leaves.max_radius must be positive")?;
        check(
            l.min_radius <= l.max_radius,
            "leaves.min_radius must not exceed leaves.max_radius",
        )?;
        check(
            (0.0..=0.5).contains(&l.circle_radius),
            "leaves.circle_radius must be within [0, 0.5]",
        )?;

        let g = &self.growth;
        check(g.max_children != ChildLimit::Limited(0), "growth.max_children must be positive")?;
        for (range, name) in [
            (g.min_distance, "growth.min_distance"),
            (g.max_distance, "growth.max_distance"),
            (g.step_size, "growth.step_size"),
            (g.random_deviation, "growth.random_deviation"),
        ] {
            check(range.min >= 0.0 && range.max >= 0.0, &format!("{name} must not be negative"))?;
        }

        let gr = &self.gravity;
        check(
            gr.min_range <= gr.max_range,
            "gravity.min_range must not exceed gravity.max_range",
        )?;

        let a = &self.attractor;
        check(a.max_force >= 0.0, "attractor.max_force must not be negative")?;
        check(a.max_speed >= 0.0, "attractor.max_speed must not be negative")?;

        let r = &self.renderer;
        check(
            0.0 <= r.min_thickness && r.min_thickness <= r.max_thickness,
            "renderer.min_thickness must be within [0, renderer.max_thickness]",
        )?;
        check(
            (0.0..=1.0).contains(&r.thickness_delta),
            "renderer.thickness_delta must be within [0, 1]",
        )?;

        check(self.height_map.frequency > 0.0, "height_map.frequency must be positive")?;
        Ok(())
    }
}
