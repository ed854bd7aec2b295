//! Poisson-disk sampling with a spatially varying radius.
//!
//! Every accepted point gets a radius from the height map,
//! `map_linear(height(p), 0, 1, min_radius, max_radius)`, and no two
//! accepted points may be closer than the larger of their radii (or the
//! smaller one, in min-bias mode). New candidates are thrown around a
//! randomly chosen point of the spawn frontier; a spawner that fails
//! `tries` times in a row is retired.

use std::f32::consts::TAU;

use glam::Vec2;
use log::debug;
use rand::Rng;

use crate::{
    config::SamplerConfig,
    field::ScalarField,
    geometry::{Area, Circle, map_linear, random},
    quadtree::Quadtree,
};

/// One accepted sample together with the spawner it was thrown from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleData {
    pub spawner: Vec2,
    pub sample: Vec2,
    pub radius: f32,
}

/// Result of one [`PoissonDiskSampler::generate`] call.
#[derive(Clone, Debug, Default)]
pub struct Generation {
    pub samples: Vec<Vec2>,
    pub sample_data: Vec<SampleData>,
}

/// Diagnostic left behind when a spawner is retired.
///
/// `other` is the neighbour that rejected the last candidate, or `None`
/// if that candidate fell outside the area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collision {
    pub spawner: Vec2,
    pub other: Option<Vec2>,
}

#[derive(Debug)]
pub struct PoissonDiskSampler {
    area: Area,
    tries: u32,
    min_radius: f32,
    max_radius: f32,
    height_map: ScalarField,

    /// Indices into `points`.
    quadtree: Quadtree<usize>,
    points: Vec<Vec2>,
    collisions: Vec<Collision>,
    spawn_points: Vec<Vec2>,
    max_generated_radius: f32,
}

impl PoissonDiskSampler {
    /// Creates a sampler over `config.area`.
    ///
    /// The frontier starts with `config.initial_spawner`, or with a random
    /// point of the area when none is given.
    pub fn new(config: &SamplerConfig, height_map: ScalarField, rng: &mut impl Rng) -> Self {
        let spawner = config
            .initial_spawner
            .unwrap_or_else(|| config.area.random_point(rng));

        Self {
            area: config.area,
            tries: config.tries,
            min_radius: config.min_radius,
            max_radius: config.max_radius,
            height_map,
            quadtree: Quadtree::new(config.area, 4, 6),
            points: Vec::new(),
            collisions: Vec::new(),
            spawn_points: vec![spawner],
            max_generated_radius: 0.0,
        }
    }

    #[inline]
    fn radius(&self, p: Vec2) -> f32 {
        map_linear(self.height_map.eval(p), 0.0, 1.0, self.min_radius, self.max_radius)
    }

    /// Generates up to `number_of_samples` new points.
    ///
    /// Stops early once the frontier is empty. Calling it again continues
    /// from the current frontier.
    ///
    /// ### Parameters
    /// - `number_of_samples` - Quota for this call.
    /// - `min_bias` - Allow tighter packing: candidates may be thrown as
    ///   close as `min_radius` and neighbours are compared against the
    ///   smaller of the two radii.
    /// - `rng` - Source of every random draw.
    pub fn generate(&mut self, number_of_samples: usize, min_bias: bool, rng: &mut impl Rng) -> Generation {
        let mut generation = Generation::default();
        let mut remaining = number_of_samples;

        while !self.is_satiated() && remaining > 0 {
            let spawn_index = rng.random_range(0..self.spawn_points.len());
            let spawner = self.spawn_points[spawn_index];

            let spawn_radius = self.radius(spawner);
            let min_distance = if min_bias { self.min_radius } else { spawn_radius };
            let distance = random(rng, min_distance, 2.0 * spawn_radius);

            let mut accepted = false;
            let mut latest_collision = None;
            for _ in 0..self.tries {
                let angle = random(rng, 0.0, TAU);
                let candidate = spawner + Vec2::new(angle.cos(), angle.sin()) * distance;
                let candidate_radius = self.radius(candidate);

                match self.check(candidate, candidate_radius, min_bias) {
                    Ok(()) => {
                        let index = self.points.len();
                        self.points.push(candidate);
                        self.spawn_points.push(candidate);
                        self.quadtree.insert(candidate, index);

                        generation.samples.push(candidate);
                        generation.sample_data.push(SampleData {
                            spawner,
                            sample: candidate,
                            radius: candidate_radius,
                        });

                        self.max_generated_radius = self.max_generated_radius.max(candidate_radius);
                        accepted = true;
                        remaining -= 1;
                        break;
                    }
                    Err(collision) => latest_collision = collision,
                }
            }

            if !accepted {
                self.spawn_points.swap_remove(spawn_index);
                self.collisions.push(Collision {
                    spawner,
                    other: latest_collision,
                });
            }
        }

        if self.is_satiated() {
            debug!(
                "poisson sampler satiated with {} points ({} spawners retired)",
                self.points.len(),
                self.collisions.len()
            );
        }

        generation
    }

    /// Returns `true` if `point` may be accepted with `radius`.
    pub fn is_valid(&self, point: Vec2, radius: f32, min_bias: bool) -> bool {
        self.check(point, radius, min_bias).is_ok()
    }

    /// Like [`Self::is_valid`], reporting the blocking neighbour on failure
    /// (`Err(None)` when the point is outside the area).
    fn check(&self, point: Vec2, radius: f32, min_bias: bool) -> Result<(), Option<Vec2>> {
        if !self.area.contains(point) {
            return Err(None);
        }

        // Large enough to see every neighbour that could conflict, even when
        // the candidate itself has the largest radius so far.
        let reach = self.max_generated_radius.max(radius);
        let mut collision = None;
        self.quadtree
            .circle_query_with(&Circle::around(point, reach), &mut |entry| {
                if collision.is_some() {
                    return;
                }
                let other_radius = self.radius(entry.point);
                let compare = if min_bias {
                    radius.min(other_radius)
                } else {
                    radius.max(other_radius)
                };
                if entry.point.distance_squared(point) < compare * compare {
                    collision = Some(entry.point);
                }
            });

        match collision {
            Some(other) => Err(Some(other)),
            None => Ok(()),
        }
    }

    /// `true` once the spawn frontier is empty.
    pub fn is_satiated(&self) -> bool {
        self.spawn_points.is_empty()
    }

    /// Every point accepted so far, across all `generate` calls.
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn spawn_points(&self) -> &[Vec2] {
        &self.spawn_points
    }

    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    pub fn area(&self) -> Area {
        self.area
    }

    pub fn max_generated_radius(&self) -> f32 {
        self.max_generated_radius
    }

    pub fn quadtree(&self) -> &Quadtree<usize> {
        &self.quadtree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn config(radius: f32) -> SamplerConfig {
        SamplerConfig {
            area: Area::new(0.0, 0.0, 200.0, 200.0),
            tries: 16,
            min_radius: radius / 2.0,
            max_radius: radius,
            initial_spawner: Some(Vec2::new(100.0, 100.0)),
        }
    }

    fn min_pairwise_distance(points: &[Vec2]) -> f32 {
        let mut min = f32::MAX;
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                min = min.min(a.distance(*b));
            }
        }
        min
    }

    #[test]
    fn constant_height_map_gives_disk_packing() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut sampler = PoissonDiskSampler::new(&config(10.0), ScalarField::Constant(1.0), &mut rng);

        let generation = sampler.generate(10_000, false, &mut rng);

        assert!(generation.samples.len() > 50);
        assert!(sampler.is_satiated());
        assert!(min_pairwise_distance(&generation.samples) >= 10.0 - 1e-3);
        assert!(generation.samples.iter().all(|p| sampler.area().contains(*p)));
        assert!(generation.sample_data.iter().all(|d| d.radius == 10.0));
        assert_eq!(sampler.max_generated_radius(), 10.0);
    }

    #[test]
    fn min_bias_compares_against_smaller_radius() {
        let mut rng = StdRng::seed_from_u64(3);
        let height = ScalarField::from_fn(|p: Vec2| if p.x < 100.0 { 0.0 } else { 1.0 });
        let mut sampler = PoissonDiskSampler::new(&config(12.0), height, &mut rng);

        let generation = sampler.generate(5_000, true, &mut rng);
        let data = &generation.sample_data;
        for (i, a) in data.iter().enumerate() {
            for b in &data[i + 1..] {
                let limit = a.radius.min(b.radius);
                assert!(a.sample.distance(b.sample) >= limit - 1e-3);
            }
        }
    }

    #[test]
    fn quota_limits_a_single_call_and_later_calls_continue() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut sampler = PoissonDiskSampler::new(&config(10.0), ScalarField::default(), &mut rng);

        let first = sampler.generate(5, false, &mut rng);
        assert_eq!(first.samples.len(), 5);
        assert_eq!(sampler.points().len(), 5);

        let second = sampler.generate(5, false, &mut rng);
        assert_eq!(second.samples.len(), 5);
        assert_eq!(sampler.points().len(), 10);
        assert!(min_pairwise_distance(sampler.points()) >= 10.0 - 1e-3);
    }

    #[test]
    fn samples_are_thrown_within_twice_the_spawn_radius() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut sampler = PoissonDiskSampler::new(&config(8.0), ScalarField::default(), &mut rng);

        let generation = sampler.generate(200, false, &mut rng);
        for d in &generation.sample_data {
            let dist = d.spawner.distance(d.sample);
            assert!(dist >= 8.0 - 1e-3 && dist <= 16.0 + 1e-3);
        }
    }

    #[test]
    fn retired_spawners_leave_a_collision_record() {
        let mut rng = StdRng::seed_from_u64(4);
        // An area too small for a second point.
        let cfg = SamplerConfig {
            area: Area::new(0.0, 0.0, 5.0, 5.0),
            tries: 4,
            min_radius: 0.0,
            max_radius: 10.0,
            initial_spawner: Some(Vec2::new(2.5, 2.5)),
        };
        let mut sampler = PoissonDiskSampler::new(&cfg, ScalarField::default(), &mut rng);

        let generation = sampler.generate(10, false, &mut rng);
        assert!(generation.samples.is_empty());
        assert!(sampler.is_satiated());
        assert_eq!(sampler.collisions().len(), 1);
        assert_eq!(sampler.collisions()[0].spawner, Vec2::new(2.5, 2.5));
        assert_eq!(sampler.collisions()[0].other, None);

        // A satiated sampler produces nothing.
        assert!(sampler.generate(10, false, &mut rng).samples.is_empty());
    }

    #[test]
    fn is_valid_rejects_close_neighbours() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut sampler = PoissonDiskSampler::new(&config(10.0), ScalarField::default(), &mut rng);
        sampler.generate(1, false, &mut rng);
        let p = sampler.points()[0];

        assert!(!sampler.is_valid(p + Vec2::new(5.0, 0.0), 10.0, false));
        assert!(sampler.is_valid(p + Vec2::new(0.0, 10.5), 10.0, false));
        assert!(!sampler.is_valid(Vec2::new(-1.0, 0.0), 10.0, false));
    }
}
