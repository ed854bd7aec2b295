use crate::{config::AttractorConfig, geometry::map_linear};
use glam::Vec2;

/// A point mass that the host steers around and the growth graph uses as
/// its gravity target.
///
/// Forces accumulate into `acceleration` until the next
/// [`Attractor::update`], which integrates them with semi-implicit Euler.
#[derive(Clone, Debug)]
pub struct Attractor {
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub config: AttractorConfig,
}

impl Attractor {
    pub fn new(position: Vec2, config: AttractorConfig) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            config,
        }
    }

    pub fn add_force(&mut self, force: Vec2) {
        self.acceleration += force;
    }

    /// Steers towards `target` with `config.speed`, easing off as
    /// `(d / falloff_from) ^ falloff` once closer than `falloff_from`.
    pub fn move_towards(&mut self, target: Vec2) {
        let to_target = target - self.position;
        let length = to_target.length();

        let mut speed = self.config.speed;
        if length < self.config.falloff_from {
            speed *= map_linear(length, 0.0, self.config.falloff_from, 0.0, 1.0)
                .powf(self.config.falloff);
        }

        self.add_force(to_target.normalize_or_zero() * speed);
    }

    /// Advances the attractor by `delta` seconds and clears the forces.
    pub fn update(&mut self, delta: f32) {
        let cfg = &self.config;
        let acceleration = self.acceleration.clamp_length_max(cfg.max_force);

        self.velocity += acceleration * delta;
        self.velocity *= 1.0 - cfg.friction * delta;
        self.velocity = self.velocity.clamp_length_max(cfg.max_speed);

        self.position += self.velocity * delta;
        self.acceleration = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frictionless() -> AttractorConfig {
        AttractorConfig {
            friction: 0.0,
            max_force: 1e6,
            max_speed: 1e6,
            ..AttractorConfig::default()
        }
    }

    #[test]
    fn constant_force_matches_uniform_acceleration() {
        let mut attractor = Attractor::new(Vec2::new(1.0, -2.0), frictionless());
        let force = Vec2::new(3.0, 4.0);
        let dt = 0.01;
        let steps = 200;

        for _ in 0..steps {
            attractor.add_force(force);
            attractor.update(dt);
        }

        // Semi-implicit Euler: x_k = x_0 + a * dt^2 * k(k+1)/2.
        let k = steps as f32;
        let expected = Vec2::new(1.0, -2.0) + force * dt * dt * k * (k + 1.0) / 2.0;
        assert!(
            attractor.position.distance(expected) < 1e-3,
            "got {:?}, expected {:?}",
            attractor.position,
            expected
        );
        assert!(attractor.velocity.distance(force * dt * k) < 1e-3);

        // It converges to the continuous closed form as dt shrinks.
        let t = dt * k;
        let continuous = Vec2::new(1.0, -2.0) + force * 0.5 * t * t;
        assert!(attractor.position.distance(continuous) < force.length() * dt * t);
    }

    #[test]
    fn update_clears_acceleration() {
        let mut attractor = Attractor::new(Vec2::ZERO, frictionless());
        attractor.add_force(Vec2::X);
        attractor.add_force(Vec2::Y);
        assert_eq!(attractor.acceleration, Vec2::new(1.0, 1.0));

        attractor.update(0.1);
        assert_eq!(attractor.acceleration, Vec2::ZERO);
    }

    #[test]
    fn force_and_speed_are_clamped() {
        let config = AttractorConfig {
            friction: 0.0,
            max_force: 10.0,
            max_speed: 1.5,
            ..AttractorConfig::default()
        };
        let mut attractor = Attractor::new(Vec2::ZERO, config);

        attractor.add_force(Vec2::new(1000.0, 0.0));
        attractor.update(0.1);
        // 10 * 0.1 = 1.0, below the speed limit.
        assert!((attractor.velocity.x - 1.0).abs() < 1e-6);

        attractor.add_force(Vec2::new(1000.0, 0.0));
        attractor.update(0.1);
        assert!((attractor.velocity.length() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn friction_slows_down() {
        let config = AttractorConfig {
            friction: 2.0,
            ..AttractorConfig::default()
        };
        let mut attractor = Attractor::new(Vec2::ZERO, config);
        attractor.velocity = Vec2::new(10.0, 0.0);
        attractor.update(0.1);
        assert!((attractor.velocity.x - 8.0).abs() < 1e-5);
    }

    #[test]
    fn move_towards_falls_off_near_target() {
        let config = AttractorConfig {
            speed: 100.0,
            falloff_from: 10.0,
            falloff: 2.0,
            ..AttractorConfig::default()
        };

        let mut far = Attractor::new(Vec2::ZERO, config);
        far.move_towards(Vec2::new(50.0, 0.0));
        assert_eq!(far.acceleration, Vec2::new(100.0, 0.0));

        let mut near = Attractor::new(Vec2::ZERO, config);
        near.move_towards(Vec2::new(0.0, 5.0));
        assert!((near.acceleration - Vec2::new(0.0, 25.0)).length() < 1e-4);

        let mut on_target = Attractor::new(Vec2::ZERO, config);
        on_target.move_towards(Vec2::ZERO);
        assert_eq!(on_target.acceleration, Vec2::ZERO);
    }
}
