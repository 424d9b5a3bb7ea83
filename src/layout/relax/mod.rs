mod forces;

use eframe::egui::{Vec2, vec2};
use log::trace;
use rand::SeedableRng;
use rand::rngs::StdRng;

pub use forces::{Center, Charge, Collide, Force, Links, Spring};

const JIGGLE_SEED: u64 = 0x5eed_1e55;
const DEFAULT_VELOCITY_DECAY: f32 = 0.4;

/// Strength of a constraint at step `i` of `n`: `(i / n)^exponent * ceiling`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RampSchedule {
    pub exponent: f32,
    pub ceiling: f32,
}

impl RampSchedule {
    pub const fn new(exponent: f32, ceiling: f32) -> Self {
        Self { exponent, ceiling }
    }

    pub const fn constant(strength: f32) -> Self {
        Self::new(0.0, strength)
    }

    pub fn strength(self, step: usize, steps: usize) -> f32 {
        if steps == 0 {
            return self.ceiling;
        }
        (step as f32 / steps as f32).powf(self.exponent) * self.ceiling
    }
}

pub fn alpha_decay_for(steps: usize) -> f32 {
    1.0 - 0.001_f32.powf(1.0 / steps.max(1) as f32)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub pin: Option<Vec2>,
}

impl Body {
    pub fn new(position: Vec2, radius: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            radius,
            pin: None,
        }
    }

    pub fn pinned(position: Vec2, radius: f32) -> Self {
        Self {
            pin: Some(position),
            ..Self::new(position, radius)
        }
    }
}

/// Phyllotaxis spiral used to seed bodies that have no meaningful start position.
pub fn phyllotaxis(index: usize) -> Vec2 {
    let radius = 10.0 * (0.5 + index as f32).sqrt();
    let angle = index as f32 * std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    vec2(radius * angle.cos(), radius * angle.sin())
}

/// Bounded relaxation over a set of bodies. Each step cools alpha, applies the
/// forces to velocities, then integrates positions with velocity damping.
pub struct Simulation {
    pub bodies: Vec<Body>,
    forces: Vec<Force>,
    alpha: f32,
    alpha_decay: f32,
    velocity_decay: f32,
    rng: StdRng,
}

impl Simulation {
    pub fn new(bodies: Vec<Body>) -> Self {
        let mut simulation = Self {
            bodies,
            forces: Vec::new(),
            alpha: 1.0,
            alpha_decay: alpha_decay_for(300),
            velocity_decay: DEFAULT_VELOCITY_DECAY,
            rng: StdRng::seed_from_u64(JIGGLE_SEED),
        };
        simulation.snap_pins();
        simulation
    }

    pub fn with_alpha_decay(mut self, alpha_decay: f32) -> Self {
        self.alpha_decay = alpha_decay;
        self
    }

    pub fn with_force(mut self, force: impl Into<Force>) -> Self {
        self.forces.push(force.into());
        self
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    fn snap_pins(&mut self) {
        for body in &mut self.bodies {
            if let Some(pin) = body.pin {
                body.position = pin;
                body.velocity = Vec2::ZERO;
            }
        }
    }

    pub fn tick(&mut self, step: usize, steps: usize) {
        self.alpha += (0.0 - self.alpha) * self.alpha_decay;

        for force in &self.forces {
            force.apply(&mut self.bodies, self.alpha, step, steps, &mut self.rng);
        }

        let keep = 1.0 - self.velocity_decay;
        for body in &mut self.bodies {
            match body.pin {
                Some(pin) => {
                    body.position = pin;
                    body.velocity = Vec2::ZERO;
                }
                None => {
                    body.velocity *= keep;
                    body.position += body.velocity;
                }
            }
        }
    }

    /// Runs `steps` ticks, calling `constraint` after every tick.
    pub fn run(&mut self, steps: usize, mut constraint: impl FnMut(&mut [Body])) {
        for step in 0..steps {
            self.tick(step, steps);
            constraint(&mut self.bodies);
        }
        trace!(
            "relaxed {} bodies over {steps} steps, final alpha {:.4}",
            self.bodies.len(),
            self.alpha
        );
    }

    pub fn into_bodies(self) -> Vec<Body> {
        self.bodies
    }
}

/// Largest gap by which two bodies' circles overlap.
pub fn max_overlap(bodies: &[Body]) -> f32 {
    let mut worst = 0.0_f32;
    for (index, a) in bodies.iter().enumerate() {
        for b in &bodies[index + 1..] {
            let overlap = a.radius + b.radius - (a.position - b.position).length();
            worst = worst.max(overlap);
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_grows_from_zero_to_ceiling() {
        let ramp = RampSchedule::new(2.0, 0.8);
        assert_eq!(ramp.strength(0, 200), 0.0);
        assert!((ramp.strength(100, 200) - 0.2).abs() < 1e-6);
        assert!((ramp.strength(200, 200) - 0.8).abs() < 1e-6);
        assert_eq!(RampSchedule::constant(1.0).strength(0, 200), 1.0);
        assert_eq!(RampSchedule::constant(1.0).strength(7, 0), 1.0);
    }

    #[test]
    fn alpha_cools_to_a_thousandth_over_the_pass() {
        let mut simulation =
            Simulation::new(vec![Body::new(Vec2::ZERO, 1.0)]).with_alpha_decay(alpha_decay_for(200));
        simulation.run(200, |_| {});
        assert!((simulation.alpha() - 0.001).abs() < 1e-4);
    }

    #[test]
    fn superimposed_bodies_settle_without_overlap() {
        let bodies = (0..30)
            .map(|index| Body::new(phyllotaxis(index) * 0.01, 4.0 + (index % 3) as f32))
            .collect::<Vec<_>>();
        let mut simulation = Simulation::new(bodies)
            .with_force(Collide::new(RampSchedule::new(2.0, 0.8)))
            .with_force(Center {
                target: Vec2::ZERO,
                strength: 0.1,
            });
        simulation.run(200, |_| {});

        assert!(max_overlap(&simulation.bodies) < 1.0);
        assert!(simulation.bodies.iter().all(|body| body.position.is_finite()));
    }

    #[test]
    fn pinned_bodies_never_move() {
        let bodies = vec![
            Body::pinned(vec2(5.0, 5.0), 10.0),
            Body::new(vec2(6.0, 5.0), 10.0),
        ];
        let mut simulation = Simulation::new(bodies)
            .with_force(Collide::new(RampSchedule::constant(0.7)))
            .with_force(Charge::default());
        simulation.run(100, |_| {});

        assert_eq!(simulation.bodies[0].position, vec2(5.0, 5.0));
        assert_eq!(simulation.bodies[0].velocity, Vec2::ZERO);
        assert!((simulation.bodies[1].position - vec2(5.0, 5.0)).length() > 19.0);
    }

    #[test]
    fn constraint_runs_after_every_tick() {
        let bodies = (0..10)
            .map(|index| Body::new(phyllotaxis(index), 3.0))
            .collect::<Vec<_>>();
        let mut simulation = Simulation::new(bodies).with_force(Charge::default());
        let mut calls = 0;
        simulation.run(50, |bodies| {
            calls += 1;
            for body in bodies {
                body.position = body.position.clamp(Vec2::splat(-20.0), Vec2::splat(20.0));
            }
        });

        assert_eq!(calls, 50);
        assert!(
            simulation
                .bodies
                .iter()
                .all(|body| body.position.x.abs() <= 20.0 && body.position.y.abs() <= 20.0)
        );
    }

    #[test]
    fn identical_inputs_give_identical_outputs() {
        let run = || {
            let bodies = (0..25)
                .map(|index| Body::new(Vec2::ZERO, 2.0 + index as f32 * 0.1))
                .collect::<Vec<_>>();
            let mut simulation =
                Simulation::new(bodies).with_force(Collide::new(RampSchedule::new(2.0, 0.7)));
            simulation.run(60, |_| {});
            simulation.into_bodies()
        };
        assert_eq!(run(), run());
    }
}
