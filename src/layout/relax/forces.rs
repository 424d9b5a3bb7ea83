use anyhow::{Result, bail};
use eframe::egui::{Vec2, vec2};
use rand::Rng;
use rand::rngs::StdRng;

use super::super::quadtree::QuadNode;
use super::{Body, RampSchedule};

const CHARGE_THETA: f32 = 0.9;
const CHARGE_DISTANCE_MIN_SQ: f32 = 1.0;

fn jiggle(rng: &mut StdRng) -> f32 {
    (rng.random::<f32>() - 0.5) * 1e-6
}

fn nonzero(delta: Vec2, rng: &mut StdRng) -> Vec2 {
    vec2(
        if delta.x == 0.0 { jiggle(rng) } else { delta.x },
        if delta.y == 0.0 { jiggle(rng) } else { delta.y },
    )
}

/// Non-overlap between circles, resolved on positions predicted from the
/// current velocity. Strength follows a ramp over the pass.
#[derive(Clone, Debug)]
pub struct Collide {
    ramp: RampSchedule,
    radii: Option<Vec<f32>>,
}

impl Collide {
    pub fn new(ramp: RampSchedule) -> Self {
        Self { ramp, radii: None }
    }

    /// Per-body collision radii, replacing the body radius.
    pub fn with_radii(mut self, radii: Vec<f32>) -> Self {
        self.radii = Some(radii);
        self
    }

    fn radius(&self, bodies: &[Body], index: usize) -> f32 {
        self.radii
            .as_ref()
            .and_then(|radii| radii.get(index).copied())
            .unwrap_or(bodies[index].radius)
    }

    fn apply(&self, bodies: &mut [Body], step: usize, steps: usize, rng: &mut StdRng) {
        let strength = self.ramp.strength(step, steps);
        if strength <= 0.0 || bodies.len() < 2 {
            return;
        }

        let predicted = bodies
            .iter()
            .map(|body| body.position + body.velocity)
            .collect::<Vec<_>>();
        let radii = (0..bodies.len())
            .map(|index| self.radius(bodies, index))
            .collect::<Vec<_>>();
        let Some(tree) = QuadNode::build(&predicted, &radii) else {
            return;
        };

        let mut pass = CollisionPass {
            predicted: &predicted,
            radii: &radii,
            strength,
            impulses: vec![Vec2::ZERO; bodies.len()],
            rng,
        };
        pass.accumulate_pairs(&tree, &tree, true);

        for (body, impulse) in bodies.iter_mut().zip(pass.impulses) {
            body.velocity += impulse;
        }
    }
}

struct CollisionPass<'a> {
    predicted: &'a [Vec2],
    radii: &'a [f32],
    strength: f32,
    impulses: Vec<Vec2>,
    rng: &'a mut StdRng,
}

impl CollisionPass<'_> {
    fn resolve(&mut self, from: usize, to: usize) {
        let reach = self.radii[from] + self.radii[to];
        let delta = self.predicted[from] - self.predicted[to];
        let distance_sq = delta.length_sq();
        if distance_sq >= reach * reach {
            return;
        }

        let delta = nonzero(delta, self.rng);
        let distance = delta.length();
        let push = delta * ((reach - distance) / distance * self.strength);
        let from_sq = self.radii[from] * self.radii[from];
        let to_sq = self.radii[to] * self.radii[to];
        let share = if from_sq + to_sq > 0.0 {
            to_sq / (from_sq + to_sq)
        } else {
            0.5
        };

        self.impulses[from] += push * share;
        self.impulses[to] -= push * (1.0 - share);
    }

    fn accumulate_pairs(&mut self, node_a: &QuadNode, node_b: &QuadNode, same_node: bool) {
        let reach = node_a.max_radius + node_b.max_radius;
        if node_a.bounds.distance_sq_to(node_b.bounds) > reach * reach {
            return;
        }

        if node_a.is_leaf() && node_b.is_leaf() {
            if same_node {
                for i in 0..node_a.indices.len() {
                    for j in (i + 1)..node_a.indices.len() {
                        self.resolve(node_a.indices[i], node_a.indices[j]);
                    }
                }
            } else {
                for &from in &node_a.indices {
                    for &to in &node_b.indices {
                        self.resolve(from, to);
                    }
                }
            }
            return;
        }

        if same_node {
            for first in 0..4 {
                let Some(child_a) = node_a.children[first].as_ref() else {
                    continue;
                };

                self.accumulate_pairs(child_a, child_a, true);

                for second in (first + 1)..4 {
                    let Some(child_b) = node_a.children[second].as_ref() else {
                        continue;
                    };
                    self.accumulate_pairs(child_a, child_b, false);
                }
            }
            return;
        }

        let split_a = if node_a.is_leaf() {
            false
        } else if node_b.is_leaf() {
            true
        } else {
            node_a.bounds.half_extent >= node_b.bounds.half_extent
        };

        if split_a {
            for child in node_a.children.iter().flatten() {
                self.accumulate_pairs(child, node_b, false);
            }
        } else {
            for child in node_b.children.iter().flatten() {
                self.accumulate_pairs(node_a, child, false);
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spring {
    pub source: usize,
    pub target: usize,
    pub distance: f32,
}

/// Springs between bodies. Strength defaults to `1 / min(count)` of the
/// endpoints and the correction is split by relative endpoint count.
#[derive(Clone, Debug)]
pub struct Links {
    springs: Vec<Spring>,
    strengths: Vec<f32>,
    bias: Vec<f32>,
}

impl Links {
    pub fn new(springs: Vec<Spring>, body_count: usize) -> Result<Self> {
        let mut count = vec![0_u32; body_count];
        for spring in &springs {
            if spring.source >= body_count || spring.target >= body_count {
                bail!(
                    "spring {} -> {} references a body outside 0..{body_count}",
                    spring.source,
                    spring.target
                );
            }
            if spring.source == spring.target {
                bail!("spring links body {} to itself", spring.source);
            }
            count[spring.source] += 1;
            count[spring.target] += 1;
        }

        let strengths = springs
            .iter()
            .map(|spring| 1.0 / count[spring.source].min(count[spring.target]) as f32)
            .collect();
        let bias = springs
            .iter()
            .map(|spring| {
                let source = count[spring.source] as f32;
                source / (source + count[spring.target] as f32)
            })
            .collect();

        Ok(Self {
            springs,
            strengths,
            bias,
        })
    }

    fn apply(&self, bodies: &mut [Body], alpha: f32, rng: &mut StdRng) {
        for ((spring, strength), bias) in self.springs.iter().zip(&self.strengths).zip(&self.bias) {
            let source = bodies[spring.source];
            let target = bodies[spring.target];
            let delta = nonzero(
                (target.position + target.velocity) - (source.position + source.velocity),
                rng,
            );
            let length = delta.length();
            let correction = delta * ((length - spring.distance) / length * alpha * strength);

            bodies[spring.target].velocity -= correction * *bias;
            bodies[spring.source].velocity += correction * (1.0 - bias);
        }
    }
}

/// Per-axis spring pulling every body toward `target`.
#[derive(Clone, Copy, Debug)]
pub struct Center {
    pub target: Vec2,
    pub strength: f32,
}

impl Center {
    fn apply(self, bodies: &mut [Body], alpha: f32) {
        for body in bodies {
            body.velocity += (self.target - body.position) * (self.strength * alpha);
        }
    }
}

/// Barnes–Hut many-body force. Negative strength repels.
#[derive(Clone, Copy, Debug)]
pub struct Charge {
    pub strength: f32,
}

impl Default for Charge {
    fn default() -> Self {
        Self { strength: -30.0 }
    }
}

impl Charge {
    fn apply(self, bodies: &mut [Body], alpha: f32, rng: &mut StdRng) {
        let positions = bodies.iter().map(|body| body.position).collect::<Vec<_>>();
        let Some(tree) = QuadNode::build(&positions, &[]) else {
            return;
        };

        for (index, body) in bodies.iter_mut().enumerate() {
            let mut velocity = Vec2::ZERO;
            self.accumulate(&tree, index, &positions, alpha, rng, &mut velocity);
            body.velocity += velocity;
        }
    }

    fn accumulate(
        self,
        node: &QuadNode,
        index: usize,
        positions: &[Vec2],
        alpha: f32,
        rng: &mut StdRng,
        velocity: &mut Vec2,
    ) {
        if node.mass <= 0.0 {
            return;
        }

        let point = positions[index];

        if node.is_leaf() {
            for &other_index in &node.indices {
                if other_index == index {
                    continue;
                }
                let delta = nonzero(positions[other_index] - point, rng);
                *velocity += delta * (self.strength * alpha / softened(delta.length_sq()));
            }
            return;
        }

        let delta = node.center_of_mass - point;
        let distance_sq = delta.length_sq();
        let side = node.bounds.half_extent * 2.0;
        let can_approximate = !node.bounds.contains(point)
            && side * side / (CHARGE_THETA * CHARGE_THETA) < distance_sq;

        if can_approximate {
            let delta = nonzero(delta, rng);
            *velocity += delta * (self.strength * node.mass * alpha / softened(delta.length_sq()));
            return;
        }

        for child in node.children.iter().flatten() {
            self.accumulate(child, index, positions, alpha, rng, velocity);
        }
    }
}

fn softened(distance_sq: f32) -> f32 {
    if distance_sq < CHARGE_DISTANCE_MIN_SQ {
        (CHARGE_DISTANCE_MIN_SQ * distance_sq).sqrt()
    } else {
        distance_sq
    }
}

#[derive(Clone, Debug)]
pub enum Force {
    Collide(Collide),
    Links(Links),
    Center(Center),
    Charge(Charge),
}

impl Force {
    pub(super) fn apply(
        &self,
        bodies: &mut [Body],
        alpha: f32,
        step: usize,
        steps: usize,
        rng: &mut StdRng,
    ) {
        match self {
            Self::Collide(collide) => collide.apply(bodies, step, steps, rng),
            Self::Links(links) => links.apply(bodies, alpha, rng),
            Self::Center(center) => center.apply(bodies, alpha),
            Self::Charge(charge) => charge.apply(bodies, alpha, rng),
        }
    }
}

impl From<Collide> for Force {
    fn from(value: Collide) -> Self {
        Self::Collide(value)
    }
}

impl From<Links> for Force {
    fn from(value: Links) -> Self {
        Self::Links(value)
    }
}

impl From<Center> for Force {
    fn from(value: Center) -> Self {
        Self::Center(value)
    }
}

impl From<Charge> for Force {
    fn from(value: Charge) -> Self {
        Self::Charge(value)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn body(x: f32, y: f32, radius: f32) -> Body {
        Body::new(vec2(x, y), radius)
    }

    #[test]
    fn collide_pushes_overlapping_pair_apart_weighted_by_area() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut bodies = vec![body(0.0, 0.0, 10.0), body(5.0, 0.0, 5.0)];
        Collide::new(RampSchedule::constant(1.0)).apply(&mut bodies, 0, 10, &mut rng);

        assert!(bodies[0].velocity.x < 0.0);
        assert!(bodies[1].velocity.x > 0.0);
        // the small body takes the larger share of the correction
        assert!(bodies[1].velocity.x.abs() > bodies[0].velocity.x.abs());
        let separation = bodies[1].velocity.x - bodies[0].velocity.x;
        assert!((separation - 10.0).abs() < 1e-3);
    }

    #[test]
    fn collide_with_zero_ramp_strength_does_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut bodies = vec![body(0.0, 0.0, 10.0), body(1.0, 0.0, 10.0)];
        Collide::new(RampSchedule::new(2.0, 0.8)).apply(&mut bodies, 0, 200, &mut rng);
        assert!(bodies.iter().all(|body| body.velocity == Vec2::ZERO));
    }

    #[test]
    fn coincident_bodies_are_separated_by_jiggle() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut bodies = vec![body(3.0, 3.0, 4.0), body(3.0, 3.0, 4.0)];
        Collide::new(RampSchedule::constant(1.0)).apply(&mut bodies, 0, 1, &mut rng);
        assert!(bodies[0].velocity != Vec2::ZERO);
        assert!(bodies.iter().all(|body| body.velocity.x.is_finite()));
    }

    #[test]
    fn links_validate_endpoints() {
        let spring = |source, target| Spring {
            source,
            target,
            distance: 10.0,
        };
        assert!(Links::new(vec![spring(0, 1)], 2).is_ok());
        assert!(Links::new(vec![spring(0, 2)], 2).is_err());
        assert!(Links::new(vec![spring(1, 1)], 2).is_err());
    }

    #[test]
    fn links_pull_toward_rest_length_split_by_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let springs = vec![
            Spring {
                source: 0,
                target: 1,
                distance: 10.0,
            },
            Spring {
                source: 0,
                target: 2,
                distance: 10.0,
            },
        ];
        let links = Links::new(springs, 3).unwrap();
        let mut bodies = vec![body(0.0, 0.0, 1.0), body(30.0, 0.0, 1.0), body(-30.0, 0.0, 1.0)];
        links.apply(&mut bodies, 1.0, &mut rng);

        // hub has count 2, leaves count 1: leaves move twice as much
        assert!(bodies[1].velocity.x < 0.0);
        assert!(bodies[2].velocity.x > 0.0);
        assert!((bodies[1].velocity.x + 40.0 / 3.0).abs() < 1e-3);
    }

    #[test]
    fn center_is_a_per_axis_spring() {
        let mut bodies = vec![body(10.0, -20.0, 1.0)];
        Center {
            target: Vec2::ZERO,
            strength: 0.1,
        }
        .apply(&mut bodies, 0.5);
        assert!((bodies[0].velocity.x + 0.5).abs() < 1e-6);
        assert!((bodies[0].velocity.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn charge_repels_and_approximates_far_clusters() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut bodies = (0..40)
            .map(|index| body((index % 8) as f32 * 4.0, (index / 8) as f32 * 4.0, 1.0))
            .collect::<Vec<_>>();
        bodies.push(body(500.0, 8.0, 1.0));
        Charge::default().apply(&mut bodies, 1.0, &mut rng);

        let far = bodies[40].velocity;
        assert!(far.x > 0.0);
        // 40 bodies at strength 30 and roughly 486 units away
        let expected = 40.0 * 30.0 / 486.0;
        assert!((far.x - expected).abs() < expected * 0.1);
    }
}
