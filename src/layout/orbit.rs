use std::f32::consts::{FRAC_PI_2, TAU};

use anyhow::{Context, Result};
use eframe::egui::{Vec2, vec2};
use log::{Level, debug, info, log_enabled};
use rand::Rng;

use crate::data::orbit::{NodeKind, OrbitGraph};
use crate::data::scale::Scale;

use super::relax::{
    Body, Center, Charge, Collide, Links, RampSchedule, Simulation, Spring, max_overlap, phyllotaxis,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassConfig {
    pub steps: usize,
    pub ramp: RampSchedule,
}

#[derive(Clone, Debug)]
pub struct OrbitLayoutConfig {
    pub contributor_padding: f32,
    pub inner_radius_factor: f32,
    pub outer_ring_factor: f32,
    pub centering_strength: f32,
    pub satellite: PassConfig,
    pub shared: PassConfig,
    pub filler: PassConfig,
}

impl Default for OrbitLayoutConfig {
    fn default() -> Self {
        Self {
            contributor_padding: 20.0,
            inner_radius_factor: 0.7,
            outer_ring_factor: 1.3,
            centering_strength: 0.1,
            satellite: PassConfig {
                steps: 200,
                ramp: RampSchedule::new(2.0, 0.8),
            },
            shared: PassConfig {
                steps: 300,
                ramp: RampSchedule::new(2.0, 0.7),
            },
            filler: PassConfig {
                steps: 200,
                ramp: RampSchedule::new(2.0, 0.7),
            },
        }
    }
}

/// Radii of the two contributor rings around the central repository.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingGeometry {
    pub circumference: f32,
    pub radius: f32,
    pub outer_radius: f32,
    pub inner_limit: f32,
}

impl RingGeometry {
    fn new(circumference: f32, config: &OrbitLayoutConfig) -> Self {
        let radius = circumference / TAU;
        Self {
            circumference,
            radius,
            outer_radius: radius * config.outer_ring_factor,
            inner_limit: radius * config.inner_radius_factor,
        }
    }

    /// Width of the translucent band drawn for each ring.
    pub fn band_width(self) -> f32 {
        self.outer_radius - self.radius
    }

    pub fn radius_for(self, orca_supported: bool) -> f32 {
        if orca_supported {
            self.radius
        } else {
            self.outer_radius
        }
    }
}

fn jitter(rng: &mut impl Rng) -> Vec2 {
    let mut component = || {
        let sign = if rng.random::<f32>() > 0.5 { -1.0 } else { 1.0 };
        sign * rng.random::<f32>()
    };
    vec2(component(), component())
}

/// Satellites of a contributor: repositories linked only to it.
fn satellites_of(graph: &OrbitGraph, contributor: usize) -> Vec<usize> {
    graph
        .links
        .iter()
        .filter(|link| link.source == contributor)
        .map(|link| link.target)
        .filter(|&target| target != graph.central && graph.nodes[target].degree == 1)
        .collect()
}

fn contributor_collision_radius(radius: f32) -> f32 {
    radius + radius.clamp(10.0, 14.0)
}

fn satellite_collision_radius(radius: f32) -> f32 {
    radius + (radius * 0.2).max(2.0)
}

struct Cluster {
    satellites: Vec<usize>,
    offsets: Vec<Vec2>,
}

fn cluster_satellites(
    graph: &mut OrbitGraph,
    config: &OrbitLayoutConfig,
    rng: &mut impl Rng,
) -> Vec<Cluster> {
    let mut clusters = Vec::with_capacity(graph.contributor_count);

    for contributor in graph.contributors() {
        let satellites = satellites_of(graph, contributor);
        let own_radius = graph.nodes[contributor].radius;

        let mut bodies = vec![Body::pinned(Vec2::ZERO, own_radius)];
        let mut radii = vec![contributor_collision_radius(own_radius)];
        for &satellite in &satellites {
            let radius = graph.nodes[satellite].radius;
            bodies.push(Body::new(jitter(rng), radius));
            radii.push(satellite_collision_radius(radius));
        }

        let mut simulation = Simulation::new(bodies)
            .with_force(Collide::new(config.satellite.ramp).with_radii(radii))
            .with_force(Center {
                target: Vec2::ZERO,
                strength: config.centering_strength,
            });
        simulation.run(config.satellite.steps, |_| {});

        let offsets = simulation.bodies[1..]
            .iter()
            .map(|body| body.position)
            .collect::<Vec<_>>();
        let footprint = simulation
            .bodies
            .iter()
            .map(|body| body.position.length() + body.radius)
            .fold(own_radius, f32::max);
        graph.nodes[contributor].footprint_radius = footprint;

        debug!(
            "contributor {} clusters {} satellites within {footprint:.1}",
            graph.nodes[contributor].id,
            satellites.len()
        );
        clusters.push(Cluster {
            satellites,
            offsets,
        });
    }

    clusters
}

fn place_on_rings(
    graph: &mut OrbitGraph,
    clusters: &[Cluster],
    config: &OrbitLayoutConfig,
) -> RingGeometry {
    let circumference = graph
        .contributors()
        .map(|index| graph.nodes[index].footprint_radius * 2.0 + config.contributor_padding)
        .sum::<f32>();
    let rings = RingGeometry::new(circumference, config);

    let central = graph.central;
    graph.nodes[central].position = Vec2::ZERO;
    graph.nodes[central].pinned = true;

    let mut angle = 0.0_f32;
    for (contributor, cluster) in graph.contributors().zip(clusters) {
        let node = &graph.nodes[contributor];
        let arc = node.footprint_radius * 2.0 + config.contributor_padding;
        let half_angle = arc / rings.radius / 2.0;
        let theta = angle + half_angle - FRAC_PI_2;
        let ring_radius = rings.radius_for(node.is_orca_supported());
        let position = vec2(theta.cos(), theta.sin()) * ring_radius;
        angle += half_angle * 2.0;

        let node = &mut graph.nodes[contributor];
        node.position = position;
        node.pinned = true;
        node.ring_angle = Some(theta);

        for (&satellite, offset) in cluster.satellites.iter().zip(&cluster.offsets) {
            let node = &mut graph.nodes[satellite];
            node.position = position + *offset;
            node.pinned = true;
        }
    }

    rings
}

fn link_distance(target_degree: usize) -> f32 {
    Scale::linear(&[1.0, 50.0], &[10.0, 80.0]).map(target_degree as f64) * 5.0
}

fn relax_shared_repositories(
    graph: &mut OrbitGraph,
    rings: RingGeometry,
    config: &OrbitLayoutConfig,
) -> Result<usize> {
    let members = graph
        .contributors()
        .chain(graph.repositories().filter(|&index| {
            index == graph.central || graph.nodes[index].degree > 1
        }))
        .collect::<Vec<_>>();
    let mut slot = vec![usize::MAX; graph.nodes.len()];
    for (body, &node) in members.iter().enumerate() {
        slot[node] = body;
    }

    let mut bodies = Vec::with_capacity(members.len());
    let mut radii = Vec::with_capacity(members.len());
    let mut clamped = Vec::with_capacity(members.len());
    for (body_index, &index) in members.iter().enumerate() {
        let node = &graph.nodes[index];
        let body = if node.pinned {
            Body::pinned(node.position, node.radius)
        } else {
            Body::new(phyllotaxis(body_index), node.radius)
        };
        let extent = node.footprint_radius.max(node.radius);
        let padding = match node.kind {
            NodeKind::CentralRepository => node.collision_padding(),
            NodeKind::Contributor | NodeKind::Repository => (extent / 2.0).max(15.0),
        };
        bodies.push(body);
        radii.push(extent + padding);
        clamped.push(node.kind.is_repository());
    }

    let springs = graph
        .links
        .iter()
        .filter(|link| slot[link.source] != usize::MAX && slot[link.target] != usize::MAX)
        .map(|link| Spring {
            source: slot[link.source],
            target: slot[link.target],
            distance: link_distance(graph.nodes[link.target].degree),
        })
        .collect::<Vec<_>>();
    let spring_count = springs.len();
    let links = Links::new(springs, bodies.len()).context("invalid shared repository links")?;

    let limit = rings.inner_limit;
    let mut simulation = Simulation::new(bodies)
        .with_force(links)
        .with_force(Collide::new(config.shared.ramp).with_radii(radii))
        .with_force(Charge::default());
    simulation.run(config.shared.steps, |bodies| {
        for (body, clamp) in bodies.iter_mut().zip(&clamped) {
            let distance = body.position.length();
            if *clamp && distance > limit {
                body.position *= limit / distance;
            }
        }
    });

    for (body, &index) in simulation.bodies.iter().zip(&members) {
        let node = &mut graph.nodes[index];
        node.position = body.position;
        node.pinned = true;
    }

    debug!(
        "shared pass: {} bodies, {spring_count} springs, inner limit {limit:.1}",
        members.len()
    );
    Ok(members.len() - graph.contributor_count)
}

fn relax_fillers(
    graph: &mut OrbitGraph,
    rings: RingGeometry,
    config: &OrbitLayoutConfig,
    rng: &mut impl Rng,
) {
    if graph.fillers.is_empty() {
        return;
    }

    let mut bodies = graph
        .fillers
        .iter()
        .map(|filler| Body::new(jitter(rng), filler.radius))
        .collect::<Vec<_>>();
    // stands in for both rings so fillers settle outside them
    bodies.push(Body::pinned(
        Vec2::ZERO,
        rings.outer_radius + rings.band_width() / 2.0,
    ));
    let radii = bodies
        .iter()
        .map(|body| body.radius + rng.random::<f32>() * 40.0 + 20.0)
        .collect::<Vec<_>>();

    let mut simulation = Simulation::new(bodies)
        .with_force(Collide::new(config.filler.ramp).with_radii(radii))
        .with_force(Charge::default())
        .with_force(Center {
            target: Vec2::ZERO,
            strength: config.centering_strength,
        });
    simulation.run(config.filler.steps, |_| {});

    for (filler, body) in graph.fillers.iter_mut().zip(&simulation.bodies) {
        filler.position = body.position;
    }
}

/// Positions every node of the graph: satellite clusters, ring placement,
/// shared repositories inside the ring, then filler contributors outside it.
pub fn layout_orbit_graph(
    graph: &mut OrbitGraph,
    config: &OrbitLayoutConfig,
    rng: &mut impl Rng,
) -> Result<RingGeometry> {
    let clusters = cluster_satellites(graph, config, rng);
    let rings = place_on_rings(graph, &clusters, config);
    info!(
        "contributor rings at {:.1} and {:.1} (circumference {:.1})",
        rings.radius, rings.outer_radius, rings.circumference
    );

    let shared = relax_shared_repositories(graph, rings, config)?;
    relax_fillers(graph, rings, config, rng);
    info!(
        "orbit layout done: {} satellites, {shared} shared repositories, {} fillers",
        clusters.iter().map(|cluster| cluster.satellites.len()).sum::<usize>(),
        graph.fillers.len()
    );
    if log_enabled!(Level::Debug) {
        let bodies = graph
            .nodes
            .iter()
            .map(|node| Body::new(node.position, node.radius))
            .collect::<Vec<_>>();
        debug!("largest node overlap after layout: {:.2}", max_overlap(&bodies));
    }

    Ok(rings)
}
