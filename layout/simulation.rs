/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Batch force simulation.
//!
//! Runs a fixed number of iterations to completion; no frame-by-frame
//! stepping, no randomness. Forces per iteration: pairwise charge
//! repulsion, spring attraction along edges, gravity toward the viewport
//! center, axis-aligned x/y centering, and per-kind collision separation.

use euclid::default::{Point2D, Vector2D};

use super::Viewport;

/// Fixed iteration count; the simulation always runs to completion.
pub(crate) const ITERATIONS: usize = 300;

// Compact, settled defaults:
// - repulsion scaled down so sparse graphs don't fly apart
// - short rest length keeps a site's keywords in a tight orbit
// - heavy damping plus a step clamp for predictable convergence
const C_REPULSE: f32 = 6000.0;
const C_ATTRACT: f32 = 0.04;
const SPRING_REST_LENGTH: f32 = 110.0;
const C_CENTER: f32 = 0.02;
const C_AXIS: f32 = 0.008;
const COLLISION_PADDING: f32 = 6.0;
const DAMPING: f32 = 0.6;
const MAX_STEP: f32 = 10.0;
const MIN_DISTANCE_SQ: f32 = 1e-4;

/// One simulated body: current position, velocity, and collision radius.
pub(crate) struct SimNode {
    pub position: Point2D<f32>,
    pub velocity: Vector2D<f32>,
    pub radius: f32,
}

impl SimNode {
    pub(crate) fn at(position: Point2D<f32>, radius: f32) -> Self {
        Self {
            position,
            velocity: Vector2D::zero(),
            radius,
        }
    }
}

/// Run the full simulation in place. `springs` holds (source, target) index
/// pairs into `nodes`.
pub(crate) fn run(nodes: &mut [SimNode], springs: &[(usize, usize)], viewport: Viewport) {
    if nodes.len() < 2 && springs.is_empty() {
        // A single free body only drifts toward center; skip the pair loops.
        if let Some(node) = nodes.first_mut() {
            node.position = settle_single(node.position, viewport);
        }
        return;
    }

    let center = Point2D::new(viewport.width / 2.0, viewport.height / 2.0);

    for _ in 0..ITERATIONS {
        let mut forces = vec![Vector2D::<f32>::zero(); nodes.len()];

        // Pairwise charge repulsion.
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let delta = separation(nodes, i, j);
                let dist_sq = delta.square_length().max(MIN_DISTANCE_SQ);
                let push = delta / dist_sq.sqrt() * (C_REPULSE / dist_sq);
                forces[i] += push;
                forces[j] -= push;
            }
        }

        // Spring attraction along edges.
        for &(a, b) in springs {
            let delta = separation(nodes, b, a);
            let dist = delta.square_length().max(MIN_DISTANCE_SQ).sqrt();
            let stretch = dist - SPRING_REST_LENGTH;
            let pull = delta / dist * (C_ATTRACT * stretch);
            forces[a] += pull;
            forces[b] -= pull;
        }

        // Center gravity plus the weaker per-axis centering.
        for (idx, node) in nodes.iter().enumerate() {
            let to_center = center - node.position;
            forces[idx] += to_center * C_CENTER;
            forces[idx].x += to_center.x * C_AXIS;
            forces[idx].y += to_center.y * C_AXIS;
        }

        // Integrate with damping and a step clamp.
        for (node, force) in nodes.iter_mut().zip(&forces) {
            node.velocity = (node.velocity + *force) * DAMPING;
            let step = node.velocity.length();
            if step > MAX_STEP {
                node.velocity = node.velocity / step * MAX_STEP;
            }
            node.position += node.velocity;
        }

        resolve_collisions(nodes);
    }
}

/// Pairwise separation pass: overlapping bodies are pushed apart along
/// their axis by half the overlap each.
fn resolve_collisions(nodes: &mut [SimNode]) {
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            let delta = separation(nodes, i, j);
            let min_dist = nodes[i].radius + nodes[j].radius + COLLISION_PADDING;
            let dist = delta.square_length().max(MIN_DISTANCE_SQ).sqrt();
            if dist >= min_dist {
                continue;
            }
            let shift = delta / dist * ((min_dist - dist) / 2.0);
            nodes[i].position += shift;
            nodes[j].position -= shift;
        }
    }
}

/// Vector from node `j` toward node `i`. Coincident bodies get a small
/// deterministic offset derived from their indices so the pair separates
/// the same way on every run.
fn separation(nodes: &[SimNode], i: usize, j: usize) -> Vector2D<f32> {
    let delta = nodes[i].position - nodes[j].position;
    if delta.square_length() < MIN_DISTANCE_SQ {
        let angle = (i * 31 + j * 7) as f32;
        return Vector2D::new(angle.cos(), angle.sin()) * 0.05;
    }
    delta
}

/// Closed form for the one-body case: damped drift toward center, which
/// converges well inside [`ITERATIONS`] steps.
fn settle_single(start: Point2D<f32>, viewport: Viewport) -> Point2D<f32> {
    let center = Point2D::new(viewport.width / 2.0, viewport.height / 2.0);
    let mut position = start;
    let mut velocity = Vector2D::zero();
    for _ in 0..ITERATIONS {
        let force = (center - position) * (C_CENTER + C_AXIS);
        velocity = (velocity + force) * DAMPING;
        position += velocity;
    }
    position
}
