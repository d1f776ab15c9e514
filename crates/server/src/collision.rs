//! Collision queries against the maze.
//!
//! This module handles:
//! - Wall occlusion for a circle on the floor plane
//! - Hitscan rays stepped through walls and player cylinders

use glam::Vec3;
use protocol::{CELL_SIZE, ConnId, Maze, MazeCell, WALL_THICKNESS, CellPos};

/// Half of a wall's thickness, added around the tested circle.
pub const WALL_TOLERANCE: f32 = WALL_THICKNESS / 2.0;
/// Player hit cylinder extent below eye height.
pub const BODY_BELOW_EYE: f32 = 1.5;
/// Player hit cylinder extent above eye height.
pub const BODY_ABOVE_EYE: f32 = 0.5;

/// Whether a circle of `radius` at `(x, z)` touches a closed wall or leaves
/// the maze.
pub fn is_blocked(maze: &Maze, x: f32, z: f32, radius: f32) -> bool {
    if !x.is_finite() || !z.is_finite() {
        return true;
    }
    let radius = radius.max(0.0);

    let min_col = ((x - radius) / CELL_SIZE).floor();
    let max_col = ((x + radius) / CELL_SIZE).floor();
    let min_row = ((z - radius) / CELL_SIZE).floor();
    let max_row = ((z + radius) / CELL_SIZE).floor();

    if min_col < 0.0
        || min_row < 0.0
        || max_col >= maze.cols as f32
        || max_row >= maze.rows as f32
    {
        return true;
    }

    // Bounding square of the circle, grown by the wall tolerance.
    let left = x - radius - WALL_TOLERANCE;
    let right = x + radius + WALL_TOLERANCE;
    let top = z - radius - WALL_TOLERANCE;
    let bottom = z + radius + WALL_TOLERANCE;

    for r in min_row as usize..=max_row as usize {
        for c in min_col as usize..=max_col as usize {
            let Some(cell) = maze.cell(CellPos::new(r, c)) else {
                return true;
            };
            if touches_closed_wall(cell, r, c, left, right, top, bottom) {
                return true;
            }
        }
    }
    false
}

fn touches_closed_wall(
    cell: &MazeCell,
    r: usize,
    c: usize,
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
) -> bool {
    let x0 = c as f32 * CELL_SIZE;
    let x1 = x0 + CELL_SIZE;
    let z0 = r as f32 * CELL_SIZE;
    let z1 = z0 + CELL_SIZE;

    let spans_x = right > x0 && left < x1;
    let spans_z = bottom > z0 && top < z1;

    (!cell.north && spans_x && top <= z0 && bottom >= z0)
        || (!cell.south && spans_x && top <= z1 && bottom >= z1)
        || (!cell.west && spans_z && left <= x0 && right >= x0)
        || (!cell.east && spans_z && left <= x1 && right >= x1)
}

/// A player as seen by the ray: eye position and liveness.
#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub id: ConnId,
    pub position: Vec3,
    pub alive: bool,
}

/// A hitscan ray. `direction` is expected to be normalised.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub max_range: f32,
    pub step: f32,
}

/// First player struck by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub target_id: ConnId,
    pub distance: f32,
}

/// Step a ray through the maze and return the first living, non-excluded
/// player it meets, or `None` if a wall intervenes or range runs out.
pub fn raycast_players(
    maze: &Maze,
    ray: &Ray,
    targets: &[Target],
    exclude: ConnId,
    probe_radius: f32,
    hit_radius: f32,
) -> Option<RayHit> {
    if ray.step <= 0.0 || !ray.step.is_finite() || ray.max_range <= 0.0 {
        return None;
    }
    let hit_radius_sq = hit_radius * hit_radius;
    let mut travelled = ray.step;

    while travelled <= ray.max_range {
        let sample = ray.origin + ray.direction * travelled;
        if is_blocked(maze, sample.x, sample.z, probe_radius) {
            return None;
        }

        let mut best: Option<(ConnId, f32)> = None;
        for target in targets {
            if !target.alive || target.id == exclude {
                continue;
            }
            let dx = sample.x - target.position.x;
            let dz = sample.z - target.position.z;
            let horizontal_sq = dx * dx + dz * dz;
            if horizontal_sq > hit_radius_sq {
                continue;
            }
            let low = target.position.y - BODY_BELOW_EYE;
            let high = target.position.y + BODY_ABOVE_EYE;
            if sample.y < low || sample.y > high {
                continue;
            }
            if best.is_none_or(|(_, d)| horizontal_sq < d) {
                best = Some((target.id, horizontal_sq));
            }
        }
        if let Some((target_id, _)) = best {
            return Some(RayHit {
                target_id,
                distance: travelled,
            });
        }

        travelled += ray.step;
    }
    None
}
