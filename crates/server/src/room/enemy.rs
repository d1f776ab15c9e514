//! Enemy placement for a level course.
//!
//! The server does not simulate enemies; it only decides where they stand so
//! every re-sync of the same (player, level) sees the same layout.

use protocol::{CellPos, Enemy};
use rand::Rng;
use rand::seq::SliceRandom;

use super::Course;
use crate::config::GameConfig;

/// Cells this close to the start are kept clear of enemies.
const START_CLEARANCE: usize = 2;

/// Roll an enemy layout for `level` on `course`.
pub fn generate<R: Rng + ?Sized>(
    course: &Course,
    level: u32,
    rules: &GameConfig,
    rng: &mut R,
) -> Vec<Enemy> {
    let mut cells: Vec<CellPos> = (0..course.maze.rows)
        .flat_map(|r| (0..course.maze.cols).map(move |c| CellPos::new(r, c)))
        .filter(|cell| *cell != course.exit && cell.manhattan(course.start) > START_CLEARANCE)
        .collect();
    cells.shuffle(rng);

    let wanted = rules
        .enemies_base
        .saturating_add(rules.enemies_per_level.saturating_mul(level as usize));
    let hp = rules
        .enemy_base_hp
        .saturating_add(rules.enemy_hp_per_level.saturating_mul(level as i32));

    cells
        .into_iter()
        .take(wanted)
        .enumerate()
        .map(|(i, cell)| {
            let center = cell.center();
            Enemy {
                id: i as u32 + 1,
                x: center.x,
                z: center.z,
                hp,
            }
        })
        .collect()
}
