//! Spawn placement and room maze sizing.

use protocol::CellPos;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

fn all_cells(rows: usize, cols: usize) -> Vec<CellPos> {
    (0..rows)
        .flat_map(|r| (0..cols).map(move |c| CellPos::new(r, c)))
        .collect()
}

fn well_spaced(candidate: CellPos, chosen: &[CellPos], spacing: usize) -> bool {
    chosen.iter().all(|other| candidate.manhattan(*other) >= spacing)
}

/// Pick up to `count` cells whose pairwise Manhattan distance is at least
/// `spacing`.
///
/// A greedy pass over a random permutation of the grid runs first. If it
/// comes up short, the lattice of cells at multiples of `spacing` (which is
/// large enough whenever `rows * cols >= count * spacing²`) is tried. Only
/// then is spacing relaxed and the remainder filled from unused cells.
pub fn pick_spaced_spawns<R: Rng + ?Sized>(
    count: usize,
    rows: usize,
    cols: usize,
    spacing: usize,
    rng: &mut R,
) -> Vec<CellPos> {
    let mut cells = all_cells(rows, cols);
    cells.shuffle(rng);

    let mut chosen: Vec<CellPos> = Vec::with_capacity(count);
    for &cell in &cells {
        if chosen.len() >= count {
            break;
        }
        if well_spaced(cell, &chosen, spacing) {
            chosen.push(cell);
        }
    }
    if chosen.len() >= count {
        return chosen;
    }

    let step = spacing.max(1);
    let mut lattice: Vec<CellPos> = (0..rows)
        .step_by(step)
        .flat_map(|r| (0..cols).step_by(step).map(move |c| CellPos::new(r, c)))
        .collect();
    if lattice.len() >= count {
        lattice.shuffle(rng);
        lattice.truncate(count);
        return lattice;
    }

    let used: HashSet<CellPos> = chosen.iter().copied().collect();
    for &cell in &cells {
        if chosen.len() >= count {
            break;
        }
        if !used.contains(&cell) {
            chosen.push(cell);
        }
    }
    chosen
}

/// Scale base maze dimensions so `max_players` spawns can keep `spacing`.
///
/// Needed area is `max_players * spacing²`; when the base grid is smaller,
/// both dimensions are multiplied by `ceil(sqrt(needed / base))`.
pub fn scaled_dimensions(
    base_rows: usize,
    base_cols: usize,
    max_players: usize,
    spacing: usize,
) -> (usize, usize) {
    let base_rows = base_rows.max(1);
    let base_cols = base_cols.max(1);
    let base = base_rows * base_cols;
    let needed = max_players.saturating_mul(spacing.saturating_mul(spacing));
    if base >= needed {
        return (base_rows, base_cols);
    }
    let factor = (needed as f64 / base as f64).sqrt().ceil() as usize;
    (base_rows * factor, base_cols * factor)
}

/// Pick a cell at least `spacing` away from every occupied cell, or any
/// random cell if none qualifies.
pub fn pick_respawn_cell<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    occupied: &[CellPos],
    spacing: usize,
    rng: &mut R,
) -> CellPos {
    let rows = rows.max(1);
    let cols = cols.max(1);
    let mut cells = all_cells(rows, cols);
    cells.shuffle(rng);
    cells
        .iter()
        .copied()
        .find(|cell| well_spaced(*cell, occupied, spacing))
        .unwrap_or_else(|| CellPos::new(rng.random_range(0..rows), rng.random_range(0..cols)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assert_spaced(cells: &[CellPos], spacing: usize) {
        for (i, a) in cells.iter().enumerate() {
            for b in &cells[i + 1..] {
                assert!(a.manhattan(*b) >= spacing, "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_spacing_holds_when_area_suffices() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            for (count, spacing) in [(2, 5), (4, 5), (8, 5), (6, 3), (10, 2)] {
                let (rows, cols) = scaled_dimensions(8, 8, count, spacing);
                assert!(rows * cols >= count * spacing * spacing);
                let cells = pick_spaced_spawns(count, rows, cols, spacing, &mut rng);
                assert_eq!(cells.len(), count);
                assert_spaced(&cells, spacing);
            }
        }
    }

    #[test]
    fn test_exact_area_square_grid() {
        let mut rng = StdRng::seed_from_u64(9);
        // 10x10 with spacing 5 fits exactly 4 lattice cells.
        let cells = pick_spaced_spawns(4, 10, 10, 5, &mut rng);
        assert_eq!(cells.len(), 4);
        assert_spaced(&cells, 5);
    }

    #[test]
    fn test_relaxed_fallback_fills_count() {
        let mut rng = StdRng::seed_from_u64(2);
        let cells = pick_spaced_spawns(6, 3, 3, 5, &mut rng);
        assert_eq!(cells.len(), 6);
        let unique: HashSet<_> = cells.iter().collect();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn test_more_than_area_returns_every_cell() {
        let mut rng = StdRng::seed_from_u64(4);
        let cells = pick_spaced_spawns(10, 2, 2, 1, &mut rng);
        assert_eq!(cells.len(), 4);
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(8, 8, 2, 5), (8, 8));
        // 8 * 25 = 200 > 64: factor ceil(sqrt(3.125)) = 2.
        assert_eq!(scaled_dimensions(8, 8, 8, 5), (16, 16));
        assert_eq!(scaled_dimensions(4, 6, 16, 5), (20, 30));
    }

    #[test]
    fn test_respawn_cell_avoids_occupied() {
        let mut rng = StdRng::seed_from_u64(8);
        let occupied = [CellPos::new(0, 0), CellPos::new(7, 7)];
        for _ in 0..50 {
            let cell = pick_respawn_cell(8, 8, &occupied, 5, &mut rng);
            assert!(occupied.iter().all(|o| o.manhattan(cell) >= 5));
        }
        // Nothing qualifies on a 2x2 grid: still returns a cell in range.
        let cell = pick_respawn_cell(2, 2, &[CellPos::new(0, 0)], 5, &mut rng);
        assert!(cell.r < 2 && cell.c < 2);
    }
}
