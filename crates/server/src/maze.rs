//! Maze generation.
//!
//! Perfect mazes (spanning trees over the grid) are carved with an
//! iterative depth-first backtracker. The explicit stack keeps large mazes
//! off the call stack.

use fixedbitset::FixedBitSet;
use protocol::{CellPos, Maze};
use rand::Rng;
use rand::seq::IndexedRandom;

/// A side of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    North,
    South,
    East,
    West,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::North, Side::South, Side::East, Side::West];

    pub fn opposite(self) -> Side {
        match self {
            Side::North => Side::South,
            Side::South => Side::North,
            Side::East => Side::West,
            Side::West => Side::East,
        }
    }

    /// The neighbouring cell across this side, if inside a `rows x cols` grid.
    pub fn step(self, pos: CellPos, rows: usize, cols: usize) -> Option<CellPos> {
        match self {
            Side::North => pos.r.checked_sub(1).map(|r| CellPos::new(r, pos.c)),
            Side::South => (pos.r + 1 < rows).then(|| CellPos::new(pos.r + 1, pos.c)),
            Side::West => pos.c.checked_sub(1).map(|c| CellPos::new(pos.r, c)),
            Side::East => (pos.c + 1 < cols).then(|| CellPos::new(pos.r, pos.c + 1)),
        }
    }
}

/// Open the wall on `side` of `pos` and the matching wall of its neighbour.
pub fn carve(maze: &mut Maze, pos: CellPos, side: Side) {
    let Some(next) = side.step(pos, maze.rows, maze.cols) else {
        return;
    };
    set_open(maze, pos, side);
    set_open(maze, next, side.opposite());
}

fn set_open(maze: &mut Maze, pos: CellPos, side: Side) {
    if let Some(cell) = maze.cell_mut(pos) {
        match side {
            Side::North => cell.north = true,
            Side::South => cell.south = true,
            Side::East => cell.east = true,
            Side::West => cell.west = true,
        }
    }
}

#[inline]
fn index(pos: CellPos, cols: usize) -> usize {
    pos.r * cols + pos.c
}

/// Generate a perfect maze. Dimensions below 1 are treated as 1.
pub fn generate<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Maze {
    let rows = rows.max(1);
    let cols = cols.max(1);
    let mut maze = Maze::closed(rows, cols);

    let mut visited = FixedBitSet::with_capacity(rows * cols);
    let start = CellPos::new(0, 0);
    visited.insert(index(start, cols));
    let mut stack = vec![start];
    let mut candidates: Vec<(Side, CellPos)> = Vec::with_capacity(4);

    while let Some(&current) = stack.last() {
        candidates.clear();
        for side in Side::ALL {
            if let Some(next) = side.step(current, rows, cols) {
                if !visited.contains(index(next, cols)) {
                    candidates.push((side, next));
                }
            }
        }

        match candidates.choose(rng) {
            None => {
                stack.pop();
            }
            Some(&(side, next)) => {
                carve(&mut maze, current, side);
                visited.insert(index(next, cols));
                stack.push(next);
            }
        }
    }

    maze
}

/// An open arena: every interior wall open, the outer boundary closed.
pub fn open_arena(rows: usize, cols: usize) -> Maze {
    let rows = rows.max(1);
    let cols = cols.max(1);
    let mut maze = Maze::closed(rows, cols);
    for r in 0..rows {
        for c in 0..cols {
            let pos = CellPos::new(r, c);
            carve(&mut maze, pos, Side::South);
            carve(&mut maze, pos, Side::East);
        }
    }
    maze
}

/// Number of open wall pairs (each shared opening counted once).
pub fn open_passages(maze: &Maze) -> usize {
    let mut count = 0;
    for r in 0..maze.rows {
        for c in 0..maze.cols {
            let Some(cell) = maze.cell(CellPos::new(r, c)) else {
                continue;
            };
            if cell.south && r + 1 < maze.rows {
                count += 1;
            }
            if cell.east && c + 1 < maze.cols {
                count += 1;
            }
        }
    }
    count
}

/// Number of cells reachable from `(0, 0)` through open walls.
pub fn reachable_cells(maze: &Maze) -> usize {
    if maze.area() == 0 {
        return 0;
    }
    let mut seen = FixedBitSet::with_capacity(maze.area());
    let mut queue = vec![CellPos::new(0, 0)];
    seen.insert(0);
    let mut count = 0;

    while let Some(pos) = queue.pop() {
        count += 1;
        let Some(cell) = maze.cell(pos) else {
            continue;
        };
        let open = [
            (Side::North, cell.north),
            (Side::South, cell.south),
            (Side::East, cell.east),
            (Side::West, cell.west),
        ];
        for (side, is_open) in open {
            if !is_open {
                continue;
            }
            if let Some(next) = side.step(pos, maze.rows, maze.cols) {
                if !seen.put(index(next, maze.cols)) {
                    queue.push(next);
                }
            }
        }
    }
    count
}
