//! Breadth-first pathfinding over the [`GridMap`].
//!
//! Every step, cardinal or diagonal, costs one unit. Neighbors are explored
//! in the fixed order of [`NEIGHBOR_OFFSETS`], which decides between paths of
//! equal length and keeps results reproducible.

use std::collections::VecDeque;

use hearthvale_core::{Tile, WorldPos};
use tracing::debug;

use crate::GridMap;

/// Farthest Chebyshev distance a single pathfinding request may cover.
pub const MAX_PATH_DISTANCE: u32 = 50;

/// Upper bound on the number of checkpoints returned for a path.
pub const MAX_CHECKPOINTS: usize = 25;

/// Neighbor exploration order: W, E, S, N, SW, SE, NW, NE.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, 1),
    (0, -1),
    (-1, 1),
    (1, 1),
    (-1, -1),
    (1, -1),
];

enum Search {
    Found(Vec<Tile>),
    Rejected,
    Unreachable,
}

/// Finds a checkpoint path from the position to the target tile.
///
/// An empty result means the target cannot be reached: it is farther than
/// [`MAX_PATH_DISTANCE`], blocked, out of bounds, or no route exists to it or
/// any of its eight neighbors.
#[must_use]
pub fn find_path(grid: &GridMap, from: WorldPos, to: Tile) -> Vec<Tile> {
    let start = from.tile();
    match search(grid, start, to) {
        Search::Found(route) => {
            let checkpoints = compress(&route);
            debug!(%start, target = %to, checkpoints = checkpoints.len(), "path found");
            checkpoints
        }
        Search::Rejected => {
            debug!(%start, target = %to, "path rejected by policy");
            Vec::new()
        }
        Search::Unreachable => {
            let fallback = approach(grid, start, to);
            if fallback.is_empty() {
                debug!(%start, target = %to, "no route to target or its neighbors");
            }
            fallback
        }
    }
}

/// Finds a path ending next to `target`, for interacting with blocked objects.
///
/// When the start tile already touches the target, the path is the start
/// tile alone so arrival fires immediately.
#[must_use]
pub fn find_path_to_adjacent(grid: &GridMap, from: WorldPos, target: Tile) -> Vec<Tile> {
    let start = from.tile();
    if start != target && start.chebyshev_distance(target) <= 1 {
        return vec![start];
    }
    approach(grid, start, target)
}

/// Expands checkpoints back into the tile-by-tile route they describe.
#[must_use]
pub fn expand_checkpoints(checkpoints: &[Tile]) -> Vec<Tile> {
    let Some(first) = checkpoints.first().copied() else {
        return Vec::new();
    };

    let mut route = vec![first];
    let mut current = first;
    for &next in &checkpoints[1..] {
        while current != next {
            let dx = step_toward(current.x(), next.x());
            let dy = step_toward(current.y(), next.y());
            let Some(stepped) = current.offset(dx, dy) else {
                return route;
            };
            current = stepped;
            route.push(current);
        }
    }
    route
}

fn step_toward(from: u32, to: u32) -> i32 {
    match from.cmp(&to) {
        std::cmp::Ordering::Less => 1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => -1,
    }
}

fn approach(grid: &GridMap, start: Tile, target: Tile) -> Vec<Tile> {
    for (dx, dy) in NEIGHBOR_OFFSETS {
        let Some(candidate) = target.offset(dx, dy) else {
            continue;
        };
        if let Search::Found(route) = search(grid, start, candidate) {
            return compress(&route);
        }
    }
    Vec::new()
}

fn search(grid: &GridMap, start: Tile, target: Tile) -> Search {
    if start.chebyshev_distance(target) > MAX_PATH_DISTANCE {
        return Search::Rejected;
    }
    if !grid.contains(start) || !grid.is_walkable(target) {
        return Search::Rejected;
    }
    if start == target {
        return Search::Found(vec![start]);
    }

    let (Some(start_index), Some(target_index)) = (grid.index(start), grid.index(target)) else {
        return Search::Rejected;
    };

    let mut came_from: Vec<Option<usize>> = vec![None; grid.cell_count()];
    let mut visited = vec![false; grid.cell_count()];
    let mut tiles: Vec<Tile> = vec![Tile::default(); grid.cell_count()];
    let mut queue = VecDeque::new();

    visited[start_index] = true;
    tiles[start_index] = start;
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let Some(current_index) = grid.index(current) else {
            continue;
        };

        for (dx, dy) in NEIGHBOR_OFFSETS {
            let Some(next) = legal_step(grid, current, dx, dy) else {
                continue;
            };
            let Some(next_index) = grid.index(next) else {
                continue;
            };
            if visited[next_index] {
                continue;
            }

            visited[next_index] = true;
            came_from[next_index] = Some(current_index);
            tiles[next_index] = next;

            if next_index == target_index {
                return Search::Found(reconstruct(&came_from, &tiles, target_index));
            }
            queue.push_back(next);
        }
    }

    Search::Unreachable
}

/// Diagonal steps require both orthogonal neighbors to be walkable.
fn legal_step(grid: &GridMap, from: Tile, dx: i32, dy: i32) -> Option<Tile> {
    let next = from.offset(dx, dy)?;
    if !grid.is_walkable(next) {
        return None;
    }
    if dx != 0 && dy != 0 {
        let horizontal = from.offset(dx, 0)?;
        let vertical = from.offset(0, dy)?;
        if !grid.is_walkable(horizontal) || !grid.is_walkable(vertical) {
            return None;
        }
    }
    Some(next)
}

fn reconstruct(came_from: &[Option<usize>], tiles: &[Tile], target_index: usize) -> Vec<Tile> {
    let mut route = vec![tiles[target_index]];
    let mut cursor = target_index;
    while let Some(previous) = came_from[cursor] {
        route.push(tiles[previous]);
        cursor = previous;
    }
    route.reverse();
    route
}

/// Keeps the first tile, the last tile, and every tile where the direction changes.
fn compress(route: &[Tile]) -> Vec<Tile> {
    let Some((&first, rest)) = route.split_first() else {
        return Vec::new();
    };

    let mut checkpoints = vec![first];
    for window in route.windows(3) {
        let incoming = direction(window[0], window[1]);
        let outgoing = direction(window[1], window[2]);
        if incoming != outgoing {
            checkpoints.push(window[1]);
        }
    }
    if let Some(&last) = rest.last() {
        checkpoints.push(last);
    }

    checkpoints.truncate(MAX_CHECKPOINTS);
    checkpoints
}

fn direction(from: Tile, to: Tile) -> (i32, i32) {
    (step_toward(from.x(), to.x()), step_toward(from.y(), to.y()))
}
