#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shortest path search over the four-connected navigation grid.
//!
//! The search is A* with a Manhattan heuristic and unit step cost. All
//! per-search bookkeeping lives in scratch buffers owned by [`Pathfinder`], so
//! the grid itself is never mutated and separate pathfinders never interfere.

use std::{cmp::Ordering, collections::BinaryHeap};

use phantom_maze_core::{CellCoord, GridView, PathError};

/// Reusable A* search engine.
#[derive(Debug, Default)]
pub struct Pathfinder {
    scratch: Scratch,
    open: BinaryHeap<OpenEntry>,
    sequence: u64,
}

impl Pathfinder {
    /// Creates a pathfinder with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the shortest route from `start` to `goal`.
    ///
    /// The returned cells exclude `start` and end with `goal`; the route is
    /// empty when both are the same cell. Ties between equally promising cells
    /// are broken by the smaller heuristic, then by discovery order.
    pub fn find_path(
        &mut self,
        grid: &GridView<'_>,
        start: CellCoord,
        goal: CellCoord,
    ) -> Result<Vec<CellCoord>, PathError> {
        let start_index = grid
            .index_of(start)
            .ok_or(PathError::UnknownCoordinate(start))?;
        let goal_index = grid
            .index_of(goal)
            .ok_or(PathError::UnknownCoordinate(goal))?;
        let unreachable = PathError::NoPathFound {
            from: start,
            to: goal,
        };

        if start_index == goal_index {
            return Ok(Vec::new());
        }
        if !grid.is_walkable(goal) {
            return Err(unreachable);
        }

        self.scratch.reset(grid.node_count());
        self.open.clear();
        self.sequence = 0;

        self.scratch.g[start_index] = 0;
        self.scratch.state[start_index] = NodeState::Open;
        self.push(start_index, 0, start.manhattan_distance(goal));

        while let Some(entry) = self.open.pop() {
            let current = entry.index;
            if self.scratch.state[current] == NodeState::Closed {
                continue;
            }
            if current == goal_index {
                return Ok(self.reconstruct(grid, start_index, goal_index));
            }
            self.scratch.state[current] = NodeState::Closed;

            let Some(cell) = grid.node(current).map(|node| node.position()) else {
                continue;
            };
            let next_cost = self.scratch.g[current].saturating_add(1);

            for neighbor in cell.cardinal_neighbors() {
                let Some(index) = grid.index_of(neighbor) else {
                    continue;
                };
                if !grid.is_walkable(neighbor) {
                    continue;
                }
                match self.scratch.state[index] {
                    NodeState::Closed => continue,
                    NodeState::Open if next_cost >= self.scratch.g[index] => continue,
                    _ => {}
                }

                self.scratch.g[index] = next_cost;
                self.scratch.parent[index] = Some(current);
                self.scratch.state[index] = NodeState::Open;
                self.push(index, next_cost, neighbor.manhattan_distance(goal));
            }
        }

        Err(unreachable)
    }

    fn push(&mut self, index: usize, g: u32, h: u32) {
        self.open.push(OpenEntry {
            f: g.saturating_add(h),
            h,
            sequence: self.sequence,
            index,
        });
        self.sequence += 1;
    }

    fn reconstruct(&self, grid: &GridView<'_>, start: usize, goal: usize) -> Vec<CellCoord> {
        let mut route = Vec::new();
        let mut cursor = Some(goal);
        while let Some(index) = cursor {
            if index == start {
                break;
            }
            if let Some(node) = grid.node(index) {
                route.push(node.position());
            }
            cursor = self.scratch.parent[index];
        }
        route.reverse();
        route
    }
}

/// Convenience wrapper that runs a single search with fresh scratch buffers.
pub fn find_path(
    grid: &GridView<'_>,
    start: CellCoord,
    goal: CellCoord,
) -> Result<Vec<CellCoord>, PathError> {
    Pathfinder::new().find_path(grid, start, goal)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum NodeState {
    #[default]
    Unvisited,
    Open,
    Closed,
}

#[derive(Debug, Default)]
struct Scratch {
    g: Vec<u32>,
    parent: Vec<Option<usize>>,
    state: Vec<NodeState>,
}

impl Scratch {
    fn reset(&mut self, node_count: usize) {
        self.g.clear();
        self.g.resize(node_count, u32::MAX);
        self.parent.clear();
        self.parent.resize(node_count, None);
        self.state.clear();
        self.state.resize(node_count, NodeState::Unvisited);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenEntry {
    f: u32,
    h: u32,
    sequence: u64,
    index: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior in BinaryHeap.
        (other.f, other.h, other.sequence).cmp(&(self.f, self.h, self.sequence))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
