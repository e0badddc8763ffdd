//! Cost-to-target maps
//!
//! A `PathingMap` is a distance field grown outward from a target cell.
//! Agents walk it downhill: each step moves to the neighbour with the lowest
//! cost, and a cell with no cheaper neighbour means there is no improving
//! move.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Grid adjacency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
pub enum Topology {
    /// Orthogonal neighbours only
    Four,
    /// Orthogonal and diagonal neighbours
    #[default]
    Eight,
}

const ORTHOGONAL: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
const ALL_DIRECTIONS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

impl Topology {
    /// Neighbour offsets for this adjacency
    pub const fn deltas(self) -> &'static [(i32, i32)] {
        match self {
            Topology::Four => &ORTHOGONAL,
            Topology::Eight => &ALL_DIRECTIONS,
        }
    }

    /// True when `a` and `b` are distinct neighbours
    pub fn adjacent(self, a: (i32, i32), b: (i32, i32)) -> bool {
        let (dx, dy) = ((a.0 - b.0).abs(), (a.1 - b.1).abs());
        match self {
            Topology::Four => dx + dy == 1,
            Topology::Eight => dx.max(dy) == 1,
        }
    }
}

/// Immutable cost-to-target map for one floor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathingMap {
    target: (i32, i32),
    floor: usize,
    topology: Topology,
    costs: HashMap<(i32, i32), u32>,
}

impl PathingMap {
    /// A map with no reachable cells
    pub fn empty(target: (i32, i32), floor: usize, topology: Topology) -> Self {
        Self {
            target,
            floor,
            topology,
            costs: HashMap::new(),
        }
    }

    /// Relax outward from `target` over every cell `passable` accepts
    ///
    /// `bounds` is `(width, height)` of the floor. An out-of-bounds or
    /// impassable target produces an empty map.
    pub fn compute<F>(
        target: (i32, i32),
        floor: usize,
        bounds: (i32, i32),
        passable: F,
        topology: Topology,
    ) -> Self
    where
        F: Fn(i32, i32) -> bool,
    {
        let mut map = Self::empty(target, floor, topology);
        let in_bounds = |x: i32, y: i32| x >= 0 && y >= 0 && x < bounds.0 && y < bounds.1;

        if !in_bounds(target.0, target.1) || !passable(target.0, target.1) {
            return map;
        }

        let mut frontier = BinaryHeap::new();
        map.costs.insert(target, 0);
        frontier.push(Reverse((0u32, target.0, target.1)));

        while let Some(Reverse((cost, x, y))) = frontier.pop() {
            if map.costs.get(&(x, y)).is_some_and(|&best| best < cost) {
                continue;
            }
            for &(dx, dy) in topology.deltas() {
                let (nx, ny) = (x + dx, y + dy);
                if !in_bounds(nx, ny) {
                    continue;
                }
                let next = cost + 1;
                if map.costs.get(&(nx, ny)).is_some_and(|&best| best <= next) {
                    continue;
                }
                if !passable(nx, ny) {
                    continue;
                }
                map.costs.insert((nx, ny), next);
                frontier.push(Reverse((next, nx, ny)));
            }
        }

        map
    }

    pub fn target(&self) -> (i32, i32) {
        self.target
    }

    pub fn floor(&self) -> usize {
        self.floor
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Steps from `(x, y)` to the target, if reachable
    pub fn cost(&self, x: i32, y: i32) -> Option<u32> {
        self.costs.get(&(x, y)).copied()
    }

    /// Number of reachable cells
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Cheapest neighbour of `from` that is strictly closer to the target
    ///
    /// Returns `None` at the target itself, on an empty map, or when every
    /// neighbour is no better than `from`. Ties go to the first neighbour in
    /// adjacency order.
    pub fn next_step(&self, from: (i32, i32)) -> Option<(i32, i32)> {
        let here = self.cost(from.0, from.1).unwrap_or(u32::MAX);
        let mut best: Option<((i32, i32), u32)> = None;
        for &(dx, dy) in self.topology.deltas() {
            let cell = (from.0 + dx, from.1 + dy);
            let Some(cost) = self.cost(cell.0, cell.1) else {
                continue;
            };
            if cost < here && best.is_none_or(|(_, b)| cost < b) {
                best = Some((cell, cost));
            }
        }
        best.map(|(cell, _)| cell)
    }
}
