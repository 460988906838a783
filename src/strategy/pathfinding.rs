//! Grid A* over cardinal moves

use crate::game::map::{Cell, GameMap};

/// Cardinal neighbour offsets, in expansion order
const STEPS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    cell: Cell,
    g: u32,
    f: u32,
}

fn manhattan(a: Cell, b: Cell) -> u32 {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}

/// Shortest 4-connected path from `start` to `goal`, both included.
///
/// Walls and off-map cells are never expanded; every step costs 1 and the
/// heuristic is the Manhattan distance. The open node with the lowest f is
/// expanded first, the earliest inserted one on ties. Returns an empty path
/// when the goal is unreachable or either end is off the map.
pub fn find_path(map: &GameMap, start: Cell, goal: Cell) -> Vec<Cell> {
    let (Some(start_idx), Some(_)) = (map.index(start.x, start.y), map.index(goal.x, goal.y))
    else {
        return Vec::new();
    };

    let len = map.tiles().len();
    let mut closed = vec![false; len];
    let mut parent: Vec<Option<usize>> = vec![None; len];
    let mut open = vec![OpenNode {
        cell: start,
        g: 0,
        f: manhattan(start, goal),
    }];

    while !open.is_empty() {
        let mut best = 0;
        for (i, node) in open.iter().enumerate().skip(1) {
            if node.f < open[best].f {
                best = i;
            }
        }
        let current = open.remove(best);
        if current.cell == goal {
            return reconstruct(map, &parent, start_idx, current.cell);
        }

        let Some(current_idx) = map.index(current.cell.x, current.cell.y) else {
            continue;
        };
        closed[current_idx] = true;

        for (dx, dy) in STEPS {
            let next = Cell::new(current.cell.x + dx, current.cell.y + dy);
            if !map.is_walkable(next.x, next.y) {
                continue;
            }
            let Some(next_idx) = map.index(next.x, next.y) else {
                continue;
            };
            if closed[next_idx] {
                continue;
            }

            let g = current.g + 1;
            match open.iter_mut().find(|n| n.cell == next) {
                Some(node) => {
                    if g < node.g {
                        node.g = g;
                        node.f = g + manhattan(next, goal);
                        parent[next_idx] = Some(current_idx);
                    }
                }
                None => {
                    open.push(OpenNode {
                        cell: next,
                        g,
                        f: g + manhattan(next, goal),
                    });
                    parent[next_idx] = Some(current_idx);
                }
            }
        }
    }

    Vec::new()
}

fn reconstruct(map: &GameMap, parent: &[Option<usize>], start_idx: usize, goal: Cell) -> Vec<Cell> {
    let width = map.width() as usize;
    let cell_at = |idx: usize| Cell::new((idx % width) as i32, (idx / width) as i32);

    let mut path = vec![goal];
    let mut idx = goal.x as usize + goal.y as usize * width;
    while idx != start_idx {
        match parent[idx] {
            Some(prev) => {
                path.push(cell_at(prev));
                idx = prev;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Cheap revalidation of a cached path against the current map and target
pub fn path_still_valid(map: &GameMap, path: &[Cell], target: Cell) -> bool {
    match path.last() {
        Some(&last) if last == target => path.iter().all(|c| map.is_walkable(c.x, c.y)),
        _ => false,
    }
}
