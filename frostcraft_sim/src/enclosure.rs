// Enclosure analysis: is a point sealed off from the open world?
//
// `find_enclosure()` runs an iterative depth-first flood fill from an origin
// voxel through face-adjacent passable (air-equivalent) cells. Every
// non-passable neighbor the fill touches is recorded as a boundary material.
// The collection is a multiset: a stone block touched by three air cells
// appears three times, so the boundary size equals the room's exposed face
// count. Insulation scoring (`insulation.rs`) divides by that count.
//
// Termination:
// - If the fill pops a cell whose offset from the origin along any axis
//   reaches `max_radius`, the region is treated as open. The search stops at
//   once and the partial boundary is discarded.
// - If the stack empties first, the cavity is finite and sealed.
//
// Work is bounded by the explored volume, at most (2 * max_radius)^3 cells.
// The radius check runs on pop, before any neighbor is expanded.
//
// The fill is pure and reads the world only through `WorldAccess`, so
// `sim.rs` runs it for many observers in parallel and applies the results on
// the tick thread.
//
// See also: `world.rs` for `WorldAccess`, `insulation.rs` for scoring,
// `generator.rs` for the structure fill that shares this shape.

use crate::types::{Material, VoxelCoord};
use crate::world::WorldAccess;
use rustc_hash::FxHashSet;

/// Outcome of an enclosure search.
#[derive(Clone, Debug, PartialEq)]
pub struct EnclosureResult {
    /// Whether the origin sits in a finite cavity within the search radius.
    pub sealed: bool,
    /// Boundary materials, one entry per exposed face. Empty when not sealed.
    pub boundary: Vec<Material>,
    /// Number of passable cells visited before the search ended.
    pub cells_explored: usize,
}

impl EnclosureResult {
    fn open(cells_explored: usize) -> Self {
        Self {
            sealed: false,
            boundary: Vec::new(),
            cells_explored,
        }
    }
}

/// Flood-fill from `origin` and report whether the cavity is sealed.
///
/// `max_radius` is the per-axis exploration bound; the default config uses
/// 128. A radius of 0 always reports an open region.
pub fn find_enclosure<W: WorldAccess + ?Sized>(
    origin: VoxelCoord,
    world: &W,
    max_radius: u32,
) -> EnclosureResult {
    // Visit order is driven by the stack; the set is only used for membership.
    let mut visited: FxHashSet<VoxelCoord> = FxHashSet::default();
    let mut stack = vec![origin];
    let mut boundary = Vec::new();

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }

        if current.chebyshev_distance(origin) >= max_radius {
            return EnclosureResult::open(visited.len());
        }

        for neighbor in current.face_neighbors() {
            if visited.contains(&neighbor) {
                continue;
            }
            let material = world.block_at(neighbor);
            if world.is_passable(&material) {
                stack.push(neighbor);
            } else {
                boundary.push(material);
            }
        }
    }

    EnclosureResult {
        sealed: true,
        boundary,
        cells_explored: visited.len(),
    }
}
