// Collaborator contracts the sim consumes from the host runtime.
//
// The host (game server binding) owns players, inventories and block state.
// The sim sees it only through these narrow traits:
// - `WorldSet`: resolve a `WorldId` to something implementing `WorldAccess`.
// - `FuelStore`: per-intake fuel queries and consumption.
// - `VisualSink`: fire-and-forget "lit" flags on generator blocks.
// - `Host`: the union of the two, blanket-implemented.
//
// The scheduler contract lives in `event.rs` next to the queue that
// implements it.
//
// `InMemoryHost` implements `FuelStore` and `VisualSink` over ordered maps.
// It backs headless runs, the benches and most tests.
//
// See also: `world.rs` for `WorldAccess` and `VoxelWorld`, `sim.rs` which
// takes a `WorldSet` and a host on every `step()`.

use crate::types::{VoxelCoord, WorldId};
use crate::world::{VoxelWorld, WorldAccess};
use std::collections::BTreeMap;

/// Maps world identifiers to world accessors.
///
/// `World: Sync` because observer enclosure analysis reads worlds from
/// rayon worker threads.
pub trait WorldSet {
    type World: WorldAccess + Sync;

    fn world(&self, id: WorldId) -> Option<&Self::World>;
}

impl WorldSet for BTreeMap<WorldId, VoxelWorld> {
    type World = VoxelWorld;

    fn world(&self, id: WorldId) -> Option<&VoxelWorld> {
        self.get(&id)
    }
}

/// Fuel held by generator intake blocks.
pub trait FuelStore {
    /// Whether the intake at `intake` holds at least one fuel unit.
    fn has_fuel_unit(&self, world: WorldId, intake: VoxelCoord) -> bool;

    /// Remove up to `amount` fuel units from the intake.
    fn consume_fuel_unit(&mut self, world: WorldId, intake: VoxelCoord, amount: u32);
}

/// Visual state of blocks (furnaces glowing, campfires burning).
pub trait VisualSink {
    fn set_lit(&mut self, world: WorldId, block: VoxelCoord, lit: bool);
}

/// Everything a generator needs from the host, as one object-safe bound.
pub trait Host: FuelStore + VisualSink {}

impl<T: FuelStore + VisualSink + ?Sized> Host for T {}

/// Ordered-map host used for headless simulation and tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryHost {
    /// Fuel units per intake block.
    pub fuel: BTreeMap<(WorldId, VoxelCoord), u32>,
    /// Last lit flag written per block.
    pub lit: BTreeMap<(WorldId, VoxelCoord), bool>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `units` of fuel to an intake.
    pub fn stock_fuel(&mut self, world: WorldId, intake: VoxelCoord, units: u32) {
        *self.fuel.entry((world, intake)).or_insert(0) += units;
    }

    pub fn fuel_at(&self, world: WorldId, intake: VoxelCoord) -> u32 {
        self.fuel.get(&(world, intake)).copied().unwrap_or(0)
    }

    pub fn is_lit(&self, world: WorldId, block: VoxelCoord) -> bool {
        self.lit.get(&(world, block)).copied().unwrap_or(false)
    }
}

impl FuelStore for InMemoryHost {
    fn has_fuel_unit(&self, world: WorldId, intake: VoxelCoord) -> bool {
        self.fuel_at(world, intake) > 0
    }

    fn consume_fuel_unit(&mut self, world: WorldId, intake: VoxelCoord, amount: u32) {
        if let Some(units) = self.fuel.get_mut(&(world, intake)) {
            *units = units.saturating_sub(amount);
        }
    }
}

impl VisualSink for InMemoryHost {
    fn set_lit(&mut self, world: WorldId, block: VoxelCoord, lit: bool) {
        self.lit.insert((world, block), lit);
    }
}
