// Commands that mutate simulation state.
//
// All external mutations to the simulation go through `SimCommand`. The host
// binding turns its own events (block breaks, player joins, chat commands,
// control-panel clicks) into commands and passes them to `SimState::step()`,
// which applies them in tick order. Nothing inside the sim registers
// listeners of its own.
//
// A `SimCommand` carries a `tick` (when to apply) and a `SimAction`. Actions
// fall into four groups:
// - Climate: `SetGlobalTemperature`, `CreateStaticZone`, `CreateHeatZone`,
//   `RemoveZoneAt`.
// - Generators: `CreateGenerator`, `PowerOnGenerator`, `PowerOffGenerator`,
//   `ToggleGeneratorAt`, `RemoveGenerator`.
// - World edits: `BlockRemoved`, `BlockPlaced`. The host has already changed
//   the block; these only notify generators.
// - Observers: `ObserverJoined`, `ObserverLeft`, `ObserverMoved`,
//   `ObserverDied`, `SetObserverExempt`, `SetObserverHeatSources`.
//
// See also: `sim.rs` for `apply_command()` which dispatches these,
// `event.rs` for the `CommandRejected` event a failed command produces.
//
// **Critical constraint: determinism.** Commands are the sole external input
// to the sim. Internal state changes come from scheduled tasks (see
// `event.rs`).

use crate::types::*;
use crate::zone::{HeatFalloff, TemperatureRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A host-issued command targeting a specific simulation tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimCommand {
    pub tick: u64,
    pub action: SimAction,
}

/// The specific action a command performs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimAction {
    /// Change the ambient temperature outside every zone.
    SetGlobalTemperature { temperature: f32 },
    CreateStaticZone {
        world: WorldId,
        center: WorldPos,
        radius: f32,
        rule: TemperatureRule,
    },
    CreateHeatZone {
        world: WorldId,
        center: WorldPos,
        radius: f32,
        falloff: HeatFalloff,
    },
    /// Remove every zone at exactly this center.
    RemoveZoneAt { world: WorldId, center: WorldPos },

    /// Discover a generator structure from `origin`.
    CreateGenerator { world: WorldId, origin: VoxelCoord },
    PowerOnGenerator { generator_id: GeneratorId },
    PowerOffGenerator { generator_id: GeneratorId },
    /// A control block was used.
    ToggleGeneratorAt { world: WorldId, block: VoxelCoord },
    RemoveGenerator { generator_id: GeneratorId },

    BlockRemoved { world: WorldId, block: VoxelCoord },
    BlockPlaced { world: WorldId, block: VoxelCoord },

    ObserverJoined {
        observer_id: ObserverId,
        world: WorldId,
        position: WorldPos,
    },
    ObserverLeft { observer_id: ObserverId },
    ObserverMoved {
        observer_id: ObserverId,
        world: WorldId,
        position: WorldPos,
    },
    ObserverDied { observer_id: ObserverId },
    /// Creative/spectator-style modes skip cold effects.
    SetObserverExempt { observer_id: ObserverId, exempt: bool },
    /// Heat-source materials currently near the observer.
    SetObserverHeatSources {
        observer_id: ObserverId,
        sources: BTreeSet<Material>,
    },
}
