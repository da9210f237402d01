// frostcraft_sim: pure Rust temperature simulation library.
//
// This crate contains all temperature logic for FrostCraft: the climate
// registry (global temperature plus static and heat zones), enclosure and
// insulation analysis, heat generators, observer body temperature, the tick
// scheduler and the command interface. It has no game-server dependencies
// and can be tested, benchmarked and run headless against `VoxelWorld` and
// `InMemoryHost`.
//
// Module overview:
// - `sim.rs`:        Top-level SimState, tick loop, command dispatch, observer sweep.
// - `types.rs`:      VoxelCoord, WorldPos, Material, world/observer/generator IDs.
// - `world.rs`:      WorldAccess trait + dense VoxelWorld used headless.
// - `host.rs`:       WorldSet, FuelStore, VisualSink, Host + InMemoryHost.
// - `enclosure.rs`:  Bounded flood fill deciding whether a point is sealed in.
// - `insulation.rs`: Boundary-material insulation and heat-source scoring.
// - `zone.rs`:       Static climate zones and distance-attenuated heat zones.
// - `climate.rs`:    ClimateRegistry: global temperature, zone list, point queries.
// - `generator.rs`:  Generator structure discovery, power state machine, steps.
// - `body.rs`:       Observer body temperature, classification, effect plans.
// - `event.rs`:      TickScheduler (priority queue) + narrative SimEvents.
// - `command.rs`:    SimCommand / SimAction, all sim mutations.
// - `config.rs`:     GameConfig and its nested sections, loaded from JSON.
// - `error.rs`:      Error types for config loading, generators and commands.
//
// The game-server binding wraps this library: it translates server events
// into `SimCommand`s, implements `WorldSet` and `Host` over live worlds, and
// applies the returned effect plans to players.
//
// **Critical constraint: determinism.** The simulation is a pure function:
// `(state, worlds, host, commands) -> (new_state, events, effects)`. No
// `HashMap` iteration affects output, no system time, no randomness. Use
// `BTreeMap` for ordered collections.

pub mod body;
pub mod climate;
pub mod command;
pub mod config;
pub mod enclosure;
pub mod error;
pub mod event;
pub mod generator;
pub mod host;
pub mod insulation;
pub mod sim;
pub mod types;
pub mod world;
pub mod zone;
