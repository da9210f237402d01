// Core simulation state and tick loop.
//
// `SimState` is the single owner of every piece of temperature state: the
// climate registry (global temperature and zones), the generator engine, the
// registered observers and the tick scheduler. Nothing is reachable through
// globals; the host holds one `SimState` and drives it with `step()`.
//
// The sim is a function of `(state, worlds, host, commands) -> (state,
// events, effect plans)`. The host's worlds are read through `WorldSet`, and
// fuel and lit flags go through `Host`. Both are borrowed for the duration of
// one `step()` call only.
//
// ## Step loop
//
// `step()` advances the clock to `target_tick`, interleaving:
//   1. commands whose tick has been reached (`apply_command`), then
//   2. scheduled tasks due at the current tick (`process_task`).
// Commands at a tick run before tasks at the same tick, so a generator
// powered on and an observer joined at tick T are both visible to tasks at T.
// A failed command is logged and reported as `CommandRejected`; it never
// aborts the step.
//
// ## Observer sweep
//
// A periodic `ObserverSweep` task checks every observer. The enclosure flood
// fills are the expensive part and only read the world, so they run in
// parallel on rayon's pool. The results are collected and applied on the
// tick thread in `ObserverId` order: target temperature, convergence,
// classification, effect plan. Zone and generator state is never touched
// from worker threads.
//
// See also: `command.rs` for the command set, `event.rs` for the scheduler
// and narrative events, `generator.rs` for the generator state machine,
// `body.rs` for the body-temperature model.
//
// **Critical constraint: determinism.** All state lives in ordered maps, the
// scheduler breaks ties by sequence number, and parallel results are applied
// in a fixed order. Identical command streams over identical worlds produce
// identical events.

use crate::body::{BodyTemperature, ColdEffects, FreezeAction, target_temperature};
use crate::climate::ClimateRegistry;
use crate::command::{SimAction, SimCommand};
use crate::config::GameConfig;
use crate::enclosure::{EnclosureResult, find_enclosure};
use crate::error::{CommandError, GeneratorError};
use crate::event::{ScheduledTask, Scheduler, SimEvent, SimEventKind, TaskHandle, TickScheduler};
use crate::generator::{GeneratorCtx, GeneratorEngine, GeneratorStatus, PowerOffReason};
use crate::host::{Host, WorldSet};
use crate::insulation::{NEUTRAL_INSULATION, enclosure_insulation, heat_from_sources};
use crate::types::*;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// A registered observer (a connected player).
#[derive(Clone, Debug)]
pub struct Observer {
    pub id: ObserverId,
    pub world: WorldId,
    pub position: WorldPos,
    /// Heat-source materials currently near the observer, as reported by the
    /// host.
    pub heat_sources: BTreeSet<Material>,
    pub body: BodyTemperature,
}

/// An effect plan produced for one observer during a sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct ObserverEffects {
    pub tick: u64,
    pub observer_id: ObserverId,
    pub effects: ColdEffects,
}

/// Enclosure analysis of a single point, with its insulation score.
#[derive(Clone, Debug, PartialEq)]
pub struct EnclosureProbe {
    pub enclosure: EnclosureResult,
    pub insulation: f32,
}

/// The result of processing commands and advancing the simulation.
#[derive(Debug, Default)]
pub struct StepResult {
    /// Narrative events emitted during this step.
    pub events: Vec<SimEvent>,
    /// Effect plans for the host to apply, in the order they were produced.
    pub effects: Vec<ObserverEffects>,
}

pub struct SimState {
    /// Current simulation tick.
    pub tick: u64,
    pub config: GameConfig,
    pub climate: ClimateRegistry,
    pub generators: GeneratorEngine,
    pub observers: BTreeMap<ObserverId, Observer>,
    pub scheduler: TickScheduler,
}

impl Default for SimState {
    fn default() -> Self {
        Self::new()
    }
}

impl SimState {
    /// Create a new simulation with the default config.
    pub fn new() -> Self {
        Self::with_config(GameConfig::default())
    }

    /// Create a new simulation with the given config. Schedules the periodic
    /// observer sweep starting at tick 0.
    pub fn with_config(config: GameConfig) -> Self {
        let mut scheduler = TickScheduler::new();
        scheduler.run_periodic(
            config.observer_check_interval_ticks,
            0,
            ScheduledTask::ObserverSweep,
        );
        Self {
            tick: 0,
            climate: ClimateRegistry::new(config.global_base_temperature),
            generators: GeneratorEngine::new(),
            observers: BTreeMap::new(),
            scheduler,
            config,
        }
    }

    /// Apply a batch of commands and advance the sim to the target tick,
    /// processing all scheduled tasks up to that point.
    ///
    /// Commands must be sorted by tick. Commands with tick > `target_tick`
    /// are ignored (caller error). Commands at or before the current tick
    /// apply at the current tick, even when `target_tick` does not move the
    /// clock forward. The clock never moves backward.
    pub fn step<S: WorldSet, H: Host>(
        &mut self,
        worlds: &S,
        host: &mut H,
        commands: &[SimCommand],
        target_tick: u64,
    ) -> StepResult {
        let mut out = StepResult::default();

        // Index into the sorted command slice.
        let mut cmd_idx = 0;

        while self.tick < target_tick {
            // The next thing to process: the next scheduled task or the next
            // command, whichever comes first.
            let next_task_tick = self.scheduler.peek_tick();
            let next_cmd_tick = commands
                .get(cmd_idx)
                .filter(|c| c.tick <= target_tick)
                .map(|c| c.tick);

            let next_tick = match (next_task_tick, next_cmd_tick) {
                (Some(tt), Some(ct)) => tt.min(ct).min(target_tick),
                (Some(tt), None) => tt.min(target_tick),
                (None, Some(ct)) => ct.min(target_tick),
                (None, None) => target_tick,
            };

            self.tick = self.tick.max(next_tick);
            self.scheduler.advance_to(self.tick);

            self.apply_due_commands(worlds, host, commands, &mut cmd_idx, &mut out);

            while let Some((handle, task)) = self.scheduler.pop_if_ready(self.tick) {
                self.process_task(worlds, host, handle, task, &mut out);
            }
        }

        // Commands at the current tick when the clock did not advance.
        self.apply_due_commands(worlds, host, commands, &mut cmd_idx, &mut out);

        self.tick = self.tick.max(target_tick);
        out
    }

    /// Apply every command from `commands[*cmd_idx..]` whose tick has been
    /// reached. Failures are logged and reported as `CommandRejected`.
    fn apply_due_commands<S: WorldSet, H: Host>(
        &mut self,
        worlds: &S,
        host: &mut H,
        commands: &[SimCommand],
        cmd_idx: &mut usize,
        out: &mut StepResult,
    ) {
        while let Some(cmd) = commands.get(*cmd_idx).filter(|c| c.tick <= self.tick) {
            *cmd_idx += 1;
            if let Err(err) = self.apply_command(worlds, host, cmd, out) {
                log::warn!("tick {}: rejected {:?}: {err}", self.tick, cmd.action);
                out.events.push(SimEvent {
                    tick: self.tick,
                    kind: SimEventKind::CommandRejected {
                        reason: err.to_string(),
                    },
                });
            }
        }
    }

    /// Run `f` against the generator engine with a context borrowing the rest
    /// of the sim.
    fn with_generators<R>(
        &mut self,
        host: &mut dyn Host,
        events: &mut Vec<SimEvent>,
        f: impl FnOnce(&mut GeneratorEngine, &mut GeneratorCtx<'_>) -> R,
    ) -> R {
        let mut ctx = GeneratorCtx {
            tick: self.tick,
            config: &self.config.generator,
            climate: &mut self.climate,
            host,
            scheduler: &mut self.scheduler,
            events,
        };
        f(&mut self.generators, &mut ctx)
    }

    fn observer_mut(&mut self, id: ObserverId) -> Result<&mut Observer, CommandError> {
        self.observers
            .get_mut(&id)
            .ok_or(CommandError::UnknownObserver(id))
    }

    /// Apply a single command to the simulation.
    fn apply_command<S: WorldSet, H: Host>(
        &mut self,
        worlds: &S,
        host: &mut H,
        cmd: &SimCommand,
        out: &mut StepResult,
    ) -> Result<(), CommandError> {
        let tick = self.tick;
        let events = &mut out.events;
        let emit = |events: &mut Vec<SimEvent>, kind| events.push(SimEvent { tick, kind });

        match &cmd.action {
            SimAction::SetGlobalTemperature { temperature } => {
                self.climate.update_global_temperature(*temperature);
                emit(events, SimEventKind::GlobalTemperatureChanged {
                    temperature: *temperature,
                });
            }
            SimAction::CreateStaticZone {
                world,
                center,
                radius,
                rule,
            } => {
                self.climate.create_static_zone(*world, *center, *radius, *rule);
                emit(events, SimEventKind::ZoneAdded {
                    world: *world,
                    center: *center,
                    radius: *radius,
                });
            }
            SimAction::CreateHeatZone {
                world,
                center,
                radius,
                falloff,
            } => {
                self.climate.create_heat_zone(*world, *center, *radius, *falloff);
                emit(events, SimEventKind::ZoneAdded {
                    world: *world,
                    center: *center,
                    radius: *radius,
                });
            }
            SimAction::RemoveZoneAt { world, center } => {
                let count = self.climate.remove_zone_at(*world, *center);
                emit(events, SimEventKind::ZoneRemoved {
                    world: *world,
                    center: *center,
                    count,
                });
            }

            SimAction::CreateGenerator { world, origin } => {
                let access = worlds
                    .world(*world)
                    .ok_or(GeneratorError::UnknownWorld(*world))?;
                let generator_id =
                    self.generators
                        .create(access, *world, *origin, &self.config.generator)?;
                let blocks = self
                    .generators
                    .get(generator_id)
                    .map_or(0, |g| g.block_count());
                emit(events, SimEventKind::GeneratorCreated {
                    generator_id,
                    world: *world,
                    origin: *origin,
                    blocks,
                });
            }
            SimAction::PowerOnGenerator { generator_id } => {
                self.with_generators(host, events, |g, ctx| g.power_on(*generator_id, ctx))?;
            }
            SimAction::PowerOffGenerator { generator_id } => {
                self.with_generators(host, events, |g, ctx| {
                    g.power_off(*generator_id, PowerOffReason::Manual, ctx)
                })?;
            }
            SimAction::ToggleGeneratorAt { world, block } => {
                self.with_generators(host, events, |g, ctx| g.toggle_at(*world, *block, ctx))?;
            }
            SimAction::RemoveGenerator { generator_id } => {
                self.with_generators(host, events, |g, ctx| g.remove(*generator_id, ctx))?;
            }

            SimAction::BlockRemoved { world, block } => {
                self.with_generators(host, events, |g, ctx| {
                    g.on_block_removed(*world, *block, ctx)
                });
            }
            SimAction::BlockPlaced { world, block } => {
                let access = worlds
                    .world(*world)
                    .ok_or(GeneratorError::UnknownWorld(*world))?;
                self.with_generators(host, events, |g, ctx| {
                    g.on_block_placed(access, *world, *block, ctx)
                });
            }

            SimAction::ObserverJoined {
                observer_id,
                world,
                position,
            } => {
                if self.observers.contains_key(observer_id) {
                    return Err(CommandError::DuplicateObserver(*observer_id));
                }
                log::debug!("observer {observer_id} joined {world} at {position}");
                self.observers.insert(*observer_id, Observer {
                    id: *observer_id,
                    world: *world,
                    position: *position,
                    heat_sources: BTreeSet::new(),
                    body: BodyTemperature::new(&self.config.body),
                });
            }
            SimAction::ObserverLeft { observer_id } => {
                self.observers
                    .remove(observer_id)
                    .ok_or(CommandError::UnknownObserver(*observer_id))?;
                log::debug!("observer {observer_id} left");
            }
            SimAction::ObserverMoved {
                observer_id,
                world,
                position,
            } => {
                let observer = self.observer_mut(*observer_id)?;
                observer.world = *world;
                observer.position = *position;
            }
            SimAction::ObserverDied { observer_id } => {
                let from_cold = self.observer_mut(*observer_id)?.body.on_death();
                emit(events, SimEventKind::ObserverDied {
                    observer_id: *observer_id,
                    from_cold,
                });
            }
            SimAction::SetObserverExempt {
                observer_id,
                exempt,
            } => {
                let observer = self.observer_mut(*observer_id)?;
                if observer.body.set_exempt(*exempt) == FreezeAction::Unfreeze {
                    out.effects.push(ObserverEffects {
                        tick,
                        observer_id: *observer_id,
                        effects: ColdEffects {
                            freeze: FreezeAction::Unfreeze,
                            ..ColdEffects::default()
                        },
                    });
                }
            }
            SimAction::SetObserverHeatSources {
                observer_id,
                sources,
            } => {
                self.observer_mut(*observer_id)?.heat_sources = sources.clone();
            }
        }
        Ok(())
    }

    /// Run one scheduled task.
    fn process_task<S: WorldSet, H: Host>(
        &mut self,
        worlds: &S,
        host: &mut H,
        handle: TaskHandle,
        task: ScheduledTask,
        out: &mut StepResult,
    ) {
        match task {
            ScheduledTask::GeneratorStep { generator_id } => {
                let result =
                    self.with_generators(host, &mut out.events, |g, ctx| g.step(generator_id, ctx));
                if let Err(err) = result {
                    log::warn!("dropping step task for {generator_id}: {err}");
                    self.scheduler.cancel(handle);
                }
            }
            ScheduledTask::ObserverSweep => self.sweep_observers(worlds, out),
        }
    }

    /// Check every observer: parallel enclosure analysis, then sequential
    /// temperature updates.
    fn sweep_observers<S: WorldSet>(&mut self, worlds: &S, out: &mut StepResult) {
        let radius = self.config.enclosure.max_radius;
        let jobs: Vec<(ObserverId, &S::World, VoxelCoord)> = self
            .observers
            .values()
            .filter_map(|o| worlds.world(o.world).map(|w| (o.id, w, o.position.to_voxel())))
            .collect();

        let enclosures: BTreeMap<ObserverId, EnclosureResult> = jobs
            .into_par_iter()
            .map(|(id, world, origin)| (id, find_enclosure(origin, world, radius)))
            .collect();

        for observer in self.observers.values_mut() {
            let insulation = match enclosures.get(&observer.id) {
                Some(result) => {
                    log::debug!(
                        "observer {}: sealed={} boundary={} explored={}",
                        observer.id,
                        result.sealed,
                        result.boundary.len(),
                        result.cells_explored
                    );
                    enclosure_insulation(result, &self.config.insulation)
                }
                None => NEUTRAL_INSULATION,
            };
            let heat = heat_from_sources(&observer.heat_sources, &self.config.insulation);
            let zone_temperature = self.climate.temperature_at(observer.world, observer.position);
            let target = target_temperature(insulation, heat, zone_temperature);

            let previous = observer.body.update(target, &self.config.body);
            if previous != observer.body.state {
                out.events.push(SimEvent {
                    tick: self.tick,
                    kind: SimEventKind::ObserverStateChanged {
                        observer_id: observer.id,
                        from: previous,
                        to: observer.body.state,
                    },
                });
            }

            out.effects.push(ObserverEffects {
                tick: self.tick,
                observer_id: observer.id,
                effects: observer.body.effect_plan(&self.config.body),
            });
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn observer(&self, id: ObserverId) -> Option<&Observer> {
        self.observers.get(&id)
    }

    pub fn generator_status(&self, id: GeneratorId) -> Option<GeneratorStatus> {
        self.generators.status(id, &self.config.generator)
    }

    /// Enclosure and insulation at `position`. `None` for an unknown world.
    pub fn probe_enclosure<S: WorldSet>(
        &self,
        worlds: &S,
        world: WorldId,
        position: WorldPos,
    ) -> Option<EnclosureProbe> {
        let access = worlds.world(world)?;
        let radius = self.config.enclosure.max_radius;
        let enclosure = find_enclosure(position.to_voxel(), access, radius);
        let insulation = enclosure_insulation(&enclosure, &self.config.insulation);
        Some(EnclosureProbe {
            enclosure,
            insulation,
        })
    }

    /// The temperature an observer standing at `position` would converge to,
    /// ignoring nearby heat sources. An unknown world counts as unsealed.
    pub fn environment_temperature<S: WorldSet>(
        &self,
        worlds: &S,
        world: WorldId,
        position: WorldPos,
    ) -> f32 {
        let insulation = self
            .probe_enclosure(worlds, world, position)
            .map_or(NEUTRAL_INSULATION, |p| p.insulation);
        target_temperature(insulation, 0.0, self.climate.temperature_at(world, position))
    }
}
