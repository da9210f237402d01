// Generator engine: multi-block heat generators and their power state machine.
//
// A generator is a contiguous structure of role blocks discovered by a flood
// fill from a single origin block. The fill has the same shape as the
// enclosure search (`enclosure.rs`) but walks *solid* blocks: each visited
// block is classified into the first matching `StructureRole` bucket, in the
// order heat, control, structure, dissipation, exhaust, intake. A block that
// matches no bucket is not part of the structure and the fill does not
// continue through it. There is no distance bound; contiguity ends the fill.
//
// Role counts drive every derived quantity:
//
//   max heat   = heat_blocks * heat_block_heat + exhaust_blocks * exhaust_heat
//   stress     = max(0, dissipation * dissipation_stress - control * relief)
//   range      = base_heat_range + dissipation * dissipation_block_range
//   durability = structure_blocks * structure_block_durability
//
// ## Power state machine
//
//   OFF --power_on--> ON     needs control, heat and intake blocks, and fuel
//   ON  --power_off-> OFF    manual, fuel exhausted, structure invalid
//
// Powering on registers a `HeatZone` (inverse-square falloff, magnitude =
// current heat, radius = range) at the origin, lights heat and exhaust
// blocks, sets the target heat to the role-derived maximum and starts a
// periodic step task if none is running. Powering off removes the zone,
// clears the lit flags and sets the target to 0. Generator zones are
// removed by owner, never by center, so other zones at the origin stay. The step task keeps running
// while OFF so heat decays gradually; it cancels itself once heat reaches 0.
//
// Each step (`step()`):
//   1. If ON, consume fuel from the first intake (discovery order) holding
//      any. With no fuel anywhere, power off (`FuelExhausted`).
//   2. Move heat toward the target by at most `heat_step`, snapping exactly
//      onto the target when the gap is smaller than a step.
//   3. If ON, re-register the zone with the current heat and range.
//   4. If OFF and heat is 0, cancel the step task.
//
// Creation is atomic: a structure lacking a required role is rejected and
// nothing is registered. A generator whose structure later becomes invalid
// stays registered (OFF) and can be powered on again once repaired.
//
// See also: `climate.rs` for the zone registry, `host.rs` for the fuel and
// visual contracts, `event.rs` for the scheduler, `sim.rs` which dispatches
// commands and step tasks here.
//
// **Critical constraint: determinism.** Generators live in a `BTreeMap` by
// id, structure blocks in a `BTreeMap` by coordinate, and intakes in a `Vec`
// in discovery order so fuel is always drawn from the same chest.

use crate::climate::ClimateRegistry;
use crate::config::GeneratorConfig;
use crate::error::GeneratorError;
use crate::event::{ScheduledTask, Scheduler, SimEvent, SimEventKind, TaskHandle};
use crate::host::{FuelStore, Host};
use crate::types::*;
use crate::world::WorldAccess;
use crate::zone::{HeatFalloff, HeatZone};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Roles and states
// ---------------------------------------------------------------------------

/// Functional role of a structure block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StructureRole {
    Heat,
    Control,
    Structure,
    Dissipation,
    Exhaust,
    Intake,
}

impl StructureRole {
    /// Classification order: the first bucket whose material set matches wins.
    pub const ALL: [StructureRole; 6] = [
        StructureRole::Heat,
        StructureRole::Control,
        StructureRole::Structure,
        StructureRole::Dissipation,
        StructureRole::Exhaust,
        StructureRole::Intake,
    ];

    /// Roles a structure must contain to run.
    pub const REQUIRED: [StructureRole; 3] = [
        StructureRole::Control,
        StructureRole::Heat,
        StructureRole::Intake,
    ];

    pub fn classify(material: &Material, config: &GeneratorConfig) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role_materials(config, *role).contains(material))
    }
}

fn role_materials(config: &GeneratorConfig, role: StructureRole) -> &BTreeSet<Material> {
    match role {
        StructureRole::Heat => &config.heat_blocks,
        StructureRole::Control => &config.control_blocks,
        StructureRole::Structure => &config.structure_blocks,
        StructureRole::Dissipation => &config.dissipation_blocks,
        StructureRole::Exhaust => &config.exhaust_blocks,
        StructureRole::Intake => &config.intake_blocks,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratorPowerState {
    On,
    Off,
}

/// Why a generator went from ON to OFF.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerOffReason {
    /// Toggled off at the control panel or by command.
    Manual,
    /// A step found no fuel in any intake.
    FuelExhausted,
    /// A block removal left the structure without a required role.
    StructureInvalid,
    /// The generator was unregistered while running.
    Removed,
}

/// Number of structure blocks per role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    pub heat: usize,
    pub control: usize,
    pub structure: usize,
    pub dissipation: usize,
    pub exhaust: usize,
    pub intake: usize,
}

impl RoleCounts {
    pub fn get(&self, role: StructureRole) -> usize {
        match role {
            StructureRole::Heat => self.heat,
            StructureRole::Control => self.control,
            StructureRole::Structure => self.structure,
            StructureRole::Dissipation => self.dissipation,
            StructureRole::Exhaust => self.exhaust,
            StructureRole::Intake => self.intake,
        }
    }

    fn bump(&mut self, role: StructureRole) {
        let slot = match role {
            StructureRole::Heat => &mut self.heat,
            StructureRole::Control => &mut self.control,
            StructureRole::Structure => &mut self.structure,
            StructureRole::Dissipation => &mut self.dissipation,
            StructureRole::Exhaust => &mut self.exhaust,
            StructureRole::Intake => &mut self.intake,
        };
        *slot += 1;
    }
}

/// Move `current` toward `target` by at most `step`, never overshooting.
pub fn converge_heat(current: f32, target: f32, step: f32) -> f32 {
    let gap = target - current;
    if gap.abs() <= step {
        target
    } else {
        current + step.copysign(gap)
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// A discovered generator structure and its running state.
#[derive(Clone, Debug)]
pub struct Generator {
    pub id: GeneratorId,
    pub world: WorldId,
    /// The block discovery started from. Also the heat zone center.
    pub origin: VoxelCoord,
    blocks: BTreeMap<VoxelCoord, StructureRole>,
    /// Intake blocks in discovery order; later-placed intakes are appended.
    intakes: Vec<VoxelCoord>,
    pub state: GeneratorPowerState,
    pub heat: f32,
    pub target_heat: f32,
    pub stress: f32,
    pub range: f32,
    pub durability: f32,
    step_handle: Option<TaskHandle>,
}

impl Generator {
    /// Flood-fill the structure from `origin` and classify its blocks.
    fn discover<W: WorldAccess + ?Sized>(
        world: &W,
        origin: VoxelCoord,
        config: &GeneratorConfig,
    ) -> (BTreeMap<VoxelCoord, StructureRole>, Vec<VoxelCoord>) {
        let mut visited: FxHashSet<VoxelCoord> = FxHashSet::default();
        let mut stack = vec![origin];
        let mut blocks = BTreeMap::new();
        let mut intakes = Vec::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(role) = StructureRole::classify(&world.block_at(current), config) else {
                continue;
            };
            blocks.insert(current, role);
            if role == StructureRole::Intake {
                intakes.push(current);
            }
            for neighbor in current.face_neighbors() {
                if !visited.contains(&neighbor) {
                    stack.push(neighbor);
                }
            }
        }

        (blocks, intakes)
    }

    pub fn is_on(&self) -> bool {
        self.state == GeneratorPowerState::On
    }

    pub fn contains(&self, block: VoxelCoord) -> bool {
        self.blocks.contains_key(&block)
    }

    pub fn role_of(&self, block: VoxelCoord) -> Option<StructureRole> {
        self.blocks.get(&block).copied()
    }

    pub fn blocks_with_role(&self, role: StructureRole) -> impl Iterator<Item = VoxelCoord> + '_ {
        self.blocks
            .iter()
            .filter(move |&(_, r)| *r == role)
            .map(|(&c, _)| c)
    }

    pub fn intakes(&self) -> &[VoxelCoord] {
        &self.intakes
    }

    /// Total number of structure blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn step_handle(&self) -> Option<TaskHandle> {
        self.step_handle
    }

    pub fn role_counts(&self) -> RoleCounts {
        let mut counts = RoleCounts::default();
        for &role in self.blocks.values() {
            counts.bump(role);
        }
        counts
    }

    /// Required roles the structure currently lacks, in `REQUIRED` order.
    pub fn missing_roles(&self) -> SmallVec<[StructureRole; 3]> {
        let counts = self.role_counts();
        StructureRole::REQUIRED
            .into_iter()
            .filter(|role| counts.get(*role) == 0)
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.missing_roles().is_empty()
    }

    /// The role-derived heat ceiling.
    pub fn max_heat(&self, config: &GeneratorConfig) -> f32 {
        let counts = self.role_counts();
        counts.heat as f32 * config.heat_block_heat + counts.exhaust as f32 * config.exhaust_heat
    }

    /// Where the heat zone is registered.
    pub fn zone_center(&self) -> WorldPos {
        self.origin.to_world_pos()
    }

    fn recompute(&mut self, config: &GeneratorConfig) {
        let counts = self.role_counts();
        let dissipation = counts.dissipation as f32;
        self.stress = (dissipation * config.dissipation_block_stress
            - counts.control as f32 * config.control_block_stress_relief)
            .max(0.0);
        self.range = config.base_heat_range + dissipation * config.dissipation_block_range;
        self.durability = counts.structure as f32 * config.structure_block_durability;
        self.target_heat = if self.is_on() { self.max_heat(config) } else { 0.0 };
    }

    fn first_fueled_intake<F: FuelStore + ?Sized>(&self, fuel: &F) -> Option<VoxelCoord> {
        self.intakes
            .iter()
            .copied()
            .find(|&intake| fuel.has_fuel_unit(self.world, intake))
    }

    fn set_lit(&self, host: &mut dyn Host, lit: bool) {
        for (&block, &role) in &self.blocks {
            if matches!(role, StructureRole::Heat | StructureRole::Exhaust) {
                host.set_lit(self.world, block, lit);
            }
        }
    }

    fn register_zone(&self, climate: &mut ClimateRegistry) {
        let falloff = HeatFalloff::InverseSquare {
            magnitude: self.heat,
        };
        climate.add_zone(
            HeatZone::new(self.world, self.zone_center(), self.range, falloff).owned_by(self.id),
        );
    }

    /// ON -> OFF. Callers check the state first.
    fn switch_off(&mut self, reason: PowerOffReason, ctx: &mut GeneratorCtx<'_>) {
        self.state = GeneratorPowerState::Off;
        self.recompute(ctx.config);
        let removed = ctx.climate.remove_zones_owned_by(self.id);
        self.set_lit(ctx.host, false);
        log::info!("generator {} powered off ({reason:?})", self.id);
        ctx.emit(SimEventKind::GeneratorPoweredOff {
            generator_id: self.id,
            reason,
        });
        ctx.emit(SimEventKind::ZoneRemoved {
            world: self.world,
            center: self.zone_center(),
            count: removed,
        });
    }
}

/// Read-only snapshot of a generator for status displays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratorStatus {
    pub id: GeneratorId,
    pub state: GeneratorPowerState,
    pub heat: f32,
    pub target_heat: f32,
    pub max_heat: f32,
    pub stress: f32,
    pub range: f32,
    pub durability: f32,
    /// Fuel units drawn per step; 0 while OFF.
    pub fuel_consumption: u32,
    pub counts: RoleCounts,
    pub missing: SmallVec<[StructureRole; 3]>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The collaborators a generator operation touches, borrowed for one call.
pub struct GeneratorCtx<'a> {
    pub tick: u64,
    pub config: &'a GeneratorConfig,
    pub climate: &'a mut ClimateRegistry,
    pub host: &'a mut dyn Host,
    pub scheduler: &'a mut dyn Scheduler,
    pub events: &'a mut Vec<SimEvent>,
}

impl GeneratorCtx<'_> {
    fn emit(&mut self, kind: SimEventKind) {
        self.events.push(SimEvent {
            tick: self.tick,
            kind,
        });
    }
}

/// All registered generators.
#[derive(Clone, Debug, Default)]
pub struct GeneratorEngine {
    generators: BTreeMap<GeneratorId, Generator>,
    next_id: u32,
}

impl GeneratorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: GeneratorId) -> Option<&Generator> {
        self.generators.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Generator> {
        self.generators.values()
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// The generator in `world` whose structure includes `block`.
    pub fn generator_at(&self, world: WorldId, block: VoxelCoord) -> Option<GeneratorId> {
        self.generators
            .values()
            .find(|g| g.world == world && g.contains(block))
            .map(|g| g.id)
    }

    fn get_mut(&mut self, id: GeneratorId) -> Result<&mut Generator, GeneratorError> {
        self.generators
            .get_mut(&id)
            .ok_or(GeneratorError::UnknownGenerator(id))
    }

    /// Discover a structure from `origin` and register it, powered off.
    pub fn create<W: WorldAccess + ?Sized>(
        &mut self,
        world: &W,
        world_id: WorldId,
        origin: VoxelCoord,
        config: &GeneratorConfig,
    ) -> Result<GeneratorId, GeneratorError> {
        if let Some(existing) = self.generator_at(world_id, origin) {
            return Err(GeneratorError::AlreadyRegistered(existing));
        }

        let (blocks, intakes) = Generator::discover(world, origin, config);
        let mut generator = Generator {
            id: GeneratorId(self.next_id),
            world: world_id,
            origin,
            blocks,
            intakes,
            state: GeneratorPowerState::Off,
            heat: 0.0,
            target_heat: 0.0,
            stress: 0.0,
            range: 0.0,
            durability: 0.0,
            step_handle: None,
        };
        let missing = generator.missing_roles();
        if !missing.is_empty() {
            return Err(GeneratorError::InvalidStructure { missing });
        }

        generator.recompute(config);
        let id = generator.id;
        self.next_id += 1;
        log::info!(
            "generator {id} created at {origin} in {world_id} ({} blocks)",
            generator.block_count()
        );
        self.generators.insert(id, generator);
        Ok(id)
    }

    /// OFF -> ON. Idempotent on a running generator.
    pub fn power_on(
        &mut self,
        id: GeneratorId,
        ctx: &mut GeneratorCtx<'_>,
    ) -> Result<(), GeneratorError> {
        let generator = self.get_mut(id)?;
        if generator.is_on() {
            return Ok(());
        }
        let missing = generator.missing_roles();
        if !missing.is_empty() {
            return Err(GeneratorError::InvalidStructure { missing });
        }
        if generator.first_fueled_intake(&*ctx.host).is_none() {
            return Err(GeneratorError::NoFuel);
        }

        generator.state = GeneratorPowerState::On;
        generator.recompute(ctx.config);
        generator.register_zone(ctx.climate);
        generator.set_lit(ctx.host, true);
        if generator.step_handle.is_none() {
            generator.step_handle = Some(ctx.scheduler.run_periodic(
                ctx.config.step_interval_ticks,
                ctx.config.step_start_delay_ticks,
                ScheduledTask::GeneratorStep { generator_id: id },
            ));
        }

        log::info!(
            "generator {id} powered on (target heat {}, range {})",
            generator.target_heat,
            generator.range
        );
        let (world, center, radius) = (generator.world, generator.zone_center(), generator.range);
        ctx.emit(SimEventKind::GeneratorPoweredOn { generator_id: id });
        ctx.emit(SimEventKind::ZoneAdded {
            world,
            center,
            radius,
        });
        Ok(())
    }

    /// ON -> OFF. A no-op on a generator that is already off.
    pub fn power_off(
        &mut self,
        id: GeneratorId,
        reason: PowerOffReason,
        ctx: &mut GeneratorCtx<'_>,
    ) -> Result<(), GeneratorError> {
        let generator = self.get_mut(id)?;
        if generator.is_on() {
            generator.switch_off(reason, ctx);
        }
        Ok(())
    }

    /// One periodic step. See the module header for the sequence.
    pub fn step(
        &mut self,
        id: GeneratorId,
        ctx: &mut GeneratorCtx<'_>,
    ) -> Result<(), GeneratorError> {
        let generator = self.get_mut(id)?;
        let config = ctx.config;

        if generator.is_on() {
            match generator.first_fueled_intake(&*ctx.host) {
                Some(intake) => {
                    ctx.host
                        .consume_fuel_unit(generator.world, intake, config.fuel_per_step);
                }
                None => generator.switch_off(PowerOffReason::FuelExhausted, ctx),
            }
        }

        generator.recompute(config);
        generator.heat = converge_heat(generator.heat, generator.target_heat, config.heat_step);

        if generator.is_on() {
            ctx.climate.remove_zones_owned_by(id);
            generator.register_zone(ctx.climate);
        } else if generator.heat == 0.0 {
            if let Some(handle) = generator.step_handle.take() {
                ctx.scheduler.cancel(handle);
                log::debug!("generator {id} cooled down; step task cancelled");
            }
        }
        Ok(())
    }

    /// React to a block leaving the world. Returns the generators that lost
    /// a block; any that were running and became invalid are powered off.
    pub fn on_block_removed(
        &mut self,
        world: WorldId,
        block: VoxelCoord,
        ctx: &mut GeneratorCtx<'_>,
    ) -> Vec<GeneratorId> {
        let mut affected = Vec::new();
        for generator in self.generators.values_mut() {
            if generator.world != world {
                continue;
            }
            let Some(role) = generator.blocks.remove(&block) else {
                continue;
            };
            if role == StructureRole::Intake {
                generator.intakes.retain(|&i| i != block);
            }
            generator.recompute(ctx.config);
            if generator.is_on() && !generator.is_valid() {
                generator.switch_off(PowerOffReason::StructureInvalid, ctx);
            }
            affected.push(generator.id);
        }
        affected
    }

    /// React to a block being placed. A role block face-adjacent to a
    /// generator's structure joins it. Returns the generator that grew.
    pub fn on_block_placed<W: WorldAccess + ?Sized>(
        &mut self,
        world: &W,
        world_id: WorldId,
        block: VoxelCoord,
        ctx: &mut GeneratorCtx<'_>,
    ) -> Option<GeneratorId> {
        let role = StructureRole::classify(&world.block_at(block), ctx.config)?;
        let generator = self.generators.values_mut().find(|g| {
            g.world == world_id
                && !g.contains(block)
                && block.face_neighbors().iter().any(|n| g.contains(*n))
        })?;

        generator.blocks.insert(block, role);
        if role == StructureRole::Intake {
            generator.intakes.push(block);
        }
        generator.recompute(ctx.config);
        if generator.is_on() && matches!(role, StructureRole::Heat | StructureRole::Exhaust) {
            ctx.host.set_lit(world_id, block, true);
        }
        log::debug!("generator {} grew by {role:?} at {block}", generator.id);
        Some(generator.id)
    }

    /// Control-panel interaction: flip the power of the generator owning the
    /// control block at `block`.
    pub fn toggle_at(
        &mut self,
        world: WorldId,
        block: VoxelCoord,
        ctx: &mut GeneratorCtx<'_>,
    ) -> Result<GeneratorId, GeneratorError> {
        let id = self
            .generators
            .values()
            .find(|g| g.world == world && g.role_of(block) == Some(StructureRole::Control))
            .map(|g| g.id)
            .ok_or(GeneratorError::NotAControlBlock { world, block })?;

        let on = self.get(id).is_some_and(Generator::is_on);
        if on {
            self.power_off(id, PowerOffReason::Manual, ctx)?;
        } else {
            self.power_on(id, ctx)?;
        }
        Ok(id)
    }

    /// Unregister a generator, powering it off and stopping its step task.
    pub fn remove(
        &mut self,
        id: GeneratorId,
        ctx: &mut GeneratorCtx<'_>,
    ) -> Result<(), GeneratorError> {
        let mut generator = self
            .generators
            .remove(&id)
            .ok_or(GeneratorError::UnknownGenerator(id))?;
        if generator.is_on() {
            generator.switch_off(PowerOffReason::Removed, ctx);
        }
        if let Some(handle) = generator.step_handle.take() {
            ctx.scheduler.cancel(handle);
        }
        log::info!("generator {id} removed");
        ctx.emit(SimEventKind::GeneratorRemoved { generator_id: id });
        Ok(())
    }

    pub fn status(&self, id: GeneratorId, config: &GeneratorConfig) -> Option<GeneratorStatus> {
        let g = self.generators.get(&id)?;
        Some(GeneratorStatus {
            id,
            state: g.state,
            heat: g.heat,
            target_heat: g.target_heat,
            max_heat: g.max_heat(config),
            stress: g.stress,
            range: g.range,
            durability: g.durability,
            fuel_consumption: if g.is_on() { config.fuel_per_step } else { 0 },
            counts: g.role_counts(),
            missing: g.missing_roles(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TickScheduler;
    use crate::host::InMemoryHost;
    use crate::world::VoxelWorld;

    const W: WorldId = WorldId(0);
    const CONTROL: VoxelCoord = VoxelCoord::new(0, 0, 0);
    const FURNACE: VoxelCoord = VoxelCoord::new(1, 0, 0);
    const CHEST: VoxelCoord = VoxelCoord::new(2, 0, 0);
    const CAMPFIRE: VoxelCoord = VoxelCoord::new(3, 0, 0);
    const DISPENSER: VoxelCoord = VoxelCoord::new(0, 1, 0);
    const IRON: VoxelCoord = VoxelCoord::new(0, -1, 0);

    struct Fixture {
        world: VoxelWorld,
        config: GeneratorConfig,
        climate: ClimateRegistry,
        host: InMemoryHost,
        scheduler: TickScheduler,
        events: Vec<SimEvent>,
    }

    impl Fixture {
        /// control, heat, intake, exhaust in a row; dissipation above the
        /// control block, structure below it.
        fn new() -> Self {
            let mut world = VoxelWorld::new(VoxelCoord::new(-8, -8, -8), 16, 16, 16);
            world.set(CONTROL, "redstone_block");
            world.set(FURNACE, "furnace");
            world.set(CHEST, "chest");
            world.set(CAMPFIRE, "campfire");
            world.set(DISPENSER, "dispenser");
            world.set(IRON, "iron_block");
            Self {
                world,
                config: GeneratorConfig::default(),
                climate: ClimateRegistry::new(0.0),
                host: InMemoryHost::new(),
                scheduler: TickScheduler::new(),
                events: Vec::new(),
            }
        }

        fn ctx(&mut self) -> GeneratorCtx<'_> {
            GeneratorCtx {
                tick: self.scheduler.now(),
                config: &self.config,
                climate: &mut self.climate,
                host: &mut self.host,
                scheduler: &mut self.scheduler,
                events: &mut self.events,
            }
        }

        fn create(&self, engine: &mut GeneratorEngine) -> GeneratorId {
            engine.create(&self.world, W, CONTROL, &self.config).unwrap()
        }

        fn zone_temp(&self) -> f32 {
            self.climate.temperature_at(W, CONTROL.to_world_pos())
        }
    }

    #[test]
    fn discovery_classifies_roles() {
        let f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        let g = engine.get(id).unwrap();
        assert_eq!(g.block_count(), 6);
        assert_eq!(g.role_of(CONTROL), Some(StructureRole::Control));
        assert_eq!(g.role_of(CAMPFIRE), Some(StructureRole::Exhaust));
        assert_eq!(g.role_of(IRON), Some(StructureRole::Structure));
        assert_eq!(g.intakes(), &[CHEST]);
        assert_eq!(g.state, GeneratorPowerState::Off);
    }

    #[test]
    fn derived_quantities_follow_role_counts() {
        let f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        let g = engine.get(id).unwrap();
        assert_eq!(g.max_heat(&f.config), 75.0);
        // 1 dissipation * 10 - 1 control * 5.
        assert_eq!(g.stress, 5.0);
        assert_eq!(g.range, 15.0);
        assert_eq!(g.durability, 10.0);
        assert_eq!(g.target_heat, 0.0);
    }

    #[test]
    fn stress_never_goes_negative() {
        let mut f = Fixture::new();
        f.world.set(DISPENSER, "air");
        f.world.set(VoxelCoord::new(0, 0, 1), "redstone_block");
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        assert_eq!(engine.get(id).unwrap().stress, 0.0);
    }

    #[test]
    fn unclassified_blocks_stop_the_fill() {
        let mut f = Fixture::new();
        // A furnace on the far side of a dirt block is not part of the structure.
        f.world.set(VoxelCoord::new(4, 0, 0), "dirt");
        f.world.set(VoxelCoord::new(5, 0, 0), "furnace");
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        let g = engine.get(id).unwrap();
        assert!(!g.contains(VoxelCoord::new(4, 0, 0)));
        assert!(!g.contains(VoxelCoord::new(5, 0, 0)));
        assert_eq!(g.role_counts().heat, 1);
    }

    #[test]
    fn first_matching_bucket_wins() {
        let mut config = GeneratorConfig::default();
        config.control_blocks.insert(Material::new("furnace"));
        assert_eq!(
            StructureRole::classify(&Material::new("furnace"), &config),
            Some(StructureRole::Heat)
        );
        assert_eq!(StructureRole::classify(&Material::new("dirt"), &config), None);
    }

    #[test]
    fn missing_control_block_rejects_creation() {
        let mut f = Fixture::new();
        f.world.set(CONTROL, "air");
        let mut engine = GeneratorEngine::new();
        let err = engine
            .create(&f.world, W, FURNACE, &f.config)
            .unwrap_err();
        match err {
            GeneratorError::InvalidStructure { missing } => {
                assert_eq!(missing.as_slice(), &[StructureRole::Control]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(engine.is_empty());
        assert!(f.climate.is_empty());
    }

    #[test]
    fn origin_already_registered_is_rejected() {
        let f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        assert_eq!(
            engine.create(&f.world, W, CHEST, &f.config),
            Err(GeneratorError::AlreadyRegistered(id))
        );
    }

    #[test]
    fn power_on_without_control_creates_no_zone() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        f.host.stock_fuel(W, CHEST, 5);
        engine.on_block_removed(W, CONTROL, &mut f.ctx());

        let result = engine.power_on(id, &mut f.ctx());
        assert!(matches!(result, Err(GeneratorError::InvalidStructure { .. })));
        assert!(f.climate.is_empty());
        assert_eq!(engine.get(id).unwrap().state, GeneratorPowerState::Off);
    }

    #[test]
    fn power_on_without_fuel_fails() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        assert_eq!(engine.power_on(id, &mut f.ctx()), Err(GeneratorError::NoFuel));
        assert!(f.climate.is_empty());
        assert!(f.scheduler.is_empty());
    }

    #[test]
    fn power_on_registers_zone_lights_and_schedules() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        f.host.stock_fuel(W, CHEST, 5);

        engine.power_on(id, &mut f.ctx()).unwrap();
        let g = engine.get(id).unwrap();
        assert!(g.is_on());
        assert_eq!(g.target_heat, 75.0);
        assert_eq!(f.climate.len(), 1);
        assert_eq!(f.climate.zones()[0].radius(), 15.0);
        assert!(f.host.is_lit(W, FURNACE));
        assert!(f.host.is_lit(W, CAMPFIRE));
        assert!(!f.host.is_lit(W, CHEST));
        let handle = g.step_handle().unwrap();
        assert!(f.scheduler.is_scheduled(handle));
        assert_eq!(f.scheduler.peek_tick(), Some(5));
    }

    #[test]
    fn power_on_is_idempotent() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        f.host.stock_fuel(W, CHEST, 5);
        engine.power_on(id, &mut f.ctx()).unwrap();
        engine.power_on(id, &mut f.ctx()).unwrap();
        assert_eq!(f.climate.len(), 1);
        assert_eq!(f.scheduler.len(), 1);
    }

    #[test]
    fn heat_converges_without_overshoot() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        f.host.stock_fuel(W, CHEST, 20);
        engine.power_on(id, &mut f.ctx()).unwrap();

        let mut history = Vec::new();
        for _ in 0..10 {
            engine.step(id, &mut f.ctx()).unwrap();
            history.push(engine.get(id).unwrap().heat);
        }
        assert_eq!(
            history,
            vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 75.0, 75.0, 75.0]
        );
        assert_eq!(f.host.fuel_at(W, CHEST), 10);
    }

    #[test]
    fn converge_heat_snaps_inside_one_step() {
        assert_eq!(converge_heat(70.0, 75.0, 10.0), 75.0);
        assert_eq!(converge_heat(75.0, 0.0, 10.0), 65.0);
        assert_eq!(converge_heat(4.0, 0.0, 10.0), 0.0);
        assert_eq!(converge_heat(5.0, 5.0, 10.0), 5.0);
    }

    #[test]
    fn zone_tracks_current_heat() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        f.host.stock_fuel(W, CHEST, 5);
        engine.power_on(id, &mut f.ctx()).unwrap();
        // Heat starts at 0, so the zone adds nothing yet.
        assert_eq!(f.zone_temp(), 0.0);
        engine.step(id, &mut f.ctx()).unwrap();
        assert_eq!(f.zone_temp(), 10.0);
        engine.step(id, &mut f.ctx()).unwrap();
        assert_eq!(f.zone_temp(), 20.0);
        // Still exactly one zone: the refresh replaces it.
        assert_eq!(f.climate.len(), 1);
    }

    #[test]
    fn fuel_exhaustion_powers_off_and_cools_down() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        f.host.stock_fuel(W, CHEST, 3);
        engine.power_on(id, &mut f.ctx()).unwrap();
        let handle = engine.get(id).unwrap().step_handle().unwrap();

        for _ in 0..3 {
            engine.step(id, &mut f.ctx()).unwrap();
        }
        assert_eq!(f.host.fuel_at(W, CHEST), 0);
        assert!(engine.get(id).unwrap().is_on());

        // Next step finds no fuel.
        engine.step(id, &mut f.ctx()).unwrap();
        let g = engine.get(id).unwrap();
        assert_eq!(g.state, GeneratorPowerState::Off);
        assert_eq!(g.heat, 20.0);
        assert!(f.climate.is_empty());
        assert!(!f.host.is_lit(W, FURNACE));
        assert!(f.events.iter().any(|e| e.kind
            == SimEventKind::GeneratorPoweredOff {
                generator_id: id,
                reason: PowerOffReason::FuelExhausted
            }));

        // Heat decays; the step task cancels itself at 0.
        engine.step(id, &mut f.ctx()).unwrap();
        assert!(f.scheduler.is_scheduled(handle));
        engine.step(id, &mut f.ctx()).unwrap();
        let g = engine.get(id).unwrap();
        assert_eq!(g.heat, 0.0);
        assert!(g.step_handle().is_none());
        assert!(!f.scheduler.is_scheduled(handle));
    }

    #[test]
    fn intakes_drain_in_order() {
        let mut f = Fixture::new();
        let second = VoxelCoord::new(2, 1, 0);
        f.world.set(second, "chest");
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        let intakes = engine.get(id).unwrap().intakes().to_vec();
        assert_eq!(intakes.len(), 2);
        for &intake in &intakes {
            f.host.stock_fuel(W, intake, 2);
        }
        engine.power_on(id, &mut f.ctx()).unwrap();

        engine.step(id, &mut f.ctx()).unwrap();
        engine.step(id, &mut f.ctx()).unwrap();
        assert_eq!(f.host.fuel_at(W, intakes[0]), 0);
        assert_eq!(f.host.fuel_at(W, intakes[1]), 2);
        engine.step(id, &mut f.ctx()).unwrap();
        assert_eq!(f.host.fuel_at(W, intakes[1]), 1);
        assert!(engine.get(id).unwrap().is_on());
    }

    #[test]
    fn manual_power_off_removes_zone() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        f.host.stock_fuel(W, CHEST, 5);
        engine.power_on(id, &mut f.ctx()).unwrap();
        engine.step(id, &mut f.ctx()).unwrap();

        engine.power_off(id, PowerOffReason::Manual, &mut f.ctx()).unwrap();
        let g = engine.get(id).unwrap();
        assert_eq!(g.target_heat, 0.0);
        // Heat is not dropped instantly.
        assert_eq!(g.heat, 10.0);
        assert!(f.climate.is_empty());
        // Powering off twice is harmless.
        engine.power_off(id, PowerOffReason::Manual, &mut f.ctx()).unwrap();
    }

    #[test]
    fn zone_refresh_leaves_other_zones_at_origin() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        f.host.stock_fuel(W, CHEST, 5);
        let rule = crate::zone::TemperatureRule::Fixed { temperature: 5.0 };
        f.climate.create_static_zone(W, CONTROL.to_world_pos(), 3.0, rule);

        engine.power_on(id, &mut f.ctx()).unwrap();
        engine.step(id, &mut f.ctx()).unwrap();
        engine.step(id, &mut f.ctx()).unwrap();
        assert_eq!(f.climate.len(), 2);
        assert_eq!(f.zone_temp(), 20.0);

        engine.power_off(id, PowerOffReason::Manual, &mut f.ctx()).unwrap();
        assert_eq!(f.climate.len(), 1);
        assert_eq!(f.climate.zones()[0].owner(), None);
        assert_eq!(f.zone_temp(), 5.0);
    }

    #[test]
    fn removing_heat_block_while_on_powers_off() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        f.host.stock_fuel(W, CHEST, 5);
        engine.power_on(id, &mut f.ctx()).unwrap();

        let affected = engine.on_block_removed(W, FURNACE, &mut f.ctx());
        assert_eq!(affected, vec![id]);
        let g = engine.get(id).unwrap();
        assert_eq!(g.state, GeneratorPowerState::Off);
        assert!(f.climate.is_empty());
        assert!(f.events.iter().any(|e| e.kind
            == SimEventKind::GeneratorPoweredOff {
                generator_id: id,
                reason: PowerOffReason::StructureInvalid
            }));
        // Still registered, but cannot start until repaired.
        assert_eq!(engine.len(), 1);
        assert!(engine.power_on(id, &mut f.ctx()).is_err());
    }

    #[test]
    fn removing_optional_block_keeps_running() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        f.host.stock_fuel(W, CHEST, 5);
        engine.power_on(id, &mut f.ctx()).unwrap();

        engine.on_block_removed(W, CAMPFIRE, &mut f.ctx());
        let g = engine.get(id).unwrap();
        assert!(g.is_on());
        assert_eq!(g.target_heat, 50.0);
        // Unrelated blocks affect nothing.
        assert!(engine.on_block_removed(W, VoxelCoord::new(7, 7, 7), &mut f.ctx()).is_empty());
    }

    #[test]
    fn placed_role_block_joins_structure() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        f.host.stock_fuel(W, CHEST, 5);
        engine.power_on(id, &mut f.ctx()).unwrap();

        let extra = VoxelCoord::new(1, 1, 0);
        f.world.set(extra, "blast_furnace");
        let world = f.world.clone();
        assert_eq!(engine.on_block_placed(&world, W, extra, &mut f.ctx()), Some(id));
        let g = engine.get(id).unwrap();
        assert_eq!(g.role_of(extra), Some(StructureRole::Heat));
        assert_eq!(g.target_heat, 125.0);
        assert!(f.host.is_lit(W, extra));

        // Not adjacent, or not a role block: ignored.
        let far = VoxelCoord::new(6, 6, 6);
        f.world.set(far, "furnace");
        f.world.set(VoxelCoord::new(4, 0, 0), "dirt");
        let world = f.world.clone();
        assert_eq!(engine.on_block_placed(&world, W, far, &mut f.ctx()), None);
        assert_eq!(
            engine.on_block_placed(&world, W, VoxelCoord::new(4, 0, 0), &mut f.ctx()),
            None
        );
    }

    #[test]
    fn repaired_structure_can_restart() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        f.host.stock_fuel(W, CHEST, 5);
        engine.on_block_removed(W, FURNACE, &mut f.ctx());
        assert!(engine.power_on(id, &mut f.ctx()).is_err());

        let world = f.world.clone();
        assert_eq!(engine.on_block_placed(&world, W, FURNACE, &mut f.ctx()), Some(id));
        engine.power_on(id, &mut f.ctx()).unwrap();
        assert!(engine.get(id).unwrap().is_on());
    }

    #[test]
    fn toggle_at_control_block() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        f.host.stock_fuel(W, CHEST, 5);

        assert_eq!(engine.toggle_at(W, CONTROL, &mut f.ctx()), Ok(id));
        assert!(engine.get(id).unwrap().is_on());
        assert_eq!(engine.toggle_at(W, CONTROL, &mut f.ctx()), Ok(id));
        assert!(!engine.get(id).unwrap().is_on());

        assert_eq!(
            engine.toggle_at(W, FURNACE, &mut f.ctx()),
            Err(GeneratorError::NotAControlBlock {
                world: W,
                block: FURNACE
            })
        );
    }

    #[test]
    fn remove_cancels_everything() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        f.host.stock_fuel(W, CHEST, 5);
        engine.power_on(id, &mut f.ctx()).unwrap();
        let handle = engine.get(id).unwrap().step_handle().unwrap();

        engine.remove(id, &mut f.ctx()).unwrap();
        assert!(engine.is_empty());
        assert!(f.climate.is_empty());
        assert!(!f.scheduler.is_scheduled(handle));
        assert_eq!(
            engine.step(id, &mut f.ctx()),
            Err(GeneratorError::UnknownGenerator(id))
        );
    }

    #[test]
    fn status_snapshot() {
        let mut f = Fixture::new();
        let mut engine = GeneratorEngine::new();
        let id = f.create(&mut engine);
        let status = engine.status(id, &f.config).unwrap();
        assert_eq!(status.state, GeneratorPowerState::Off);
        assert_eq!(status.fuel_consumption, 0);
        assert_eq!(status.counts.heat, 1);
        assert_eq!(status.counts.intake, 1);
        assert!(status.missing.is_empty());

        f.host.stock_fuel(W, CHEST, 5);
        engine.power_on(id, &mut f.ctx()).unwrap();
        let status = engine.status(id, &f.config).unwrap();
        assert_eq!(status.fuel_consumption, 1);
        assert_eq!(status.max_heat, 75.0);
        assert!(engine.status(GeneratorId(99), &f.config).is_none());
    }
}
