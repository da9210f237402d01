// Zone registry: global ambient temperature plus overlapping climate zones.
//
// `ClimateRegistry` owns the global temperature and every active `Zone`.
// `temperature_at()` resolves a point by starting from the global
// temperature and taking the maximum over all zones in the same world that
// contain the point. Zones never average or stack. The hottest containing
// zone wins, and where no zone applies the global value is returned as-is.
//
// Cache invariant: every zone's cached state reflects the latest global
// temperature. `add_zone()` initializes a zone with the current global value
// before inserting it, and `update_global_temperature()` pushes the new value
// to every zone exactly once.
//
// Removal is keyed on `(world, center)` with exact equality and removes every
// match. Callers must pass the center they registered with. Generator zones
// carry an owner and are removed with `remove_zones_owned_by()` instead.
//
// The registry is owned by `SimState` and mutated only on the tick thread.
//
// See also: `zone.rs` for the variants, `generator.rs` which registers heat
// zones, `body.rs` which queries the registry per observer check.

use crate::types::{GeneratorId, WorldId, WorldPos};
use crate::zone::{HeatFalloff, HeatZone, StaticClimateZone, TemperatureRule, Zone};
use serde::{Deserialize, Serialize};

/// The global temperature and the set of active zones.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClimateRegistry {
    global_temperature: f32,
    /// Insertion order is preserved; iteration order never affects results.
    zones: Vec<Zone>,
}

impl ClimateRegistry {
    pub fn new(global_temperature: f32) -> Self {
        Self {
            global_temperature,
            zones: Vec::new(),
        }
    }

    pub fn global_temperature(&self) -> f32 {
        self.global_temperature
    }

    /// Initialize `zone` with the current global temperature and insert it.
    pub fn add_zone(&mut self, zone: impl Into<Zone>) {
        let mut zone = zone.into();
        zone.update_temperature(self.global_temperature);
        log::debug!(
            "zone added in {} at {} (radius {})",
            zone.world(),
            zone.center(),
            zone.radius()
        );
        self.zones.push(zone);
    }

    /// Create and register a fixed climate region.
    pub fn create_static_zone(
        &mut self,
        world: WorldId,
        center: WorldPos,
        radius: f32,
        rule: TemperatureRule,
    ) {
        self.add_zone(StaticClimateZone::new(world, center, radius, rule));
    }

    /// Create and register a heat zone.
    pub fn create_heat_zone(
        &mut self,
        world: WorldId,
        center: WorldPos,
        radius: f32,
        falloff: HeatFalloff,
    ) {
        self.add_zone(HeatZone::new(world, center, radius, falloff));
    }

    /// Remove every zone registered at exactly `(world, center)`. Returns how
    /// many were removed.
    pub fn remove_zone_at(&mut self, world: WorldId, center: WorldPos) -> usize {
        let before = self.zones.len();
        self.zones
            .retain(|z| !(z.world() == world && z.center() == center));
        let removed = before - self.zones.len();
        if removed > 0 {
            log::debug!("removed {removed} zone(s) in {world} at {center}");
        }
        removed
    }

    /// Remove every zone fed by generator `owner`, leaving other zones at the
    /// same center alone. Returns how many were removed.
    pub fn remove_zones_owned_by(&mut self, owner: GeneratorId) -> usize {
        let before = self.zones.len();
        self.zones.retain(|z| z.owner() != Some(owner));
        let removed = before - self.zones.len();
        if removed > 0 {
            log::debug!("removed {removed} zone(s) owned by generator {owner}");
        }
        removed
    }

    /// Set the global temperature and refresh every zone's cache.
    pub fn update_global_temperature(&mut self, temperature: f32) {
        self.global_temperature = temperature;
        for zone in &mut self.zones {
            zone.update_temperature(temperature);
        }
    }

    /// Resolve the temperature at `point`: the global temperature, raised to
    /// the hottest zone in `world` containing the point.
    pub fn temperature_at(&self, world: WorldId, point: WorldPos) -> f32 {
        self.zones
            .iter()
            .filter(|z| z.world() == world && z.contains(point))
            .map(|z| z.temperature_at(point))
            .fold(self.global_temperature, f32::max)
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Zones registered in `world`.
    pub fn zones_in(&self, world: WorldId) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(move |z| z.world() == world)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
