// Climate zones: spherical regions with their own temperature rule.
//
// A `Zone` is a tagged sum over two variants sharing one capability set
// (`contains`, `temperature_at`, `update_temperature`):
//
// - `StaticClimateZone`: a fixed region whose temperature is a function of
//   the global temperature (`TemperatureRule`). The rule is evaluated once
//   per global update and cached.
// - `HeatZone`: the region around a running generator. It caches the global
//   temperature itself and evaluates its `HeatFalloff` lazily per query,
//   since the result depends on the query point's distance from the center.
//
// Containment is squared Euclidean distance against radius squared. Zones
// are spheres; they do not look at blocks. A heat zone therefore covers
// points outside the generator's room and misses nothing inside its radius.
//
// Rules are data rather than closures so zones stay `Clone`, `Debug` and
// serializable.
//
// See also: `climate.rs` which owns the zone set and resolves overlaps,
// `generator.rs` which creates and refreshes heat zones.

use crate::types::{GeneratorId, WorldId, WorldPos};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Temperature rules
// ---------------------------------------------------------------------------

/// How a static zone derives its temperature from the global temperature.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TemperatureRule {
    /// `global + delta`.
    Offset { delta: f32 },
    /// A constant temperature regardless of the global value.
    Fixed { temperature: f32 },
    /// `global * scale + offset`.
    Linear { scale: f32, offset: f32 },
}

impl TemperatureRule {
    pub fn apply(&self, global: f32) -> f32 {
        match *self {
            TemperatureRule::Offset { delta } => global + delta,
            TemperatureRule::Fixed { temperature } => temperature,
            TemperatureRule::Linear { scale, offset } => global * scale + offset,
        }
    }
}

/// How a heat zone's contribution falls off with distance from its center.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum HeatFalloff {
    /// `global + magnitude / distance²`. At the center itself the
    /// unattenuated magnitude applies.
    InverseSquare { magnitude: f32 },
    /// `global + magnitude` everywhere inside the radius.
    Uniform { magnitude: f32 },
}

impl HeatFalloff {
    pub fn apply(&self, global: f32, distance: f32) -> f32 {
        match *self {
            HeatFalloff::InverseSquare { magnitude } if distance == 0.0 => global + magnitude,
            HeatFalloff::InverseSquare { magnitude } => {
                global + magnitude / (distance * distance)
            }
            HeatFalloff::Uniform { magnitude } => global + magnitude,
        }
    }

    pub fn magnitude(&self) -> f32 {
        match *self {
            HeatFalloff::InverseSquare { magnitude } | HeatFalloff::Uniform { magnitude } => {
                magnitude
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Zone variants
// ---------------------------------------------------------------------------

/// A fixed climate region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticClimateZone {
    pub world: WorldId,
    pub center: WorldPos,
    pub radius: f32,
    pub rule: TemperatureRule,
    /// `rule` applied to the last global temperature.
    temperature: f32,
}

impl StaticClimateZone {
    pub fn new(world: WorldId, center: WorldPos, radius: f32, rule: TemperatureRule) -> Self {
        Self {
            world,
            center,
            radius,
            rule,
            temperature: 0.0,
        }
    }
}

/// The heated region around a generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatZone {
    pub world: WorldId,
    pub center: WorldPos,
    pub radius: f32,
    pub falloff: HeatFalloff,
    /// The generator feeding this zone. `None` for zones created directly.
    #[serde(default)]
    pub owner: Option<GeneratorId>,
    /// The last global temperature; the falloff is applied per query.
    global_temperature: f32,
}

impl HeatZone {
    pub fn new(world: WorldId, center: WorldPos, radius: f32, falloff: HeatFalloff) -> Self {
        Self {
            world,
            center,
            radius,
            falloff,
            owner: None,
            global_temperature: 0.0,
        }
    }

    pub fn owned_by(mut self, owner: GeneratorId) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// A climate zone of either kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Zone {
    StaticClimate(StaticClimateZone),
    Heat(HeatZone),
}

impl From<StaticClimateZone> for Zone {
    fn from(zone: StaticClimateZone) -> Self {
        Zone::StaticClimate(zone)
    }
}

impl From<HeatZone> for Zone {
    fn from(zone: HeatZone) -> Self {
        Zone::Heat(zone)
    }
}

impl Zone {
    pub fn world(&self) -> WorldId {
        match self {
            Zone::StaticClimate(z) => z.world,
            Zone::Heat(z) => z.world,
        }
    }

    pub fn center(&self) -> WorldPos {
        match self {
            Zone::StaticClimate(z) => z.center,
            Zone::Heat(z) => z.center,
        }
    }

    pub fn radius(&self) -> f32 {
        match self {
            Zone::StaticClimate(z) => z.radius,
            Zone::Heat(z) => z.radius,
        }
    }

    /// The generator owning this zone, if any. Static zones have none.
    pub fn owner(&self) -> Option<GeneratorId> {
        match self {
            Zone::StaticClimate(_) => None,
            Zone::Heat(z) => z.owner,
        }
    }

    /// Whether `point` lies inside the zone's sphere (boundary inclusive).
    pub fn contains(&self, point: WorldPos) -> bool {
        let r = self.radius();
        self.center().distance_squared(point) <= r * r
    }

    /// The zone's temperature at `point`. Only meaningful when `contains`.
    pub fn temperature_at(&self, point: WorldPos) -> f32 {
        match self {
            Zone::StaticClimate(z) => z.temperature,
            Zone::Heat(z) => z
                .falloff
                .apply(z.global_temperature, z.center.distance(point)),
        }
    }

    /// Recompute cached state from a new global temperature.
    pub fn update_temperature(&mut self, global: f32) {
        match self {
            Zone::StaticClimate(z) => z.temperature = z.rule.apply(global),
            Zone::Heat(z) => z.global_temperature = global,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: WorldId = WorldId(0);

    fn origin() -> WorldPos {
        WorldPos::new(0.0, 0.0, 0.0)
    }

    #[test]
    fn rules_apply_to_global() {
        assert_eq!(TemperatureRule::Offset { delta: 15.0 }.apply(260.0), 275.0);
        assert_eq!(TemperatureRule::Fixed { temperature: 300.0 }.apply(260.0), 300.0);
        assert_eq!(
            TemperatureRule::Linear { scale: 0.5, offset: 100.0 }.apply(260.0),
            230.0
        );
    }

    #[test]
    fn containment_is_spherical() {
        let zone: Zone =
            StaticClimateZone::new(W, origin(), 5.0, TemperatureRule::Offset { delta: 1.0 }).into();
        assert!(zone.contains(WorldPos::new(5.0, 0.0, 0.0)));
        assert!(zone.contains(WorldPos::new(3.0, 4.0, 0.0)));
        // Inside the bounding cube but outside the sphere.
        assert!(!zone.contains(WorldPos::new(4.0, 4.0, 0.0)));
        assert!(!zone.contains(WorldPos::new(5.1, 0.0, 0.0)));
    }

    #[test]
    fn static_zone_caches_rule_result() {
        let rule = TemperatureRule::Offset { delta: 10.0 };
        let mut zone: Zone = StaticClimateZone::new(W, origin(), 5.0, rule).into();
        zone.update_temperature(250.0);
        assert_eq!(zone.temperature_at(origin()), 260.0);
        // Same value anywhere in the zone.
        assert_eq!(zone.temperature_at(WorldPos::new(2.0, 2.0, 0.0)), 260.0);
        zone.update_temperature(200.0);
        assert_eq!(zone.temperature_at(origin()), 210.0);
    }

    #[test]
    fn heat_zone_inverse_square_falloff() {
        let falloff = HeatFalloff::InverseSquare { magnitude: 100.0 };
        let mut zone: Zone = HeatZone::new(W, origin(), 20.0, falloff).into();
        zone.update_temperature(260.0);
        assert_eq!(zone.temperature_at(WorldPos::new(2.0, 0.0, 0.0)), 285.0);
        assert_eq!(zone.temperature_at(WorldPos::new(10.0, 0.0, 0.0)), 261.0);
    }

    #[test]
    fn heat_zone_center_is_unattenuated() {
        let falloff = HeatFalloff::InverseSquare { magnitude: 100.0 };
        let mut zone: Zone = HeatZone::new(W, origin(), 20.0, falloff).into();
        zone.update_temperature(260.0);
        let at_center = zone.temperature_at(origin());
        assert!(at_center.is_finite());
        assert_eq!(at_center, 360.0);
    }

    #[test]
    fn heat_zone_sub_block_distance_follows_inverse_square() {
        let falloff = HeatFalloff::InverseSquare { magnitude: 100.0 };
        assert_eq!(falloff.apply(0.0, 0.5), 400.0);

        let mut zone: Zone = HeatZone::new(W, origin(), 20.0, falloff).into();
        zone.update_temperature(260.0);
        // An observer standing in the generator's own block.
        assert_eq!(zone.temperature_at(WorldPos::new(0.5, 0.0, 0.0)), 660.0);
        assert_eq!(zone.temperature_at(WorldPos::new(1.0, 0.0, 0.0)), 360.0);
    }

    #[test]
    fn uniform_falloff_ignores_distance() {
        let mut zone: Zone =
            HeatZone::new(W, origin(), 8.0, HeatFalloff::Uniform { magnitude: 40.0 }).into();
        zone.update_temperature(250.0);
        assert_eq!(zone.temperature_at(WorldPos::new(7.0, 0.0, 0.0)), 290.0);
        assert_eq!(zone.temperature_at(origin()), 290.0);
    }

    #[test]
    fn accessors_dispatch_per_variant() {
        let center = WorldPos::new(1.0, 2.0, 3.0);
        let heat: Zone =
            HeatZone::new(WorldId(7), center, 4.0, HeatFalloff::Uniform { magnitude: 1.0 }).into();
        assert_eq!(heat.world(), WorldId(7));
        assert_eq!(heat.center(), center);
        assert_eq!(heat.radius(), 4.0);
    }
}
