// Data-driven game configuration.
//
// All tunable simulation parameters live here in `GameConfig`, loaded from
// JSON at startup. The sim never uses magic numbers; it reads from the
// config. Every struct is `#[serde(default)]`, so a config file only needs
// to name the values it overrides; everything else falls back to the
// defaults below.
//
// Parameters are grouped into sub-structs:
// - `EnclosureConfig`: flood-fill exploration radius.
// - `InsulationConfig`: per-material insulation weights and heat-source
//   contributions.
// - `BodyConfig`: observer body-temperature baseline, convergence rate and
//   classification thresholds (all in Kelvin).
// - `GeneratorConfig`: role material sets and per-unit constants for the
//   generator structure.
//
// The config is an immutable snapshot: `SimState` takes ownership at
// construction and never mutates it. There is no hot reload.
//
// See also: `sim.rs` which owns the `GameConfig`, `insulation.rs`,
// `body.rs` and `generator.rs` which read their sections.

use crate::error::ConfigError;
use crate::types::Material;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

fn materials(names: &[&str]) -> BTreeSet<Material> {
    names.iter().map(|n| Material::new(n)).collect()
}

fn weights(entries: &[(&str, f32)]) -> BTreeMap<Material, f32> {
    entries.iter().map(|&(n, w)| (Material::new(n), w)).collect()
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Controls the enclosure flood fill.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EnclosureConfig {
    /// Per-axis distance from the origin at which the fill gives up and
    /// reports the region as open to the outside.
    pub max_radius: u32,
}

impl Default for EnclosureConfig {
    fn default() -> Self {
        Self { max_radius: 128 }
    }
}

/// Material tables for insulation and heat-source scoring.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InsulationConfig {
    /// Insulation weight of each boundary material. Unknown materials weigh 0.
    pub weights: BTreeMap<Material, f32>,
    /// Signed temperature contribution of each heat-source material.
    pub heat_sources: BTreeMap<Material, f32>,
}

impl Default for InsulationConfig {
    fn default() -> Self {
        Self {
            weights: weights(&[
                ("glass", 1.0),
                ("stone", 1.5),
                ("iron_block", 2.0),
                ("diamond_block", 3.0),
                ("emerald_block", 3.0),
                ("gold_block", 0.5),
                ("netherite_block", 4.0),
            ]),
            heat_sources: weights(&[
                ("lava", 0.5),
                ("torch", 0.1),
                ("campfire", 0.3),
                ("soul_campfire", -0.3),
                ("fire", 0.7),
            ]),
        }
    }
}

/// Observer body temperature model. Temperatures are in Kelvin.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Temperature a newly joined observer starts at.
    pub baseline_temperature: f32,
    /// Maximum change per check toward the target temperature.
    pub change_rate: f32,
    /// Below this: severe hypothermia.
    pub critical_low: f32,
    /// Below this: moderate effects.
    pub moderate_threshold: f32,
    /// Below this: mild effects.
    pub mild_threshold: f32,
    /// Above this: overheating.
    pub warm_threshold: f32,
    /// Damage per check in the moderate state; doubled when severe.
    pub cold_damage: f32,
    /// The "freezing" message is shown once every this many cold checks.
    pub cold_message_interval: u32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            baseline_temperature: 310.15,
            change_rate: 1.0,
            critical_low: 263.15,
            moderate_threshold: 268.15,
            mild_threshold: 273.15,
            warm_threshold: 350.15,
            cold_damage: 0.1,
            cold_message_interval: 20,
        }
    }
}

/// Generator structure roles and derived-quantity constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Blocks that produce heat and consume fuel.
    pub heat_blocks: BTreeSet<Material>,
    /// Control panels; relieve stress.
    pub control_blocks: BTreeSet<Material>,
    /// Structural reinforcement; adds durability.
    pub structure_blocks: BTreeSet<Material>,
    /// Spread heat further at the cost of stress.
    pub dissipation_blocks: BTreeSet<Material>,
    /// Exhausts; add a smaller amount of heat.
    pub exhaust_blocks: BTreeSet<Material>,
    /// Fuel intakes (chests).
    pub intake_blocks: BTreeSet<Material>,

    pub heat_block_heat: f32,
    pub exhaust_heat: f32,
    pub dissipation_block_range: f32,
    pub dissipation_block_stress: f32,
    pub control_block_stress_relief: f32,
    pub base_heat_range: f32,
    pub structure_block_durability: f32,

    /// Maximum change of current heat per step (warm-up / cool-down rate).
    pub heat_step: f32,
    /// Fuel units consumed from one intake per step.
    pub fuel_per_step: u32,
    /// Ticks between generator steps.
    pub step_interval_ticks: u64,
    /// Ticks between powering on and the first step.
    pub step_start_delay_ticks: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            heat_blocks: materials(&["furnace", "blast_furnace", "smoker"]),
            control_blocks: materials(&["redstone_block"]),
            structure_blocks: materials(&[
                "iron_block",
                "gold_block",
                "diamond_block",
                "netherite_block",
            ]),
            dissipation_blocks: materials(&["dispenser", "dropper"]),
            exhaust_blocks: materials(&["campfire"]),
            intake_blocks: materials(&["chest"]),
            heat_block_heat: 50.0,
            exhaust_heat: 25.0,
            dissipation_block_range: 5.0,
            dissipation_block_stress: 10.0,
            control_block_stress_relief: 5.0,
            base_heat_range: 10.0,
            structure_block_durability: 10.0,
            heat_step: 10.0,
            fuel_per_step: 1,
            step_interval_ticks: 20,
            step_start_delay_ticks: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level game config
// ---------------------------------------------------------------------------

/// Top-level game configuration. Loaded from JSON, never mutated at runtime.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Ambient temperature of the world outside every zone (Kelvin).
    pub global_base_temperature: f32,

    /// Ticks between observer body-temperature checks.
    pub observer_check_interval_ticks: u64,

    pub enclosure: EnclosureConfig,
    pub insulation: InsulationConfig,
    pub body: BodyConfig,
    pub generator: GeneratorConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            global_base_temperature: 260.15,
            observer_check_interval_ticks: 20,
            enclosure: EnclosureConfig::default(),
            insulation: InsulationConfig::default(),
            body: BodyConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parse a config from JSON. Absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
