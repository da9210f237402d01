// Observer body-temperature model.
//
// Each observer carries a `BodyTemperature`. On every observer check the sim
// computes a target temperature,
//
//   target = insulation * (heat_from_sources + zone_temperature)
//
// where `insulation` is the enclosure score (1.0 when unsealed) and
// `zone_temperature` comes from the climate registry. The body temperature
// then moves toward the target by at most `change_rate`, snapping exactly onto
// the target when the remaining gap is smaller than one step.
//
// The new temperature is classified against the configured thresholds, from
// coldest to warmest: below `critical_low` is severe, below
// `moderate_threshold` moderate, below `mild_threshold` mild, above
// `warm_threshold` warm, otherwise normal.
//
// `effect_plan()` turns the state into a declarative `ColdEffects` value for
// the host to apply (damage, potion-style effects, freezing, the throttled
// "you are freezing" message). Applying it is the host's job. Observers in
// an exempt game mode still track temperature but always get an empty plan.
//
// See also: `sim.rs` which runs checks during the observer sweep,
// `insulation.rs` and `climate.rs` for the target's inputs.

use crate::config::BodyConfig;
use serde::{Deserialize, Serialize};

/// Body-temperature classification, coldest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BodyTemperatureState {
    Severe,
    Moderate,
    Mild,
    Normal,
    Warm,
}

impl BodyTemperatureState {
    pub fn classify(temperature: f32, config: &BodyConfig) -> Self {
        if temperature < config.critical_low {
            Self::Severe
        } else if temperature < config.moderate_threshold {
            Self::Moderate
        } else if temperature < config.mild_threshold {
            Self::Mild
        } else if temperature > config.warm_threshold {
            Self::Warm
        } else {
            Self::Normal
        }
    }

    pub fn is_cold(self) -> bool {
        matches!(self, Self::Severe | Self::Moderate | Self::Mild)
    }
}

/// The temperature an observer converges to.
pub fn target_temperature(insulation: f32, heat_sources: f32, zone_temperature: f32) -> f32 {
    insulation * (heat_sources + zone_temperature)
}

/// Move `current` toward `target` by at most `rate`.
pub fn approach(current: f32, target: f32, rate: f32) -> f32 {
    let gap = target - current;
    if gap.abs() <= rate {
        target
    } else {
        current + rate.copysign(gap)
    }
}

// ---------------------------------------------------------------------------
// Effect plan
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreezeAction {
    #[default]
    None,
    Freeze,
    Unfreeze,
}

/// What the host should do to an observer after a check. Effect levels are
/// zero-based amplifiers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColdEffects {
    /// Freeze damage to deal this check.
    pub damage: f32,
    pub slowness: Option<u8>,
    pub weakness: Option<u8>,
    pub hunger: Option<u8>,
    pub freeze: FreezeAction,
    /// Strip any cold effects applied earlier.
    pub clear_effects: bool,
    pub show_cold_message: bool,
}

impl ColdEffects {
    /// A plan that changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Per-observer state
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyTemperature {
    pub temperature: f32,
    pub state: BodyTemperatureState,
    /// Cold checks since the message was last shown; wraps at the interval.
    cold_message_counter: u32,
    /// Consecutive checks spent in a cold state.
    pub cold_ticks: u64,
    pub frozen: bool,
    /// Creative/spectator-style modes: temperature is tracked, effects are not.
    pub exempt: bool,
    pub died_from_cold: bool,
    /// Whether the last plan dealt cold damage.
    last_plan_damaged: bool,
}

impl BodyTemperature {
    pub fn new(config: &BodyConfig) -> Self {
        let temperature = config.baseline_temperature;
        Self {
            temperature,
            state: BodyTemperatureState::classify(temperature, config),
            cold_message_counter: 0,
            cold_ticks: 0,
            frozen: false,
            exempt: false,
            died_from_cold: false,
            last_plan_damaged: false,
        }
    }

    /// Converge toward `target` and reclassify. Returns the previous state.
    pub fn update(&mut self, target: f32, config: &BodyConfig) -> BodyTemperatureState {
        let previous = self.state;
        self.temperature = approach(self.temperature, target, config.change_rate);
        self.state = BodyTemperatureState::classify(self.temperature, config);
        if self.state.is_cold() {
            self.cold_ticks += 1;
        } else {
            self.cold_ticks = 0;
        }
        previous
    }

    /// Build this check's effects from the current state and advance the
    /// freeze flag and message throttle accordingly.
    pub fn effect_plan(&mut self, config: &BodyConfig) -> ColdEffects {
        let mut plan = ColdEffects::default();
        if self.exempt {
            if self.frozen {
                self.frozen = false;
                plan.freeze = FreezeAction::Unfreeze;
            }
            self.last_plan_damaged = false;
            return plan;
        }

        match self.state {
            BodyTemperatureState::Severe => {
                plan.damage = config.cold_damage * 2.0;
                if !self.frozen {
                    self.frozen = true;
                    plan.freeze = FreezeAction::Freeze;
                }
            }
            BodyTemperatureState::Moderate => {
                plan.damage = config.cold_damage;
                plan.slowness = Some(1);
                plan.weakness = Some(1);
            }
            BodyTemperatureState::Mild => {
                plan.slowness = Some(0);
                plan.hunger = Some(0);
            }
            BodyTemperatureState::Normal | BodyTemperatureState::Warm => {
                if self.frozen {
                    self.frozen = false;
                    plan.freeze = FreezeAction::Unfreeze;
                }
                plan.clear_effects = true;
                self.cold_message_counter = 0;
            }
        }

        if plan.damage > 0.0 {
            plan.show_cold_message = self.cold_message_counter == 0;
            self.cold_message_counter += 1;
            if self.cold_message_counter >= config.cold_message_interval {
                self.cold_message_counter = 0;
            }
        }
        self.last_plan_damaged = plan.damage > 0.0;
        plan
    }

    /// Switch exempt mode. Entering it unfreezes the observer.
    pub fn set_exempt(&mut self, exempt: bool) -> FreezeAction {
        self.exempt = exempt;
        if exempt && self.frozen {
            self.frozen = false;
            FreezeAction::Unfreeze
        } else {
            FreezeAction::None
        }
    }

    /// Record a death reported by the host. Returns whether the cold killed
    /// the observer.
    pub fn on_death(&mut self) -> bool {
        self.frozen = false;
        self.died_from_cold = self.last_plan_damaged;
        self.last_plan_damaged = false;
        self.died_from_cold
    }
}
