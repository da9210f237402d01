// Insulation and heat-source scoring.
//
// Two pure functions over the material tables in `InsulationConfig`:
//
// - `insulation_factor()` maps a sealed room's boundary multiset to a scalar.
//   An empty boundary (or an unsealed region, which reports none) yields the
//   neutral factor 1.0. Otherwise the result is the *mean* per-face weight:
//   sum of weights divided by the number of faces. A large stone hall and a
//   small stone closet score the same, and a closet lined with a rare
//   high-weight material outscores a hall of plain stone. Unknown materials
//   weigh 0 and still count toward the divisor.
//
// - `heat_from_sources()` sums the signed contribution of each distinct heat
//   source type present. No averaging; a cooling source (soul campfire)
//   contributes negatively.
//
// See also: `enclosure.rs` which produces boundary multisets, `body.rs`
// which combines both scores into an observer's target temperature.

use crate::config::InsulationConfig;
use crate::enclosure::EnclosureResult;
use crate::types::Material;
use std::collections::BTreeSet;

/// Factor applied when there is nothing to score.
pub const NEUTRAL_INSULATION: f32 = 1.0;

/// Mean insulation weight of the boundary faces, or 1.0 for an empty boundary.
pub fn insulation_factor(boundary: &[Material], config: &InsulationConfig) -> f32 {
    if boundary.is_empty() {
        return NEUTRAL_INSULATION;
    }
    let total: f32 = boundary
        .iter()
        .map(|m| config.weights.get(m).copied().unwrap_or(0.0))
        .sum();
    total / boundary.len() as f32
}

/// Insulation for an enclosure result: scored when sealed, neutral otherwise.
pub fn enclosure_insulation(enclosure: &EnclosureResult, config: &InsulationConfig) -> f32 {
    if enclosure.sealed {
        insulation_factor(&enclosure.boundary, config)
    } else {
        NEUTRAL_INSULATION
    }
}

/// Signed sum of the contributions of each distinct heat source present.
pub fn heat_from_sources(sources: &BTreeSet<Material>, config: &InsulationConfig) -> f32 {
    sources
        .iter()
        .map(|m| config.heat_sources.get(m).copied().unwrap_or(0.0))
        .sum()
}
