// Error taxonomy for recoverable failures.
//
// Nothing in the sim panics or aborts the host. Failures are returned as
// these values and, inside the tick loop, turned into `CommandRejected`
// narrative events. Fuel running out during a step is not an error; it is
// an ordinary power-off.

use crate::generator::StructureRole;
use crate::types::{GeneratorId, ObserverId, VoxelCoord, WorldId};
use smallvec::SmallVec;
use thiserror::Error;

/// Failures of generator operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeneratorError {
    /// The discovered structure lacks one or more required roles.
    #[error("invalid structure: missing {missing:?}")]
    InvalidStructure {
        missing: SmallVec<[StructureRole; 3]>,
    },

    /// No intake holds fuel, so the generator cannot start.
    #[error("no fuel in any intake")]
    NoFuel,

    /// The origin block already belongs to a registered generator.
    #[error("block is already part of generator {0}")]
    AlreadyRegistered(GeneratorId),

    #[error("no generator control block at {block} in {world}")]
    NotAControlBlock { world: WorldId, block: VoxelCoord },

    #[error("unknown generator {0}")]
    UnknownGenerator(GeneratorId),

    #[error("unknown world {0}")]
    UnknownWorld(WorldId),
}

/// Failures loading a `GameConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Why a `SimCommand` could not be applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error("unknown observer {0}")]
    UnknownObserver(ObserverId),

    #[error("observer {0} is already registered")]
    DuplicateObserver(ObserverId),
}
