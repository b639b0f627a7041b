//! Block states stored in the world arena.

use mdlogistics_core::{BlockPos, Direction};
use serde::{Deserialize, Serialize};

/// Which half of a double chest a chest block is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChestType {
    /// Stand-alone chest.
    #[default]
    Single,
    /// Left half (seen from the front). Addressed first in the compound view.
    Left,
    /// Right half.
    Right,
}

impl ChestType {
    /// The type the partner half must have.
    pub fn opposite(self) -> Self {
        match self {
            ChestType::Single => ChestType::Single,
            ChestType::Left => ChestType::Right,
            ChestType::Right => ChestType::Left,
        }
    }
}

/// Highest composter level; at this level it holds bone meal.
pub const COMPOSTER_READY: u8 = 8;

/// Composter level at which it stops accepting input and waits to ripen.
pub const COMPOSTER_FULL: u8 = 7;

fn unlocked() -> bool {
    true
}

/// Block state at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "block", rename_all = "snake_case")]
pub enum Block {
    /// Nothing.
    #[default]
    Air,
    /// Any full, opaque block without behaviour.
    Solid,
    /// Chest (possibly one half of a double chest).
    Chest {
        /// Direction the front faces.
        facing: Direction,
        /// Single or a double-chest half.
        #[serde(default)]
        kind: ChestType,
    },
    /// Barrel.
    Barrel,
    /// Hopper.
    Hopper {
        /// Output direction (never `Up`).
        facing: Direction,
        /// False while locked by an external signal.
        #[serde(default = "unlocked")]
        enabled: bool,
    },
    /// Dispenser/dropper.
    Dispenser {
        /// Output direction.
        facing: Direction,
    },
    /// Furnace.
    Furnace {
        /// Direction the front faces.
        facing: Direction,
    },
    /// Composter, a block-state backed container.
    Composter {
        /// Fill level `0..=8`.
        level: u8,
    },
}

impl Block {
    /// Hopper block with the given output. `Up` is not a valid output and
    /// becomes `Down`.
    pub fn hopper(facing: Direction) -> Self {
        let facing = if facing == Direction::Up {
            Direction::Down
        } else {
            facing
        };
        Block::Hopper {
            facing,
            enabled: true,
        }
    }

    /// Full solid cube: stops item entities from being sucked through it.
    pub fn is_full_solid(self) -> bool {
        matches!(self, Block::Solid | Block::Barrel | Block::Dispenser { .. } | Block::Furnace { .. })
    }

    /// Whether this block owns a block entity.
    pub fn has_block_entity(self) -> bool {
        matches!(
            self,
            Block::Chest { .. }
                | Block::Barrel
                | Block::Hopper { .. }
                | Block::Dispenser { .. }
                | Block::Furnace { .. }
        )
    }

    /// Position of the other half of a double chest, if this is a half.
    pub fn chest_partner(self, pos: BlockPos) -> Option<BlockPos> {
        match self {
            Block::Chest {
                facing,
                kind: ChestType::Left,
            } => Some(pos.relative(facing.clockwise())),
            Block::Chest {
                facing,
                kind: ChestType::Right,
            } => Some(pos.relative(facing.counter_clockwise())),
            _ => None,
        }
    }
}
