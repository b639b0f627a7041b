//! Closed set of container-owning block entities.

use crate::block::Block;
use crate::chest::ChestBlockEntity;
use crate::container::{Container, Inventory};
use crate::dispenser::DispenserBlockEntity;
use crate::furnace::FurnaceBlockEntity;
use crate::hopper::HopperBlockEntity;
use crate::viewers::OpenSessionCounter;

/// A block entity. Every kind is a [`Container`].
#[derive(Debug, Clone)]
pub enum BlockEntity {
    Chest(ChestBlockEntity),
    Barrel(ChestBlockEntity),
    Hopper(HopperBlockEntity),
    Dispenser(DispenserBlockEntity),
    Furnace(FurnaceBlockEntity),
}

impl BlockEntity {
    /// Fresh, empty block entity for `block`, if that block owns one.
    pub fn for_block(block: Block) -> Option<Self> {
        Some(match block {
            Block::Chest { .. } => BlockEntity::Chest(ChestBlockEntity::new()),
            Block::Barrel => BlockEntity::Barrel(ChestBlockEntity::new()),
            Block::Hopper { facing, .. } => BlockEntity::Hopper(HopperBlockEntity::new(facing)),
            Block::Dispenser { .. } => BlockEntity::Dispenser(DispenserBlockEntity::new()),
            Block::Furnace { .. } => BlockEntity::Furnace(FurnaceBlockEntity::new()),
            Block::Air | Block::Solid | Block::Composter { .. } => return None,
        })
    }

    /// Persisted type id.
    pub fn type_id(&self) -> &'static str {
        match self {
            BlockEntity::Chest(_) => "mdm:chest",
            BlockEntity::Barrel(_) => "mdm:barrel",
            BlockEntity::Hopper(_) => "mdm:hopper",
            BlockEntity::Dispenser(_) => "mdm:dispenser",
            BlockEntity::Furnace(_) => "mdm:furnace",
        }
    }

    /// Whether this block entity belongs on `block`.
    pub fn matches_block(&self, block: Block) -> bool {
        matches!(
            (self, block),
            (BlockEntity::Chest(_), Block::Chest { .. })
                | (BlockEntity::Barrel(_), Block::Barrel)
                | (BlockEntity::Hopper(_), Block::Hopper { .. })
                | (BlockEntity::Dispenser(_), Block::Dispenser { .. })
                | (BlockEntity::Furnace(_), Block::Furnace { .. })
        )
    }

    /// Container view.
    pub fn container(&self) -> &dyn Container {
        match self {
            BlockEntity::Chest(be) | BlockEntity::Barrel(be) => be,
            BlockEntity::Hopper(be) => be,
            BlockEntity::Dispenser(be) => be,
            BlockEntity::Furnace(be) => be,
        }
    }

    /// Mutable container view.
    pub fn container_mut(&mut self) -> &mut dyn Container {
        match self {
            BlockEntity::Chest(be) | BlockEntity::Barrel(be) => be,
            BlockEntity::Hopper(be) => be,
            BlockEntity::Dispenser(be) => be,
            BlockEntity::Furnace(be) => be,
        }
    }

    /// Underlying slot storage.
    pub fn inventory(&self) -> &Inventory {
        match self {
            BlockEntity::Chest(be) | BlockEntity::Barrel(be) => be.inventory(),
            BlockEntity::Hopper(be) => be.inventory(),
            BlockEntity::Dispenser(be) => be.inventory(),
            BlockEntity::Furnace(be) => be.inventory(),
        }
    }

    /// Mutable slot storage.
    pub fn inventory_mut(&mut self) -> &mut Inventory {
        match self {
            BlockEntity::Chest(be) | BlockEntity::Barrel(be) => be.inventory_mut(),
            BlockEntity::Hopper(be) => be.inventory_mut(),
            BlockEntity::Dispenser(be) => be.inventory_mut(),
            BlockEntity::Furnace(be) => be.inventory_mut(),
        }
    }

    /// Viewer tracking, for kinds that animate when opened.
    pub fn viewers(&self) -> Option<&OpenSessionCounter> {
        match self {
            BlockEntity::Chest(be) | BlockEntity::Barrel(be) => Some(be.viewers()),
            BlockEntity::Hopper(be) => Some(be.viewers()),
            BlockEntity::Dispenser(_) | BlockEntity::Furnace(_) => None,
        }
    }

    /// Mutable viewer tracking.
    pub fn viewers_mut(&mut self) -> Option<&mut OpenSessionCounter> {
        match self {
            BlockEntity::Chest(be) | BlockEntity::Barrel(be) => Some(be.viewers_mut()),
            BlockEntity::Hopper(be) => Some(be.viewers_mut()),
            BlockEntity::Dispenser(_) | BlockEntity::Furnace(_) => None,
        }
    }

    /// The hopper, if this is one.
    pub fn as_hopper(&self) -> Option<&HopperBlockEntity> {
        match self {
            BlockEntity::Hopper(hopper) => Some(hopper),
            _ => None,
        }
    }

    /// Mutable hopper access.
    pub fn as_hopper_mut(&mut self) -> Option<&mut HopperBlockEntity> {
        match self {
            BlockEntity::Hopper(hopper) => Some(hopper),
            _ => None,
        }
    }

    /// Keep derived state in line with the block: a hopper's arbiter
    /// follows the block's facing.
    pub fn sync_with_block(&mut self, block: Block) {
        if let (BlockEntity::Hopper(hopper), Block::Hopper { facing, .. }) = (self, block) {
            hopper.arbiter.facing = facing;
        }
    }
}
