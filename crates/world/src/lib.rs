//! Containers, hoppers and the world arena they tick in.

pub mod block;
pub mod block_entity;
pub mod chest;
pub mod composter;
pub mod config;
pub mod container;
pub mod dispenser;
pub mod entity;
pub mod face;
pub mod furnace;
pub mod hopper;
pub mod locate;
pub mod loot;
pub mod persist;
pub mod transfer;
pub mod viewers;
pub mod world;

pub use block::{Block, ChestType, COMPOSTER_FULL, COMPOSTER_READY};
pub use block_entity::BlockEntity;
pub use chest::{ChestBlockEntity, CHEST_SLOT_COUNT};
pub use composter::ComposterContainer;
pub use config::TransferConfig;
pub use container::{CompoundContainer, Container, Inventory};
pub use dispenser::{DispenserBlockEntity, DISPENSER_SLOT_COUNT};
pub use entity::{ChestMinecart, Entity, EntityId, EntityKind, EntityRecord};
pub use face::{can_place_item, can_take_item, slots_for, FaceSlotMap};
pub use furnace::{FurnaceBlockEntity, FURNACE_SLOT_COUNT};
pub use hopper::{HopperBlockEntity, HOPPER_SLOT_COUNT};
pub use locate::{locate, ContainerHandle};
pub use loot::{
    resolve_loot, LootContext, LootEntry, LootRef, LootSource, LootState, LootTable, LootTables,
    SharedLootSource,
};
pub use persist::{
    block_entity_from_record, block_entity_to_record, decode_snapshot, encode_snapshot,
    load_snapshot, save_snapshot, PersistError,
};
pub use transfer::{add_item, is_full_from, suck_area, TransferArbiter};
pub use viewers::{AgentId, OpenSessionCounter, ViewerNotifier, ViewerValidator};
pub use world::{Agent, MoveKind, World, WorldEvent, VIEWER_RANGE};
