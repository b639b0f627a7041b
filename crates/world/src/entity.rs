//! Free-floating entities the transfer layer interacts with.
//!
//! Item entities are what hoppers pick up; chest minecarts are the
//! entity-backed containers the locator can find. Movement and physics are
//! not modelled: an entity stays where it was spawned until removed.

use crate::chest::CHEST_SLOT_COUNT;
use crate::container::{Container, Inventory};
use crate::loot::{LootRef, LootState};
use mdlogistics_core::{Aabb, BlockPos, ItemStack, RegistryKey, Vec3};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Stable entity identifier. Entities are kept ordered by id.
pub type EntityId = u64;

/// Item entity bounding box edge.
pub const ITEM_ENTITY_SIZE: f64 = 0.25;

/// Chest minecart bounding box width.
pub const MINECART_WIDTH: f64 = 0.98;

/// Chest minecart bounding box height.
pub const MINECART_HEIGHT: f64 = 0.7;

/// Minecart carrying a chest-sized inventory.
#[derive(Debug, Clone)]
pub struct ChestMinecart {
    inventory: Inventory,
}

impl Default for ChestMinecart {
    fn default() -> Self {
        Self::new()
    }
}

impl ChestMinecart {
    pub fn new() -> Self {
        Self::from_inventory(Inventory::new(CHEST_SLOT_COUNT))
    }

    pub fn from_inventory(inventory: Inventory) -> Self {
        Self { inventory }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }
}

impl Container for ChestMinecart {
    fn size(&self) -> usize {
        self.inventory.size()
    }

    fn slot_ref(&self, slot: usize) -> &Option<ItemStack> {
        self.inventory.slot_ref(slot)
    }

    fn slot_mut(&mut self, slot: usize) -> &mut Option<ItemStack> {
        self.inventory.slot_mut(slot)
    }

    fn set_changed(&mut self) {
        self.inventory.set_changed();
    }

    fn loot_mut(&mut self) -> Option<&mut LootState> {
        self.inventory.loot_mut()
    }
}

/// What an entity is.
#[derive(Debug, Clone)]
pub enum EntityKind {
    /// A dropped stack. Emptied item entities are removed from the world.
    Item(ItemStack),
    /// Entity-backed container.
    ChestMinecart(ChestMinecart),
}

/// An entity positioned at its bottom centre.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub pos: Vec3,
    pub kind: EntityKind,
}

impl Entity {
    /// World-space bounding box.
    pub fn bounding_box(&self) -> Aabb {
        match self.kind {
            EntityKind::Item(_) => Aabb::standing(self.pos, ITEM_ENTITY_SIZE, ITEM_ENTITY_SIZE),
            EntityKind::ChestMinecart(_) => Aabb::standing(self.pos, MINECART_WIDTH, MINECART_HEIGHT),
        }
    }

    /// The carried stack, for item entities.
    pub fn item(&self) -> Option<&ItemStack> {
        match &self.kind {
            EntityKind::Item(stack) => Some(stack),
            EntityKind::ChestMinecart(_) => None,
        }
    }

    /// Entity-backed container, if any.
    pub fn container_mut(&mut self) -> Option<&mut dyn Container> {
        match &mut self.kind {
            EntityKind::ChestMinecart(cart) => Some(cart),
            EntityKind::Item(_) => None,
        }
    }

    /// Whether this entity exposes a container.
    pub fn is_container(&self) -> bool {
        matches!(self.kind, EntityKind::ChestMinecart(_))
    }

    /// Block the entity stands in. Loot rolls for entity containers use it
    /// as their origin.
    pub fn block_pos(&self) -> BlockPos {
        BlockPos::new(
            self.pos.x.floor() as i32,
            self.pos.y.floor() as i32,
            self.pos.z.floor() as i32,
        )
    }
}

/// Persisted form of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub pos: Vec3,
    pub item: Option<ItemStack>,
    /// Minecart slots; `None` for item entities. Empty while loot is pending.
    pub slots: Option<Vec<Option<ItemStack>>>,
    /// Pending minecart loot table.
    pub loot_table: Option<String>,
    pub loot_seed: Option<i64>,
}

impl EntityRecord {
    pub fn from_entity(entity: &Entity) -> Self {
        match &entity.kind {
            EntityKind::Item(stack) => Self {
                id: entity.id,
                pos: entity.pos,
                item: Some(stack.clone()),
                slots: None,
                loot_table: None,
                loot_seed: None,
            },
            EntityKind::ChestMinecart(cart) => {
                let pending = cart.inventory.loot().pending();
                let slots = match pending {
                    Some(_) => Vec::new(),
                    None => cart.inventory.raw_slots().to_vec(),
                };
                Self {
                    id: entity.id,
                    pos: entity.pos,
                    item: None,
                    slots: Some(slots),
                    loot_table: pending.map(|loot| loot.table.to_string()),
                    loot_seed: pending.map(|loot| loot.seed as i64),
                }
            }
        }
    }

    /// Rebuild the entity. `None` for records that describe nothing (an item
    /// record without a stack).
    pub fn into_entity(self) -> Option<Entity> {
        let Self {
            id,
            pos,
            item,
            slots,
            loot_table,
            loot_seed,
        } = self;
        let kind = match (item, slots) {
            (_, Some(slots)) => {
                let mut inventory = Inventory::from_slots(CHEST_SLOT_COUNT, slots);
                inventory
                    .loot_state_mut()
                    .set(loot_table.and_then(|table| parse_loot(&table, loot_seed)));
                EntityKind::ChestMinecart(ChestMinecart::from_inventory(inventory))
            }
            (Some(stack), None) if stack.count > 0 => EntityKind::Item(stack),
            _ => return None,
        };
        Some(Entity { id, pos, kind })
    }
}

fn parse_loot(table: &str, seed: Option<i64>) -> Option<LootRef> {
    match RegistryKey::parse(table) {
        Ok(table) => Some(LootRef {
            table,
            seed: seed.unwrap_or(0) as u64,
        }),
        Err(_) => {
            warn!(table, "Invalid minecart loot table; treating minecart as plain");
            None
        }
    }
}
