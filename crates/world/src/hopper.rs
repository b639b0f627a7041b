use crate::container::{Container, Inventory};
use crate::loot::LootState;
use crate::transfer::TransferArbiter;
use crate::viewers::OpenSessionCounter;
use mdlogistics_core::{Direction, ItemStack};

/// Number of slots in a hopper inventory.
pub const HOPPER_SLOT_COUNT: usize = 5;

/// Hopper block entity: a small inventory driven by a [`TransferArbiter`].
#[derive(Debug, Clone)]
pub struct HopperBlockEntity {
    inventory: Inventory,
    /// Cooldown and tick bookkeeping; persisted as `TransferCooldown`.
    pub arbiter: TransferArbiter,
    viewers: OpenSessionCounter,
}

impl Default for HopperBlockEntity {
    fn default() -> Self {
        Self::new(Direction::Down)
    }
}

impl HopperBlockEntity {
    pub fn new(facing: Direction) -> Self {
        Self::from_parts(Inventory::new(HOPPER_SLOT_COUNT), TransferArbiter::new(facing))
    }

    pub fn from_parts(inventory: Inventory, arbiter: TransferArbiter) -> Self {
        Self {
            inventory,
            arbiter,
            viewers: OpenSessionCounter::new(),
        }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    pub fn viewers(&self) -> &OpenSessionCounter {
        &self.viewers
    }

    pub fn viewers_mut(&mut self) -> &mut OpenSessionCounter {
        &mut self.viewers
    }
}

impl Container for HopperBlockEntity {
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

    fn max_stack_size(&self) -> u16 {
        self.inventory.max_stack_size()
    }

    fn arbiter(&self) -> Option<&TransferArbiter> {
        Some(&self.arbiter)
    }

    fn arbiter_mut(&mut self) -> Option<&mut TransferArbiter> {
        Some(&mut self.arbiter)
    }

    fn loot_mut(&mut self) -> Option<&mut LootState> {
        self.inventory.loot_mut()
    }
}
