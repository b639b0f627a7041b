use crate::container::{Container, Inventory};
use crate::loot::{LootRef, LootState};
use crate::viewers::OpenSessionCounter;
use mdlogistics_core::ItemStack;

/// Number of slots in a single chest inventory (3 rows × 9 columns).
pub const CHEST_SLOT_COUNT: usize = 27;

/// Block entity for chests and barrels: 27 slots plus viewers.
#[derive(Debug, Clone)]
pub struct ChestBlockEntity {
    inventory: Inventory,
    viewers: OpenSessionCounter,
}

impl Default for ChestBlockEntity {
    fn default() -> Self {
        Self::new()
    }
}

impl ChestBlockEntity {
    pub fn new() -> Self {
        Self::from_inventory(Inventory::new(CHEST_SLOT_COUNT))
    }

    pub fn from_inventory(inventory: Inventory) -> Self {
        Self {
            inventory,
            viewers: OpenSessionCounter::new(),
        }
    }

    /// Chest whose contents come from a loot table on first access.
    pub fn with_loot(loot: LootRef) -> Self {
        let mut chest = Self::new();
        chest.inventory.loot_state_mut().set(Some(loot));
        chest
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

impl Container for ChestBlockEntity {
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

    fn loot_mut(&mut self) -> Option<&mut LootState> {
        self.inventory.loot_mut()
    }
}
