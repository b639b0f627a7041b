use crate::container::{Container, Inventory};
use crate::loot::LootState;
use mdlogistics_core::ItemStack;
use rand::Rng;

/// Number of slots in a dispenser/dropper inventory.
pub const DISPENSER_SLOT_COUNT: usize = 9;

/// Dispenser/dropper block entity.
#[derive(Debug, Clone)]
pub struct DispenserBlockEntity {
    inventory: Inventory,
}

impl Default for DispenserBlockEntity {
    fn default() -> Self {
        Self::new()
    }
}

impl DispenserBlockEntity {
    pub fn new() -> Self {
        Self::from_inventory(Inventory::new(DISPENSER_SLOT_COUNT))
    }

    pub fn from_inventory(inventory: Inventory) -> Self {
        Self { inventory }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    /// Pick the slot to dispense from: uniformly among non-empty slots, so
    /// each occupied slot has the same chance regardless of position.
    pub fn random_slot(&mut self, rng: &mut impl Rng) -> Option<usize> {
        self.ensure_resolved();
        let mut chosen = None;
        let mut seen = 0u32;
        for slot in 0..self.size() {
            if self.slot_ref(slot).is_some() {
                seen += 1;
                if rng.gen_range(0..seen) == 0 {
                    chosen = Some(slot);
                }
            }
        }
        chosen
    }
}

impl Container for DispenserBlockEntity {
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

#[cfg(test)]
mod tests {
    use super::*;
    use mdlogistics_core::RegistryKey;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn random_slot_only_picks_occupied_slots() {
        let mut dispenser = DispenserBlockEntity::new();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(dispenser.random_slot(&mut rng), None);

        dispenser.set(2, Some(ItemStack::new(RegistryKey::mdm("arrow"), 4, 64)));
        dispenser.set(7, Some(ItemStack::new(RegistryKey::mdm("arrow"), 1, 64)));
        for _ in 0..32 {
            let slot = dispenser.random_slot(&mut rng).unwrap();
            assert!(slot == 2 || slot == 7);
        }
    }
}
