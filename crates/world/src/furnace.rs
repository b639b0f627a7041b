//! Furnace block entity.
//!
//! Only the container side is modelled here: three slots and the classic
//! per-face access rules. Burning and smelting belong to the block's own
//! behaviour and are driven elsewhere.

use crate::container::{Container, Inventory};
use crate::face::FaceSlotMap;
use crate::loot::LootState;
use mdlogistics_core::{Direction, ItemStack, RegistryKey, DEFAULT_NAMESPACE};

/// Number of furnace slots.
pub const FURNACE_SLOT_COUNT: usize = 3;
/// Item being smelted.
pub const SLOT_INPUT: usize = 0;
/// Fuel.
pub const SLOT_FUEL: usize = 1;
/// Smelting output.
pub const SLOT_RESULT: usize = 2;

/// Fuel burn durations in ticks.
#[derive(Debug, Clone, Copy)]
pub struct FuelValue {
    pub item: &'static str,
    pub burn_ticks: u32,
}

/// All valid fuel items (default namespace) and their burn durations.
pub const FUEL_VALUES: &[FuelValue] = &[
    FuelValue {
        item: "coal",
        burn_ticks: 1600,
    },
    FuelValue {
        item: "charcoal",
        burn_ticks: 1600,
    },
    FuelValue {
        item: "coal_block",
        burn_ticks: 16000,
    },
    FuelValue {
        item: "lava_bucket",
        burn_ticks: 20000,
    },
    FuelValue {
        item: "oak_log",
        burn_ticks: 300,
    },
    FuelValue {
        item: "oak_planks",
        burn_ticks: 300,
    },
    FuelValue {
        item: "stick",
        burn_ticks: 100,
    },
];

/// Burn duration of `item` in ticks (0 if not fuel).
pub fn fuel_ticks(item: &RegistryKey) -> u32 {
    if item.namespace() != DEFAULT_NAMESPACE {
        return 0;
    }
    FUEL_VALUES
        .iter()
        .find(|f| f.item == item.path())
        .map(|f| f.burn_ticks)
        .unwrap_or(0)
}

/// Check if an item is valid fuel.
pub fn is_fuel(item: &RegistryKey) -> bool {
    fuel_ticks(item) > 0
}

fn is_bucket(item: &RegistryKey) -> bool {
    item.namespace() == DEFAULT_NAMESPACE && item.path() == "bucket"
}

fn is_water_bucket(item: &RegistryKey) -> bool {
    item.namespace() == DEFAULT_NAMESPACE && item.path() == "water_bucket"
}

/// Furnace block entity.
#[derive(Debug, Clone)]
pub struct FurnaceBlockEntity {
    inventory: Inventory,
}

impl Default for FurnaceBlockEntity {
    fn default() -> Self {
        Self::new()
    }
}

impl FurnaceBlockEntity {
    pub fn new() -> Self {
        Self::from_inventory(Inventory::new(FURNACE_SLOT_COUNT))
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
}

impl Container for FurnaceBlockEntity {
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

    /// Result slot never accepts items; the fuel slot takes fuel, or a bucket
    /// when it does not already hold one.
    fn can_place(&self, slot: usize, stack: &ItemStack) -> bool {
        match slot {
            SLOT_RESULT => false,
            SLOT_FUEL => {
                let holds_bucket = self
                    .inventory
                    .slot_ref(SLOT_FUEL)
                    .as_ref()
                    .is_some_and(|s| is_bucket(&s.item));
                is_fuel(&stack.item) || (is_bucket(&stack.item) && !holds_bucket)
            }
            _ => true,
        }
    }

    fn face_slots(&self) -> Option<&dyn FaceSlotMap> {
        Some(self)
    }

    fn loot_mut(&mut self) -> Option<&mut LootState> {
        self.inventory.loot_mut()
    }
}

impl FaceSlotMap for FurnaceBlockEntity {
    fn slots_for_face(&self, face: Direction) -> Vec<usize> {
        match face {
            Direction::Down => vec![SLOT_RESULT, SLOT_FUEL],
            Direction::Up => vec![SLOT_INPUT],
            _ => vec![SLOT_FUEL],
        }
    }

    fn can_place_through_face(
        &self,
        slot: usize,
        stack: &ItemStack,
        _face: Option<Direction>,
    ) -> bool {
        self.can_place(slot, stack)
    }

    /// Only emptied buckets leave the fuel slot from below.
    fn can_take_through_face(&self, slot: usize, stack: &ItemStack, face: Direction) -> bool {
        if face == Direction::Down && slot == SLOT_FUEL {
            return is_water_bucket(&stack.item) || is_bucket(&stack.item);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::{can_place_item, can_take_item, slots_for};

    fn stack(path: &str) -> ItemStack {
        ItemStack::new(RegistryKey::mdm(path), 1, 64)
    }

    #[test]
    fn test_fuel_values() {
        assert_eq!(fuel_ticks(&RegistryKey::mdm("coal")), 1600);
        assert_eq!(fuel_ticks(&RegistryKey::mdm("stone")), 0);
        assert!(!is_fuel(&RegistryKey::parse("other:coal").unwrap()));
    }

    #[test]
    fn faces_reach_classic_slots() {
        let furnace = FurnaceBlockEntity::new();
        assert_eq!(slots_for(&furnace, Some(Direction::Up)), vec![SLOT_INPUT]);
        assert_eq!(
            slots_for(&furnace, Some(Direction::Down)),
            vec![SLOT_RESULT, SLOT_FUEL]
        );
        assert_eq!(slots_for(&furnace, Some(Direction::East)), vec![SLOT_FUEL]);
    }

    #[test]
    fn placement_and_extraction_rules() {
        let mut furnace = FurnaceBlockEntity::new();
        let side = Some(Direction::North);

        assert!(can_place_item(&furnace, &stack("coal"), SLOT_FUEL, side));
        assert!(!can_place_item(&furnace, &stack("iron_ore"), SLOT_FUEL, side));
        assert!(!can_place_item(&furnace, &stack("coal"), SLOT_RESULT, None));
        assert!(can_place_item(&furnace, &stack("bucket"), SLOT_FUEL, side));

        furnace.set(SLOT_FUEL, Some(stack("bucket")));
        assert!(!can_place_item(&furnace, &stack("bucket"), SLOT_FUEL, side));

        let hopper = Inventory::new(5);
        assert!(can_take_item(&hopper, &furnace, &stack("bucket"), SLOT_FUEL, Direction::Down));
        assert!(!can_take_item(&hopper, &furnace, &stack("coal"), SLOT_FUEL, Direction::Down));
        assert!(can_take_item(&hopper, &furnace, &stack("iron_ingot"), SLOT_RESULT, Direction::Down));
    }
}
