//! Composter: a container backed by block state alone.
//!
//! The composter has no block entity. Each lookup builds a short-lived
//! [`ComposterContainer`] over the current fill level; the world writes the
//! level back afterwards. Compostables enter from above while the level is
//! below [`COMPOSTER_FULL`]; a ready composter offers one bone meal below.

use crate::block::{COMPOSTER_FULL, COMPOSTER_READY};
use crate::container::Container;
use crate::face::FaceSlotMap;
use mdlogistics_core::{Direction, ItemStack, RegistryKey, DEFAULT_NAMESPACE};
use rand::{rngs::StdRng, Rng};
use tracing::trace;

/// Ticks between reaching [`COMPOSTER_FULL`] and turning into bone meal.
pub const COMPOSTER_RIPEN_TICKS: u64 = 20;

/// Chance that one item raises the level.
pub const COMPOST_CHANCES: &[(&str, f64)] = &[
    ("wheat_seeds", 0.3),
    ("kelp", 0.3),
    ("oak_leaves", 0.3),
    ("short_grass", 0.3),
    ("cactus", 0.5),
    ("sugar_cane", 0.5),
    ("melon_slice", 0.5),
    ("apple", 0.65),
    ("carrot", 0.65),
    ("potato", 0.65),
    ("wheat", 0.65),
    ("pumpkin", 0.65),
    ("bread", 0.85),
    ("baked_potato", 0.85),
    ("cake", 1.0),
    ("pumpkin_pie", 1.0),
];

/// Compost chance of `item`, 0 when it cannot be composted.
pub fn compost_chance(item: &RegistryKey) -> f64 {
    if item.namespace() != DEFAULT_NAMESPACE {
        return 0.0;
    }
    COMPOST_CHANCES
        .iter()
        .find(|(path, _)| *path == item.path())
        .map_or(0.0, |(_, chance)| *chance)
}

/// The item a ready composter yields.
pub fn bone_meal() -> ItemStack {
    ItemStack::new(RegistryKey::mdm("bone_meal"), 1, 64)
}

/// One-slot view over a composter's level.
pub struct ComposterContainer<'a> {
    level: u8,
    slot: Option<ItemStack>,
    composted: bool,
    rng: &'a mut StdRng,
}

impl<'a> ComposterContainer<'a> {
    /// View a composter at `level`, rolling compost chances from `rng`.
    pub fn new(level: u8, rng: &'a mut StdRng) -> Self {
        let level = level.min(COMPOSTER_READY);
        Self {
            level,
            slot: (level == COMPOSTER_READY).then(bone_meal),
            composted: false,
            rng,
        }
    }

    /// Level after whatever happened through this view.
    pub fn level(&self) -> u8 {
        self.level
    }

    fn accepts_input(&self) -> bool {
        self.level < COMPOSTER_FULL && !self.composted
    }
}

impl Container for ComposterContainer<'_> {
    fn size(&self) -> usize {
        if self.level == COMPOSTER_FULL {
            0
        } else {
            1
        }
    }

    fn slot_ref(&self, _slot: usize) -> &Option<ItemStack> {
        &self.slot
    }

    fn slot_mut(&mut self, _slot: usize) -> &mut Option<ItemStack> {
        &mut self.slot
    }

    /// Inserted items are consumed immediately; taking the bone meal empties
    /// the composter.
    fn set_changed(&mut self) {
        if self.level < COMPOSTER_FULL {
            let Some(stack) = self.slot.take() else {
                return;
            };
            self.composted = true;
            let chance = compost_chance(&stack.item);
            if (self.level == 0 && chance > 0.0) || self.rng.gen::<f64>() < chance {
                self.level += 1;
            }
            trace!(item = %stack.item, level = self.level, "composted item");
        } else if self.level == COMPOSTER_READY && self.slot.is_none() {
            self.level = 0;
        }
    }

    fn max_stack_size(&self) -> u16 {
        1
    }

    fn can_place(&self, _slot: usize, stack: &ItemStack) -> bool {
        self.accepts_input() && compost_chance(&stack.item) > 0.0
    }

    fn face_slots(&self) -> Option<&dyn FaceSlotMap> {
        Some(self)
    }
}

impl FaceSlotMap for ComposterContainer<'_> {
    fn slots_for_face(&self, face: Direction) -> Vec<usize> {
        match (self.level, face) {
            (COMPOSTER_READY, Direction::Down) => vec![0],
            (level, Direction::Up) if level < COMPOSTER_FULL => vec![0],
            _ => Vec::new(),
        }
    }

    fn can_place_through_face(
        &self,
        _slot: usize,
        stack: &ItemStack,
        face: Option<Direction>,
    ) -> bool {
        face == Some(Direction::Up) && self.accepts_input() && compost_chance(&stack.item) > 0.0
    }

    fn can_take_through_face(&self, _slot: usize, stack: &ItemStack, face: Direction) -> bool {
        self.level == COMPOSTER_READY
            && face == Direction::Down
            && stack.item == RegistryKey::mdm("bone_meal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::{can_place_item, slots_for};
    use rand::SeedableRng;

    #[test]
    fn first_compostable_always_raises_empty_composter() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut composter = ComposterContainer::new(0, &mut rng);
        let mut seeds = Some(ItemStack::new(RegistryKey::mdm("wheat_seeds"), 5, 64));

        assert!(can_place_item(&composter, seeds.as_ref().unwrap(), 0, Some(Direction::Up)));
        assert_eq!(composter.merge_into(0, &mut seeds), 1);
        composter.set_changed();
        assert_eq!(composter.level(), 1);
        assert!(composter.slot_ref(0).is_none());
        assert_eq!(seeds.unwrap().count, 4);

        // One item per view.
        let seeds = ItemStack::new(RegistryKey::mdm("wheat_seeds"), 1, 64);
        assert!(!can_place_item(&composter, &seeds, 0, Some(Direction::Up)));
    }

    #[test]
    fn rejects_non_compostables_and_side_insertion() {
        let mut rng = StdRng::seed_from_u64(0);
        let composter = ComposterContainer::new(3, &mut rng);
        let stone = ItemStack::new(RegistryKey::mdm("stone"), 1, 64);
        let bread = ItemStack::new(RegistryKey::mdm("bread"), 1, 64);
        assert!(!can_place_item(&composter, &stone, 0, Some(Direction::Up)));
        assert!(!can_place_item(&composter, &bread, 0, Some(Direction::North)));
        assert!(slots_for(&composter, Some(Direction::Down)).is_empty());
    }

    #[test]
    fn ready_composter_yields_bone_meal_and_resets() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut composter = ComposterContainer::new(COMPOSTER_READY, &mut rng);
        assert_eq!(slots_for(&composter, Some(Direction::Down)), vec![0]);
        let taken = composter.remove(0, 1).unwrap();
        assert_eq!(taken.item, RegistryKey::mdm("bone_meal"));
        assert_eq!(composter.level(), 0);
    }

    #[test]
    fn full_composter_exposes_nothing() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut composter = ComposterContainer::new(COMPOSTER_FULL, &mut rng);
        assert_eq!(composter.size(), 0);
        assert!(composter.is_empty());
    }
}
