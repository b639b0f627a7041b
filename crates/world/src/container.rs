//! The generic inventory capability shared by every container owner.
//!
//! Implementors supply raw slot access plus a change hook; the provided
//! operations layer the container contract on top (clamping, loot
//! resolution, change notification). Every provided read or write calls
//! [`Container::ensure_resolved`] first, which is the only implicit side
//! effect a container has.

use crate::face::FaceSlotMap;
use crate::loot::{self, LootState};
use crate::transfer::TransferArbiter;
use mdlogistics_core::{split_slot, try_merge, ItemStack, RegistryKey, MAX_STACK_LIMIT};

/// Fixed-size, ordered sequence of item slots.
pub trait Container {
    /// Number of slots. Fixed for the lifetime of the container.
    fn size(&self) -> usize;

    /// Raw slot access without loot resolution. Panics when out of range.
    fn slot_ref(&self, slot: usize) -> &Option<ItemStack>;

    /// Raw mutable slot access without loot resolution. Panics when out of range.
    fn slot_mut(&mut self, slot: usize) -> &mut Option<ItemStack>;

    /// Record that the contents changed.
    fn set_changed(&mut self);

    /// Container-wide stack size cap.
    fn max_stack_size(&self) -> u16 {
        MAX_STACK_LIMIT
    }

    /// Placement rule for `stack` in `slot`.
    fn can_place(&self, _slot: usize, _stack: &ItemStack) -> bool {
        true
    }

    /// Removal rule: may `requester` take `stack` out of `slot`?
    fn can_take(&self, _requester: &dyn Container, _slot: usize, _stack: &ItemStack) -> bool {
        true
    }

    /// Face-restricted slot access, if this container has one.
    fn face_slots(&self) -> Option<&dyn FaceSlotMap> {
        None
    }

    /// Transfer arbiter state, if this container is a transporter.
    fn arbiter(&self) -> Option<&TransferArbiter> {
        None
    }

    /// Mutable transfer arbiter state, if this container is a transporter.
    fn arbiter_mut(&mut self) -> Option<&mut TransferArbiter> {
        None
    }

    /// Pending loot reference, if this container supports lazy loot.
    fn loot_mut(&mut self) -> Option<&mut LootState> {
        None
    }

    /// Resolve a pending loot reference. Idempotent.
    fn ensure_resolved(&mut self) {
        loot::resolve_loot(self);
    }

    /// Effective cap for `stack` in this container.
    fn max_stack_size_for(&self, stack: &ItemStack) -> u16 {
        self.max_stack_size().min(stack.max_stack_size())
    }

    /// Copy of the stack in `slot`.
    fn get(&mut self, slot: usize) -> Option<ItemStack> {
        self.ensure_resolved();
        self.slot_ref(slot).clone()
    }

    /// Replace the contents of `slot`, clamping the count to
    /// [`Container::max_stack_size_for`].
    fn set(&mut self, slot: usize, stack: Option<ItemStack>) {
        self.ensure_resolved();
        let stack = stack.and_then(|mut stack| {
            stack.limit_size(self.max_stack_size_for(&stack));
            (stack.count > 0).then_some(stack)
        });
        *self.slot_mut(slot) = stack;
        self.set_changed();
    }

    /// Remove up to `amount` units from `slot`. Marks the container changed
    /// only when something was removed.
    fn remove(&mut self, slot: usize, amount: u16) -> Option<ItemStack> {
        self.ensure_resolved();
        let taken = split_slot(self.slot_mut(slot), amount);
        if taken.is_some() {
            self.set_changed();
        }
        taken
    }

    /// Empty `slot` without a change notification.
    fn remove_no_update(&mut self, slot: usize) -> Option<ItemStack> {
        self.ensure_resolved();
        self.slot_mut(slot).take()
    }

    /// Merge units from `src` into `slot` up to the effective cap. Returns
    /// units moved. Placement rules are the caller's responsibility.
    fn merge_into(&mut self, slot: usize, src: &mut Option<ItemStack>) -> u16 {
        self.ensure_resolved();
        let limit = match src.as_ref() {
            Some(stack) => self.max_stack_size_for(stack),
            None => return 0,
        };
        try_merge(self.slot_mut(slot), src, limit)
    }

    /// True when no slot holds anything.
    fn is_empty(&mut self) -> bool {
        self.ensure_resolved();
        (0..self.size()).all(|slot| self.slot_ref(slot).is_none())
    }

    /// True when every slot holds its effective maximum.
    fn is_full(&mut self) -> bool {
        self.ensure_resolved();
        (0..self.size()).all(|slot| match self.slot_ref(slot) {
            Some(stack) => stack.count >= self.max_stack_size_for(stack),
            None => false,
        })
    }

    /// Empty every slot.
    fn clear(&mut self) {
        self.ensure_resolved();
        for slot in 0..self.size() {
            *self.slot_mut(slot) = None;
        }
        self.set_changed();
    }

    /// Total units of `item` across all slots.
    fn count_item(&mut self, item: &RegistryKey) -> u32 {
        self.ensure_resolved();
        (0..self.size())
            .filter_map(|slot| self.slot_ref(slot).as_ref())
            .filter(|stack| &stack.item == item)
            .map(|stack| stack.count as u32)
            .sum()
    }

    /// Copy of every slot, in order.
    fn contents(&mut self) -> Vec<Option<ItemStack>> {
        self.ensure_resolved();
        (0..self.size()).map(|slot| self.slot_ref(slot).clone()).collect()
    }
}

/// Plain slot storage with an optional lazy loot reference. Every container
/// owner embeds one.
#[derive(Debug, Clone)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
    max_stack_size: u16,
    revision: u64,
    loot: LootState,
}

impl Inventory {
    /// Create an empty inventory with `size` slots.
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
            max_stack_size: MAX_STACK_LIMIT,
            revision: 0,
            loot: LootState::default(),
        }
    }

    /// Rebuild an inventory from loaded slots, padded or truncated to `size`.
    pub fn from_slots(size: usize, mut slots: Vec<Option<ItemStack>>) -> Self {
        slots.resize(size, None);
        Self {
            slots,
            ..Self::new(size)
        }
    }

    /// Override the container-wide stack cap (clamped to `1..=MAX_STACK_LIMIT`).
    pub fn set_max_stack_size(&mut self, max: u16) {
        self.max_stack_size = max.clamp(1, MAX_STACK_LIMIT);
    }

    /// Number of change notifications seen so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Lazy loot state.
    pub fn loot(&self) -> &LootState {
        &self.loot
    }

    /// Mutable lazy loot state.
    pub fn loot_state_mut(&mut self) -> &mut LootState {
        &mut self.loot
    }

    /// Raw slots, without resolving loot. Used by persistence.
    pub fn raw_slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }
}

impl Container for Inventory {
    fn size(&self) -> usize {
        self.slots.len()
    }

    fn slot_ref(&self, slot: usize) -> &Option<ItemStack> {
        &self.slots[slot]
    }

    fn slot_mut(&mut self, slot: usize) -> &mut Option<ItemStack> {
        &mut self.slots[slot]
    }

    fn set_changed(&mut self) {
        self.revision += 1;
    }

    fn max_stack_size(&self) -> u16 {
        self.max_stack_size
    }

    fn loot_mut(&mut self) -> Option<&mut LootState> {
        Some(&mut self.loot)
    }
}

/// Two containers presented as one contiguous slot range, `first` then
/// `second` (a double chest).
pub struct CompoundContainer<'a> {
    first: &'a mut dyn Container,
    second: &'a mut dyn Container,
}

impl<'a> CompoundContainer<'a> {
    /// Join two halves.
    pub fn new(first: &'a mut dyn Container, second: &'a mut dyn Container) -> Self {
        Self { first, second }
    }

    fn split_index(&self, slot: usize) -> (bool, usize) {
        let first_size = self.first.size();
        if slot < first_size {
            (true, slot)
        } else {
            (false, slot - first_size)
        }
    }
}

impl Container for CompoundContainer<'_> {
    fn size(&self) -> usize {
        self.first.size() + self.second.size()
    }

    fn slot_ref(&self, slot: usize) -> &Option<ItemStack> {
        match self.split_index(slot) {
            (true, idx) => self.first.slot_ref(idx),
            (false, idx) => self.second.slot_ref(idx),
        }
    }

    fn slot_mut(&mut self, slot: usize) -> &mut Option<ItemStack> {
        match self.split_index(slot) {
            (true, idx) => self.first.slot_mut(idx),
            (false, idx) => self.second.slot_mut(idx),
        }
    }

    fn set_changed(&mut self) {
        self.first.set_changed();
        self.second.set_changed();
    }

    fn max_stack_size(&self) -> u16 {
        self.first.max_stack_size()
    }

    fn can_place(&self, slot: usize, stack: &ItemStack) -> bool {
        match self.split_index(slot) {
            (true, idx) => self.first.can_place(idx, stack),
            (false, idx) => self.second.can_place(idx, stack),
        }
    }

    fn ensure_resolved(&mut self) {
        self.first.ensure_resolved();
        self.second.ensure_resolved();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdlogistics_core::Item;

    fn cobble() -> Item {
        Item::new(RegistryKey::mdm("cobblestone"), 64)
    }

    fn sword() -> Item {
        Item::new(RegistryKey::mdm("iron_sword"), 1)
    }

    #[test]
    fn set_clamps_to_effective_max() {
        let mut inv = Inventory::new(2);
        inv.set_max_stack_size(16);
        inv.set(0, Some(cobble().stack(40)));
        assert_eq!(inv.get(0).unwrap().count, 16);

        inv.set_max_stack_size(99);
        inv.set(1, Some(sword().stack(1)));
        assert_eq!(inv.max_stack_size_for(&sword().stack(1)), 1);
    }

    #[test]
    fn remove_notifies_only_when_non_empty() {
        let mut inv = Inventory::new(2);
        inv.set(0, Some(cobble().stack(10)));
        let before = inv.revision();

        assert!(inv.remove(1, 5).is_none());
        assert_eq!(inv.revision(), before);

        let taken = inv.remove(0, 4).unwrap();
        assert_eq!(taken.count, 4);
        assert_eq!(inv.get(0).unwrap().count, 6);
        assert_eq!(inv.revision(), before + 1);
    }

    #[test]
    fn full_requires_every_slot_at_max() {
        let mut inv = Inventory::new(2);
        assert!(inv.is_empty());
        assert!(!inv.is_full());

        inv.set(0, Some(cobble().stack(64)));
        inv.set(1, Some(sword().stack(1)));
        assert!(inv.is_full());

        inv.remove(0, 1);
        assert!(!inv.is_full());
    }

    #[test]
    fn compound_addresses_first_half_first() {
        let mut left = Inventory::new(3);
        let mut right = Inventory::new(3);
        right.set(0, Some(cobble().stack(5)));

        let mut compound = CompoundContainer::new(&mut left, &mut right);
        assert_eq!(compound.size(), 6);
        assert!(compound.get(0).is_none());
        assert_eq!(compound.get(3).unwrap().count, 5);

        compound.set(1, Some(cobble().stack(2)));
        drop(compound);
        assert_eq!(left.get(1).unwrap().count, 2);
        assert_eq!(right.count_item(&RegistryKey::mdm("cobblestone")), 5);
    }

    #[test]
    fn merge_into_respects_container_cap() {
        let mut inv = Inventory::new(1);
        inv.set_max_stack_size(10);
        let mut src = Some(cobble().stack(30));
        assert_eq!(inv.merge_into(0, &mut src), 10);
        assert_eq!(src.unwrap().count, 20);
    }
}
