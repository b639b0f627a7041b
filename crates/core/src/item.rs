//! Item stacks and the merge/split helpers every container builds on.
//!
//! A slot holds `Option<ItemStack>`: `None` is the canonical empty stack and
//! carries no identity, and a `Some` stack always has `count >= 1`. The
//! helpers here keep that invariant, so callers never observe a zero-count
//! stack.

use crate::registry::RegistryKey;
use serde::{Deserialize, Serialize};

/// Upper bound for any per-item or per-container stack size.
pub const MAX_STACK_LIMIT: u16 = 99;

/// Stack size used for most items.
pub const DEFAULT_MAX_STACK_SIZE: u16 = 64;

/// Item definition: identity plus intrinsic maximum stack size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    key: RegistryKey,
    max_stack_size: u16,
}

impl Item {
    /// Define an item. The stack size is clamped into `1..=MAX_STACK_LIMIT`.
    pub fn new(key: RegistryKey, max_stack_size: u16) -> Self {
        Self {
            key,
            max_stack_size: max_stack_size.clamp(1, MAX_STACK_LIMIT),
        }
    }

    /// Registry key of this item.
    pub fn key(&self) -> &RegistryKey {
        &self.key
    }

    /// Intrinsic maximum stack size.
    pub fn max_stack_size(&self) -> u16 {
        self.max_stack_size
    }

    /// A stack of `count` units (clamped to the item's maximum).
    pub fn stack(&self, count: u16) -> ItemStack {
        ItemStack {
            item: self.key.clone(),
            count: count.min(self.max_stack_size),
            max_stack_size: self.max_stack_size,
            components: None,
        }
    }
}

/// A stack of identical items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Item identity.
    pub item: RegistryKey,
    /// Number of units (1..=max_stack_size while stored in a slot).
    pub count: u16,
    max_stack_size: u16,
    /// Opaque component blob (damage, names, enchantments...). Participates in
    /// merge identity.
    pub components: Option<Vec<u8>>,
}

impl ItemStack {
    /// Create a stack for `item` with an explicit intrinsic maximum.
    pub fn new(item: RegistryKey, count: u16, max_stack_size: u16) -> Self {
        Item::new(item, max_stack_size).stack(count)
    }

    /// Attach a component blob.
    pub fn with_components(mut self, components: Vec<u8>) -> Self {
        self.components = Some(components);
        self
    }

    /// Intrinsic maximum stack size for this item.
    pub fn max_stack_size(&self) -> u16 {
        self.max_stack_size
    }

    /// Whether two stacks may share a slot: same item and equal components.
    pub fn is_same_item_same_components(&self, other: &ItemStack) -> bool {
        self.item == other.item && self.components == other.components
    }

    /// Whether this stack holds its item's maximum.
    pub fn is_full(&self) -> bool {
        self.count >= self.max_stack_size
    }

    /// Units that still fit under `limit` (further capped by the item maximum).
    pub fn room_under(&self, limit: u16) -> u16 {
        limit.min(self.max_stack_size).saturating_sub(self.count)
    }

    /// Copy with a different count (identity and components preserved).
    pub fn copy_with_count(&self, count: u16) -> ItemStack {
        ItemStack {
            count,
            ..self.clone()
        }
    }

    /// Add units, returning how many did not fit under the item maximum.
    pub fn grow(&mut self, amount: u16) -> u16 {
        let added = amount.min(self.max_stack_size.saturating_sub(self.count));
        self.count += added;
        amount - added
    }

    /// Remove up to `amount` units, returning how many were removed.
    pub fn shrink(&mut self, amount: u16) -> u16 {
        let removed = amount.min(self.count);
        self.count -= removed;
        removed
    }

    /// Clamp the count to `limit` (used when a container has a lower maximum).
    pub fn limit_size(&mut self, limit: u16) {
        self.count = self.count.min(limit);
    }
}

/// Move units from `src` into `dst`, never exceeding `limit` (or the item's
/// own maximum) in `dst`.
///
/// Moves only when `dst` is empty or holds a mergeable stack. Returns the
/// number of units moved; 0 is a valid outcome, not an error. A source that
/// is drained becomes `None`.
pub fn try_merge(dst: &mut Option<ItemStack>, src: &mut Option<ItemStack>, limit: u16) -> u16 {
    let Some(source) = src.as_mut() else {
        return 0;
    };

    let moved = match dst.as_mut() {
        None => {
            let moved = source.count.min(limit.min(source.max_stack_size()));
            if moved > 0 {
                *dst = Some(source.copy_with_count(moved));
            }
            moved
        }
        Some(target) if target.is_same_item_same_components(source) => {
            let moved = source.count.min(target.room_under(limit));
            target.count += moved;
            moved
        }
        Some(_) => 0,
    };

    source.count -= moved;
    if source.count == 0 {
        *src = None;
    }
    moved
}

/// Take exactly `min(n, count)` units out of `slot` as a new stack.
///
/// Taking every unit leaves the slot canonically empty. Returns `None` when
/// nothing was taken.
pub fn split_slot(slot: &mut Option<ItemStack>, n: u16) -> Option<ItemStack> {
    let stack = slot.as_mut()?;
    if n == 0 {
        return None;
    }
    if n >= stack.count {
        return slot.take();
    }
    stack.count -= n;
    Some(stack.copy_with_count(n))
}
