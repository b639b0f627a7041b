//! Direction-restricted slot access.
//!
//! A container without a [`FaceSlotMap`] exposes every slot to every face and
//! only its own placement rules apply.

use crate::container::Container;
use mdlogistics_core::{Direction, ItemStack};

/// Which slots a face reaches, and whether insertion/extraction through that
/// face is allowed.
pub trait FaceSlotMap {
    /// Slot indices reachable from `face`, in scan order.
    fn slots_for_face(&self, face: Direction) -> Vec<usize>;

    /// May `stack` enter `slot` through `face`? `None` means an unsided insert.
    fn can_place_through_face(&self, slot: usize, stack: &ItemStack, face: Option<Direction>)
        -> bool;

    /// May `stack` leave `slot` through `face`?
    fn can_take_through_face(&self, slot: usize, stack: &ItemStack, face: Direction) -> bool;
}

/// Slots of `container` reachable from `face`. All slots when the container
/// has no face map or the access is unsided.
pub fn slots_for<C: Container + ?Sized>(container: &C, face: Option<Direction>) -> Vec<usize> {
    match (container.face_slots(), face) {
        (Some(map), Some(face)) => map.slots_for_face(face),
        _ => (0..container.size()).collect(),
    }
}

/// Combined placement rule: the container's own rule and, if present, the face rule.
pub fn can_place_item<C: Container + ?Sized>(
    container: &C,
    stack: &ItemStack,
    slot: usize,
    face: Option<Direction>,
) -> bool {
    container.can_place(slot, stack)
        && container
            .face_slots()
            .map_or(true, |map| map.can_place_through_face(slot, stack, face))
}

/// Combined removal rule, asymmetric like the transfer it guards: `source`
/// must allow `requester` to take the item, and the face rule must allow it
/// to leave through `face`.
pub fn can_take_item<C: Container + ?Sized>(
    requester: &dyn Container,
    source: &C,
    stack: &ItemStack,
    slot: usize,
    face: Direction,
) -> bool {
    source.can_take(requester, slot, stack)
        && source
            .face_slots()
            .map_or(true, |map| map.can_take_through_face(slot, stack, face))
}

/// True when every slot reachable from `face` holds its item's maximum.
/// Empty slots are never full.
pub fn is_full_from<C: Container + ?Sized>(container: &mut C, face: Direction) -> bool {
    container.ensure_resolved();
    slots_for(container, Some(face))
        .into_iter()
        .all(|slot| match container.slot_ref(slot) {
            Some(stack) => stack.count >= stack.max_stack_size(),
            None => false,
        })
}
