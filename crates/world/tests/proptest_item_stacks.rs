//! Property tests for stack arithmetic and container insertion.
//!
//! Properties:
//! - merging never creates or destroys units
//! - merging never pushes a slot past its cap
//! - splitting takes exactly `min(n, count)` units
//! - `add_item` conserves units and respects per-slot maximums

use mdlogistics_core::{split_slot, try_merge, ItemStack, RegistryKey};
use mdlogistics_world::{add_item, ChestBlockEntity, Container, TransferConfig};
use proptest::prelude::*;

fn key(index: u8) -> RegistryKey {
    match index % 3 {
        0 => RegistryKey::mdm("stone"),
        1 => RegistryKey::mdm("dirt"),
        _ => RegistryKey::mdm("ender_pearl"),
    }
}

fn max_for(index: u8) -> u16 {
    if index % 3 == 2 {
        16
    } else {
        64
    }
}

fn stack(index: u8, count: u16) -> Option<ItemStack> {
    (count > 0).then(|| ItemStack::new(key(index), count, max_for(index)))
}

fn units(slot: &Option<ItemStack>) -> u32 {
    slot.as_ref().map_or(0, |s| s.count as u32)
}

proptest! {
    /// Property: units moved out of the source land in the destination.
    #[test]
    fn merge_conserves_units(
        dst_item in 0u8..3,
        dst_count in 0u16..=64,
        src_item in 0u8..3,
        src_count in 1u16..=64,
        limit in 1u16..=99,
    ) {
        let mut dst = stack(dst_item, dst_count);
        let mut src = stack(src_item, src_count);
        let before = units(&dst) + units(&src);
        let dst_before = units(&dst);

        let moved = try_merge(&mut dst, &mut src, limit);

        prop_assert_eq!(units(&dst) + units(&src), before);
        prop_assert_eq!(units(&dst), dst_before + moved as u32);
        if src.is_some() {
            prop_assert!(src.as_ref().unwrap().count > 0, "drained sources become None");
        }
    }

    /// Property: a merge never raises a slot above `min(limit, item max)`
    /// (a slot already above it is left alone).
    #[test]
    fn merge_respects_cap(
        item in 0u8..3,
        dst_count in 0u16..=64,
        src_count in 1u16..=64,
        limit in 1u16..=99,
    ) {
        let mut dst = stack(item, dst_count);
        let dst_before = units(&dst);
        let mut src = stack(item, src_count);
        let cap = limit.min(max_for(item)) as u32;

        let moved = try_merge(&mut dst, &mut src, limit);
        if moved > 0 {
            prop_assert!(units(&dst) <= cap.max(dst_before));
        }
    }

    /// Property: split takes `min(n, count)` and empties the slot only when
    /// everything was taken.
    #[test]
    fn split_takes_exact_amount(count in 1u16..=64, n in 0u16..=80) {
        let mut slot = stack(0, count);
        let taken = split_slot(&mut slot, n);

        let expected = n.min(count);
        prop_assert_eq!(taken.as_ref().map_or(0, |s| s.count), expected);
        prop_assert_eq!(units(&slot) + expected as u32, count as u32);
        prop_assert_eq!(slot.is_none(), n >= count);
    }

    /// Property: inserting into a partially filled chest conserves units and
    /// keeps every slot within its maximum.
    #[test]
    fn add_item_conserves_and_caps(
        prefill in prop::collection::vec((0u8..3, 0u16..=64), 27),
        offer_item in 0u8..3,
        offer_count in 1u16..=64,
    ) {
        let cfg = TransferConfig::default();
        let mut chest = ChestBlockEntity::new();
        for (slot, (item, count)) in prefill.iter().enumerate() {
            chest.set(slot, stack(*item, *count));
        }
        let before: u32 = chest.contents().iter().map(units).sum();
        let offered = stack(offer_item, offer_count).unwrap();
        let offered_units = offered.count as u32;

        let leftover = add_item(None, &mut chest, offered, None, &cfg);

        let after: u32 = chest.contents().iter().map(units).sum();
        prop_assert_eq!(after + units(&leftover), before + offered_units);
        for slot in chest.contents().iter().flatten() {
            prop_assert!(slot.count <= slot.max_stack_size());
        }
    }
}
