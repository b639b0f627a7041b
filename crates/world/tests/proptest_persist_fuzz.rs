//! Persistence fuzzing.
//!
//! Properties:
//! - decoding arbitrary bytes returns an error instead of panicking
//! - every single-byte corruption of a valid snapshot is rejected
//! - arbitrary (but object-shaped) block entity records load without panics
//!   and always produce slots within their limits

use mdlogistics_core::{BlockPos, Direction, ItemStack, RegistryKey, MAX_STACK_LIMIT};
use mdlogistics_world::{
    block_entity_from_record, decode_snapshot, encode_snapshot, Block, TransferConfig, World,
};
use proptest::prelude::*;
use serde_json::{json, Value};

fn sample_snapshot() -> Vec<u8> {
    let mut world = World::new(99, TransferConfig::default());
    world.set_block(BlockPos::new(0, 65, 0), Block::Barrel);
    world.set_block(BlockPos::new(0, 64, 0), Block::hopper(Direction::Down));
    if let Some(barrel) = world.container_mut(BlockPos::new(0, 65, 0)) {
        barrel.set(0, Some(ItemStack::new(RegistryKey::mdm("stone"), 20, 64)));
    }
    world.run(3);
    encode_snapshot(&world).unwrap()
}

fn json_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        (-2.0f64..200.0).prop_map(Value::from),
        "[a-z:/_]{0,16}".prop_map(Value::from),
        Just(json!("mdm:stone")),
    ]
}

fn item_entry() -> impl Strategy<Value = Value> {
    (json_scalar(), json_scalar(), json_scalar(), json_scalar(), 0u8..4).prop_map(
        |(slot, count, max, components, shape)| match shape {
            0 => json!({ "Slot": slot, "id": "mdm:dirt", "count": count }),
            1 => json!({ "Slot": 1, "id": "mdm:dirt", "count": count, "max_stack_size": max }),
            2 => json!({ "Slot": 0, "id": slot, "count": 3, "components": components }),
            _ => slot,
        },
    )
}

fn record() -> impl Strategy<Value = Value> {
    (
        prop::sample::select(vec![
            "mdm:chest",
            "mdm:barrel",
            "mdm:hopper",
            "mdm:dispenser",
            "mdm:furnace",
        ]),
        prop::option::of(prop::collection::vec(item_entry(), 0..8)),
        prop::option::of(json_scalar()),
        prop::option::of(json_scalar()),
        prop::option::of(json_scalar()),
    )
        .prop_map(|(id, items, loot, seed, cooldown)| {
            let mut record = json!({ "id": id });
            if let Some(items) = items {
                record["Items"] = Value::Array(items);
            }
            if let Some(loot) = loot {
                record["LootTable"] = loot;
            }
            if let Some(seed) = seed {
                record["LootTableSeed"] = seed;
            }
            if let Some(cooldown) = cooldown {
                record["TransferCooldown"] = cooldown;
            }
            record
        })
}

proptest! {
    /// Property: arbitrary bytes never panic the decoder.
    #[test]
    fn decode_arbitrary_bytes_does_not_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_snapshot(&bytes, TransferConfig::default());
    }

    /// Property: a valid header followed by garbage is rejected.
    #[test]
    fn valid_header_with_garbage_payload_is_rejected(
        garbage in prop::collection::vec(any::<u8>(), 1..128),
    ) {
        let mut bytes = sample_snapshot();
        bytes.truncate(14);
        bytes.extend_from_slice(&garbage);
        prop_assert!(decode_snapshot(&bytes, TransferConfig::default()).is_err());
    }

    /// Property: flipping any bit of any byte is detected.
    #[test]
    fn single_byte_corruption_is_rejected(index in any::<prop::sample::Index>(), flip in 1u8..=255) {
        let mut bytes = sample_snapshot();
        let at = index.index(bytes.len());
        bytes[at] ^= flip;
        prop_assert!(decode_snapshot(&bytes, TransferConfig::default()).is_err());
    }

    /// Property: known-kind records always load, with canonical slots.
    #[test]
    fn arbitrary_records_load_with_valid_slots(record in record()) {
        let be = block_entity_from_record(&record);
        prop_assert!(be.is_ok(), "{:?}", be);
        let be = be.unwrap();
        for stack in be.inventory().raw_slots().iter().flatten() {
            prop_assert!(stack.count >= 1);
            prop_assert!(stack.count <= stack.max_stack_size());
            prop_assert!(stack.max_stack_size() <= MAX_STACK_LIMIT);
        }
    }
}
