//! Hopper chain worldtests.
//!
//! Steps small hopper layouts tick by tick through the micro-worldtest
//! harness and checks the observable timing:
//! - a barrel -> hopper -> barrel chain moves one item per 8 ticks
//! - two hoppers facing each other alternate instead of stalling
//! - the receiving hopper's delay does not depend on tick order

use mdlogistics_core::{BlockPos, Direction, ItemStack, RegistryKey, Vec3};
use mdlogistics_testkit::{run_micro_worldtest, MicroWorldtestConfig};
use mdlogistics_world::{Block, Container, MoveKind, TransferConfig, World, WorldEvent};
use serde::Serialize;

fn stone(count: u16) -> ItemStack {
    ItemStack::new(RegistryKey::mdm("stone"), count, 64)
}

fn count_at(world: &World, pos: BlockPos) -> u64 {
    world
        .block_entity(pos)
        .map(|be| {
            be.inventory()
                .raw_slots()
                .iter()
                .flatten()
                .map(|s| s.count as u64)
                .sum()
        })
        .unwrap_or(0)
}

fn cooldown_at(world: &World, pos: BlockPos) -> i32 {
    world
        .block_entity(pos)
        .and_then(|be| be.as_hopper())
        .map(|h| h.arbiter.cooldown)
        .unwrap_or_default()
}

fn pushes_by(events: &[(u64, WorldEvent)], at: BlockPos) -> Vec<u64> {
    events
        .iter()
        .filter_map(|(tick, event)| match event {
            WorldEvent::ItemsMoved {
                at: mover,
                kind: MoveKind::Push,
                ..
            } if *mover == at => Some(*tick),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct ChainFrame {
    source: u64,
    hopper: u64,
    sink: u64,
    cooldown: i32,
}

#[test]
fn barrel_hopper_barrel_chain_drains_at_hopper_rate() {
    let a = BlockPos::new(0, 66, 0);
    let b = BlockPos::new(0, 65, 0);
    let c = BlockPos::new(0, 64, 0);

    let mut world = World::new(7, TransferConfig::default());
    world.set_block(a, Block::Barrel);
    world.set_block(b, Block::hopper(Direction::Down));
    world.set_block(c, Block::Barrel);
    world.container_mut(a).unwrap().set(0, Some(stone(64)));

    let frames = run_micro_worldtest(
        MicroWorldtestConfig::new("barrel_hopper_barrel", 513),
        world,
        |_, world| world.step(),
        |_, world| ChainFrame {
            source: count_at(world, a),
            hopper: count_at(world, b),
            sink: count_at(world, c),
            cooldown: cooldown_at(world, b),
        },
    )
    .unwrap();

    assert_eq!(frames[0].snapshot.source, 64);
    let first = frames[1].snapshot;
    assert_eq!((first.source, first.hopper, first.sink), (63, 1, 0));
    assert_eq!(first.cooldown, 8);

    // Blocked for the next seven ticks.
    for (offset, frame) in frames[2..=8].iter().enumerate() {
        assert_eq!(frame.snapshot.cooldown, 7 - offset as i32);
        assert_eq!(frame.snapshot.sink, 0);
    }

    let ninth = frames[9].snapshot;
    assert_eq!(ninth.sink, 1, "first item reaches the sink on tick 9");
    assert_eq!(ninth.hopper, 1);
    assert_eq!(ninth.source, 62);

    let last = frames[513].snapshot;
    assert_eq!((last.source, last.hopper, last.sink), (0, 0, 64));

    for frame in &frames {
        let s = frame.snapshot;
        assert_eq!(s.source + s.hopper + s.sink, 64, "tick {}", frame.tick);
    }
}

#[test]
fn facing_hoppers_alternate_without_stalling() {
    let a = BlockPos::new(0, 64, 0);
    let b = BlockPos::new(1, 64, 0);
    let mut world = World::new(1, TransferConfig::default());
    world.set_block(a, Block::hopper(Direction::East));
    world.set_block(b, Block::hopper(Direction::West));
    world.container_mut(a).unwrap().set(0, Some(stone(1)));
    world.container_mut(b).unwrap().set(0, Some(stone(1)));

    let mut events = Vec::new();
    for _ in 0..100 {
        world.step();
        let tick = world.current_tick().0;
        assert_eq!(world.total_count(&RegistryKey::mdm("stone")), 2);
        events.extend(world.drain_events().into_iter().map(|e| (tick, e)));
    }

    let from_a = pushes_by(&events, a);
    let from_b = pushes_by(&events, b);
    assert!(from_a.len() >= 10, "a pushed {from_a:?}");
    assert!(from_b.len() >= 10, "b pushed {from_b:?}");

    for pushes in [&from_a, &from_b] {
        for pair in pushes.windows(2) {
            assert!(pair[1] - pair[0] >= 7, "pushes too close: {pushes:?}");
        }
    }

    // Event order: a, b, a, b, ...
    let order: Vec<BlockPos> = events
        .iter()
        .filter_map(|(_, e)| match e {
            WorldEvent::ItemsMoved {
                at,
                kind: MoveKind::Push,
                ..
            } => Some(*at),
            _ => None,
        })
        .collect();
    for (i, at) in order.iter().enumerate() {
        let expected = if i % 2 == 0 { a } else { b };
        assert_eq!(*at, expected, "push #{i}");
    }
}

/// Source hopper with one item pushing sideways into an empty hopper that
/// faces down into a barrel. Returns the tick of the receiver's first push.
fn receiver_first_push(source: BlockPos, receiver: BlockPos) -> u64 {
    let facing = if receiver.x < source.x {
        Direction::West
    } else {
        Direction::East
    };
    let sink = BlockPos::new(receiver.x, receiver.y - 1, receiver.z);

    let mut world = World::new(3, TransferConfig::default());
    world.set_block(source, Block::hopper(facing));
    world.set_block(receiver, Block::hopper(Direction::Down));
    world.set_block(sink, Block::Barrel);
    world.container_mut(source).unwrap().set(0, Some(stone(1)));

    for _ in 0..20 {
        world.step();
        let tick = world.current_tick().0;
        let pushed = world.drain_events().iter().any(|e| {
            matches!(e, WorldEvent::ItemsMoved { at, kind: MoveKind::Push, .. } if *at == receiver)
        });
        if pushed {
            return tick;
        }
    }
    panic!("receiver never pushed");
}

#[test]
fn receiver_delay_is_independent_of_tick_order() {
    // Receiver ticks before the source (lower x).
    let receiver_first = receiver_first_push(BlockPos::new(1, 64, 0), BlockPos::new(0, 64, 0));
    // Source ticks before the receiver.
    let source_first = receiver_first_push(BlockPos::new(0, 64, 0), BlockPos::new(1, 64, 0));

    assert_eq!(receiver_first, 8);
    assert_eq!(source_first, 8);
}

#[test]
fn disabled_hopper_keeps_counting_down_but_moves_nothing() {
    let pos = BlockPos::new(0, 64, 0);
    let below = BlockPos::new(0, 63, 0);
    let mut world = World::new(5, TransferConfig::default());
    world.set_block(
        pos,
        Block::Hopper {
            facing: Direction::Down,
            enabled: false,
        },
    );
    world.set_block(below, Block::Barrel);
    world.container_mut(pos).unwrap().set(0, Some(stone(3)));

    world.run(20);
    assert_eq!(count_at(&world, pos), 3);
    assert_eq!(count_at(&world, below), 0);
    assert_eq!(cooldown_at(&world, pos), -20);
    assert!(world.drain_events().is_empty());

    assert!(world.set_hopper_enabled(pos, true));
    world.step();
    assert_eq!(count_at(&world, below), 1);
    assert_eq!(cooldown_at(&world, pos), 8);
}

fn dirt(count: u16) -> ItemStack {
    ItemStack::new(RegistryKey::mdm("dirt"), count, 64)
}

fn with_cooldown_when_full(cooldown_when_full: bool) -> World {
    World::new(
        5,
        TransferConfig {
            cooldown_when_full,
            ..TransferConfig::default()
        },
    )
}

#[test]
fn full_target_falls_through_to_pull() {
    for cooldown_when_full in [true, false] {
        let (above, pos, below) = (
            BlockPos::new(0, 65, 0),
            BlockPos::new(0, 64, 0),
            BlockPos::new(0, 63, 0),
        );
        let mut world = with_cooldown_when_full(cooldown_when_full);
        world.set_block(above, Block::Barrel);
        world.set_block(pos, Block::hopper(Direction::Down));
        world.set_block(below, Block::Barrel);
        world.container_mut(above).unwrap().set(0, Some(stone(10)));
        world.container_mut(pos).unwrap().set(0, Some(stone(1)));
        let barrel = world.container_mut(below).unwrap();
        for slot in 0..barrel.size() {
            barrel.set(slot, Some(stone(64)));
        }

        world.step();
        assert_eq!(count_at(&world, above), 9);
        assert_eq!(count_at(&world, pos), 2);
        assert_eq!(cooldown_at(&world, pos), 8);
    }
}

#[test]
fn full_target_alone_sets_no_cooldown() {
    for cooldown_when_full in [true, false] {
        let pos = BlockPos::new(0, 64, 0);
        let below = BlockPos::new(0, 63, 0);
        let mut world = with_cooldown_when_full(cooldown_when_full);
        world.set_block(pos, Block::hopper(Direction::Down));
        world.set_block(below, Block::Barrel);
        world.container_mut(pos).unwrap().set(0, Some(stone(1)));
        let barrel = world.container_mut(below).unwrap();
        for slot in 0..barrel.size() {
            barrel.set(slot, Some(stone(64)));
        }

        world.step();
        assert_eq!((cooldown_at(&world, pos), count_at(&world, pos)), (-1, 1));
    }
}

#[test]
fn unmergeable_target_applies_cooldown_only_when_configured() {
    let run = |cooldown_when_full: bool| {
        let pos = BlockPos::new(0, 64, 0);
        let below = BlockPos::new(0, 63, 0);
        let mut world = with_cooldown_when_full(cooldown_when_full);
        world.set_block(pos, Block::hopper(Direction::Down));
        world.set_block(below, Block::Barrel);
        world.container_mut(pos).unwrap().set(0, Some(stone(1)));
        // Room left in every slot, but none for stone.
        let barrel = world.container_mut(below).unwrap();
        for slot in 0..barrel.size() {
            barrel.set(slot, Some(dirt(63)));
        }
        world.step();
        (cooldown_at(&world, pos), count_at(&world, pos))
    };

    assert_eq!(run(true), (8, 1));
    assert_eq!(run(false), (-1, 1));
}

#[test]
fn failed_pull_applies_cooldown_only_when_configured() {
    let run = |cooldown_when_full: bool| {
        let above = BlockPos::new(0, 65, 0);
        let pos = BlockPos::new(0, 64, 0);
        let mut world = with_cooldown_when_full(cooldown_when_full);
        world.set_block(above, Block::Barrel);
        world.set_block(pos, Block::hopper(Direction::Down));
        world.container_mut(above).unwrap().set(0, Some(stone(10)));
        // Not full, but every slot holds something else.
        let hopper = world.container_mut(pos).unwrap();
        for slot in 0..hopper.size() {
            hopper.set(slot, Some(dirt(1)));
        }
        world.step();
        (cooldown_at(&world, pos), count_at(&world, above))
    };

    assert_eq!(run(true), (8, 10));
    assert_eq!(run(false), (-1, 10));
}

#[test]
fn idle_hopper_waits_check_interval_between_attempts() {
    let pos = BlockPos::new(0, 64, 0);
    let config = TransferConfig {
        check_interval: 4,
        ..TransferConfig::default()
    };
    let mut world = World::new(5, config);
    world.set_block(pos, Block::hopper(Direction::Down));

    world.step();
    assert_eq!(cooldown_at(&world, pos), 4);
    world.run(3);
    assert_eq!(cooldown_at(&world, pos), 1);
    world.step();
    assert_eq!(cooldown_at(&world, pos), 4);
}

#[test]
fn check_interval_applies_to_disabled_hoppers() {
    let pos = BlockPos::new(0, 64, 0);
    let config = TransferConfig {
        check_interval: 4,
        ..TransferConfig::default()
    };
    let mut world = World::new(5, config);
    world.set_block(
        pos,
        Block::Hopper {
            facing: Direction::Down,
            enabled: false,
        },
    );

    world.step();
    assert_eq!(cooldown_at(&world, pos), 4);
}

#[test]
fn entity_contact_does_not_apply_check_interval() {
    let pos = BlockPos::new(0, 64, 0);
    let config = TransferConfig {
        check_interval: 4,
        ..TransferConfig::default()
    };
    let mut world = World::new(5, config);
    world.set_block(pos, Block::hopper(Direction::Down));
    let hopper = world.container_mut(pos).unwrap();
    for slot in 0..hopper.size() {
        hopper.set(slot, Some(dirt(64)));
    }
    let item = world.spawn_item(Vec3::new(0.5, 64.8, 0.5), stone(3));

    assert!(!world.entity_inside(pos, item));
    assert_eq!(cooldown_at(&world, pos), 0);
    assert!(world.entity(item).is_some());
}

#[test]
fn items_per_transfer_moves_larger_batches() {
    let a = BlockPos::new(0, 66, 0);
    let b = BlockPos::new(0, 65, 0);
    let config = TransferConfig {
        items_per_transfer: 4,
        ..TransferConfig::default()
    };
    let mut world = World::new(2, config);
    world.set_block(a, Block::Barrel);
    world.set_block(b, Block::hopper(Direction::Down));
    world.container_mut(a).unwrap().set(0, Some(stone(10)));

    world.step();
    assert_eq!(count_at(&world, a), 6);
    assert_eq!(count_at(&world, b), 4);
}
