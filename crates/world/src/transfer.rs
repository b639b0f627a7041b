//! Hopper transfer arbitration.
//!
//! Each tick a hopper's [`TransferArbiter`] counts its cooldown down. Once
//! ready (and enabled) the hopper ejects into the container it faces, then
//! pulls from the container above or from item entities resting on it. Any
//! move puts it back on cooldown.
//!
//! When a move lands in another hopper that was empty, the receiving hopper
//! is put on cooldown too. It gets one tick less when it has already ticked
//! at least as recently as the mover, so the outcome does not depend on which
//! of two hoppers runs first within a tick. Two hoppers feeding each other
//! settle into alternating transfers instead of stalling or double-moving.

use crate::block::Block;
use crate::block_entity::BlockEntity;
use crate::config::TransferConfig;
use crate::container::Container;
use crate::dispenser::DispenserBlockEntity;
use crate::entity::{EntityId, EntityKind};
use crate::face::{self, can_place_item, can_take_item};
use crate::hopper::HopperBlockEntity;
use crate::world::{MoveKind, World, WorldEvent};
use mdlogistics_core::{
    split_slot, try_merge, Aabb, BlockPos, Direction, ItemStack, RegistryKey, SimTick, Vec3,
    MAX_STACK_LIMIT,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Cooldown state of one hopper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferArbiter {
    /// `<= 0` ready, `> 0` blocked. Not clamped at zero.
    pub cooldown: i32,
    /// Tick at which this arbiter last ran.
    pub last_active_tick: u64,
    /// Output direction.
    pub facing: Direction,
}

impl TransferArbiter {
    pub fn new(facing: Direction) -> Self {
        Self {
            cooldown: 0,
            last_active_tick: 0,
            facing,
        }
    }

    /// Blocked this tick.
    pub fn is_on_cooldown(&self) -> bool {
        self.cooldown > 0
    }

    /// Cooldown longer than a regular transfer sets (e.g. from config or
    /// commands). The cross-hopper rule leaves such cooldowns alone.
    pub fn is_on_custom_cooldown(&self, cfg: &TransferConfig) -> bool {
        self.cooldown > cfg.transfer_cooldown
    }

    /// Count down one tick and stamp the tick. Returns whether the arbiter
    /// is ready.
    pub fn begin_tick(&mut self, now: SimTick) -> bool {
        self.cooldown -= 1;
        self.last_active_tick = now.0;
        !self.is_on_cooldown()
    }
}

/// Where a hopper pulls from after ejecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PullSource {
    /// Container above, or item entities in the capture volume.
    Above,
    /// One specific item entity (reported touching the hopper).
    Entity(EntityId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EjectOutcome {
    Moved(RegistryKey, u16),
    /// Target has room, but none of the hopper's stacks fit.
    Stuck,
    /// No target, or the target is full from the hopper's side.
    Nothing,
}

/// Capture volume above a hopper: the bowl plus the block above it.
pub fn suck_area(pos: BlockPos) -> Aabb {
    let (x, y, z) = (pos.x as f64, pos.y as f64, pos.z as f64);
    Aabb::new(
        Vec3::new(x, y + 11.0 / 16.0, z),
        Vec3::new(x + 1.0, y + 2.0, z + 1.0),
    )
}

/// Tick callback for the hopper at `pos`. The hopper is out of the arena for
/// the duration.
pub(crate) fn tick_hopper(
    world: &mut World,
    pos: BlockPos,
    facing: Direction,
    enabled: bool,
    hopper: &mut HopperBlockEntity,
) {
    hopper.arbiter.facing = facing;
    if !hopper.arbiter.begin_tick(world.current_tick()) {
        return;
    }
    let check_interval = world.config.check_interval;
    if !try_move_items(world, pos, enabled, hopper, PullSource::Above) && check_interval > 1 {
        hopper.arbiter.cooldown = check_interval;
    }
}

fn try_move_items(
    world: &mut World,
    pos: BlockPos,
    enabled: bool,
    hopper: &mut HopperBlockEntity,
    pull: PullSource,
) -> bool {
    let cfg = world.config;
    if hopper.arbiter.is_on_cooldown() || !enabled {
        return false;
    }

    let mut moved = false;
    if !hopper.is_empty() {
        match eject(world, pos, hopper, &cfg) {
            EjectOutcome::Moved(item, count) => {
                world.events.push(WorldEvent::ItemsMoved {
                    at: pos,
                    kind: MoveKind::Push,
                    item,
                    count,
                });
                moved = true;
            }
            EjectOutcome::Stuck if cfg.cooldown_when_full => {
                hopper.arbiter.cooldown = cfg.transfer_cooldown;
            }
            EjectOutcome::Stuck | EjectOutcome::Nothing => {}
        }
    }

    if !hopper.is_full() {
        moved |= match pull {
            PullSource::Above => suck(world, pos, hopper, &cfg),
            PullSource::Entity(id) => absorb(world, pos, hopper, id, &cfg),
        };
    }

    if moved {
        hopper.arbiter.cooldown = cfg.transfer_cooldown;
        hopper.set_changed();
    }
    moved
}

/// Push up to `items_per_transfer` units of the first movable stack into the
/// container the hopper faces.
fn eject(
    world: &mut World,
    pos: BlockPos,
    hopper: &mut HopperBlockEntity,
    cfg: &TransferConfig,
) -> EjectOutcome {
    let facing = hopper.arbiter.facing;
    let Some(handle) = world.locate(pos.relative(facing)) else {
        return EjectOutcome::Nothing;
    };
    let face = facing.opposite();
    let source_tick = hopper.arbiter.last_active_tick;

    world
        .with_container(handle, |dest| {
            if face::is_full_from(dest, face) {
                return EjectOutcome::Nothing;
            }
            for slot in 0..hopper.size() {
                let Some(stack) = hopper.get(slot) else {
                    continue;
                };
                let amount = cfg.items_per_transfer.min(stack.count);
                let Some(moving) = split_slot(hopper.slot_mut(slot), amount) else {
                    continue;
                };
                let leftover = add_item(Some(source_tick), dest, moving, Some(face), cfg);
                let moved = amount - restore(hopper, slot, leftover);
                if moved > 0 {
                    trace!(?pos, ?face, item = %stack.item, moved, "hopper ejected");
                    return EjectOutcome::Moved(stack.item, moved);
                }
            }
            EjectOutcome::Stuck
        })
        .unwrap_or(EjectOutcome::Nothing)
}

/// Put `leftover` back into `slot` it was split from. Returns the units put
/// back.
fn restore<C: Container + ?Sized>(
    container: &mut C,
    slot: usize,
    leftover: Option<ItemStack>,
) -> u16 {
    let Some(rest) = leftover else {
        return 0;
    };
    let count = rest.count;
    let mut rest = Some(rest);
    try_merge(container.slot_mut(slot), &mut rest, MAX_STACK_LIMIT);
    debug_assert!(rest.is_none(), "split units must fit back into their slot");
    count
}

/// Pull from the container above; without one, absorb item entities in the
/// capture volume unless a full solid block sits on the hopper.
fn suck(
    world: &mut World,
    pos: BlockPos,
    hopper: &mut HopperBlockEntity,
    cfg: &TransferConfig,
) -> bool {
    let above = pos.above();
    if let Some(handle) = world.locate(above) {
        let taken = world
            .with_container(handle, |src| {
                face::slots_for(&*src, Some(Direction::Down))
                    .into_iter()
                    .find_map(|slot| take_from_slot(hopper, src, slot, Direction::Down, cfg))
            })
            .flatten();
        let Some((item, count)) = taken else {
            return false;
        };
        world.events.push(WorldEvent::ItemsMoved {
            at: pos,
            kind: MoveKind::Pull,
            item,
            count,
        });
        return true;
    }

    if world.block(above).is_full_solid() {
        return false;
    }

    let area = suck_area(pos);
    let candidates: Vec<EntityId> = world
        .entities
        .values()
        .filter(|entity| entity.item().is_some() && entity.bounding_box().intersects(&area))
        .map(|entity| entity.id)
        .collect();
    candidates
        .into_iter()
        .any(|id| absorb(world, pos, hopper, id, cfg))
}

/// Move up to `items_per_transfer` units out of `src[slot]` into the hopper.
fn take_from_slot(
    hopper: &mut HopperBlockEntity,
    src: &mut dyn Container,
    slot: usize,
    face: Direction,
    cfg: &TransferConfig,
) -> Option<(RegistryKey, u16)> {
    let stack = src.get(slot)?;
    if !can_take_item(&*hopper, &*src, &stack, slot, face) {
        return None;
    }
    let amount = cfg.items_per_transfer.min(stack.count);
    let source_tick = src.arbiter().map(|arbiter| arbiter.last_active_tick);
    let taken = split_slot(src.slot_mut(slot), amount)?;
    let leftover = add_item(source_tick, hopper, taken, None, cfg);
    let moved = amount - restore(src, slot, leftover);
    if moved == 0 {
        if cfg.cooldown_when_full {
            hopper.arbiter.cooldown = cfg.transfer_cooldown;
        }
        return None;
    }
    src.set_changed();
    Some((stack.item, moved))
}

/// Absorb the item entity `id` into the hopper. True only when the whole
/// stack went in (the entity is then removed); a partial absorb leaves the
/// remainder on the entity.
fn absorb(
    world: &mut World,
    pos: BlockPos,
    hopper: &mut HopperBlockEntity,
    id: EntityId,
    cfg: &TransferConfig,
) -> bool {
    let Some(entity) = world.entities.get_mut(&id) else {
        return false;
    };
    let EntityKind::Item(stack) = &mut entity.kind else {
        return false;
    };
    let offered = stack.count;
    let item = stack.item.clone();
    let leftover = add_item(None, hopper, stack.clone(), None, cfg);
    let remaining = leftover.as_ref().map_or(0, |rest| rest.count);
    let absorbed = offered - remaining;
    match leftover {
        Some(rest) => *stack = rest,
        None => {
            world.entities.remove(&id);
        }
    }
    if absorbed > 0 {
        world.events.push(WorldEvent::ItemsMoved {
            at: pos,
            kind: MoveKind::Absorb,
            item,
            count: absorbed,
        });
    }
    remaining == 0
}

/// Insert `stack` into `dest` through `face` (`None`: unsided), slot by slot
/// in reachable order. Returns what did not fit.
///
/// `source_tick` is the mover's `last_active_tick` when the mover is a
/// hopper; it drives the cooldown given to an idle receiving hopper.
pub fn add_item(
    source_tick: Option<u64>,
    dest: &mut dyn Container,
    stack: ItemStack,
    face: Option<Direction>,
    cfg: &TransferConfig,
) -> Option<ItemStack> {
    let mut stack = Some(stack);
    for slot in face::slots_for(&*dest, face) {
        if stack.is_none() {
            break;
        }
        try_move_in_item(source_tick, dest, &mut stack, slot, face, cfg);
    }
    stack
}

fn try_move_in_item(
    source_tick: Option<u64>,
    dest: &mut dyn Container,
    stack: &mut Option<ItemStack>,
    slot: usize,
    face: Option<Direction>,
    cfg: &TransferConfig,
) {
    let Some(incoming) = stack.as_ref() else {
        return;
    };
    if !can_place_item(&*dest, incoming, slot, face) {
        return;
    }
    let was_empty = dest.is_empty();
    if dest.merge_into(slot, stack) == 0 {
        return;
    }

    if was_empty {
        if let Some(arbiter) = dest.arbiter_mut() {
            if !arbiter.is_on_custom_cooldown(cfg) {
                let offset = match source_tick {
                    Some(tick) if arbiter.last_active_tick >= tick => 1,
                    _ => 0,
                };
                arbiter.cooldown = cfg.transfer_cooldown - offset;
            }
        }
    }
    dest.set_changed();
}

/// Whether `dest` has no room reachable from `face`.
pub fn is_full_from(dest: &mut dyn Container, face: Direction) -> bool {
    face::is_full_from(dest, face)
}

impl World {
    /// Report that item entity `entity` touches the hopper at `pos`. Runs the
    /// hopper's move pipeline with that entity as the only pull source.
    pub fn entity_inside(&mut self, pos: BlockPos, entity: EntityId) -> bool {
        let Block::Hopper { facing, enabled } = self.block(pos) else {
            return false;
        };
        let touching = self.entities.get(&entity).is_some_and(|e| {
            e.item().is_some() && e.bounding_box().intersects(&suck_area(pos))
        });
        if !touching {
            return false;
        }
        let Some(mut be) = self.block_entities.remove(&pos) else {
            return false;
        };
        let moved = match be.as_hopper_mut() {
            Some(hopper) => {
                hopper.arbiter.facing = facing;
                try_move_items(self, pos, enabled, hopper, PullSource::Entity(entity))
            }
            None => false,
        };
        self.block_entities.insert(pos, be);
        moved
    }

    /// Fire the dispenser at `pos` as a dropper: one unit from a random
    /// occupied slot goes into the container in front, or is dropped as an
    /// item entity when there is none.
    pub fn dispense(&mut self, pos: BlockPos) -> bool {
        let Block::Dispenser { facing } = self.block(pos) else {
            return false;
        };
        let Some(mut be) = self.block_entities.remove(&pos) else {
            return false;
        };
        let fired = match &mut be {
            BlockEntity::Dispenser(dispenser) => self.dispense_from(pos, facing, dispenser),
            _ => false,
        };
        self.block_entities.insert(pos, be);
        fired
    }

    fn dispense_from(
        &mut self,
        pos: BlockPos,
        facing: Direction,
        dispenser: &mut DispenserBlockEntity,
    ) -> bool {
        let Some(slot) = dispenser.random_slot(&mut self.rng) else {
            debug!(?pos, "dispenser is empty");
            return false;
        };
        let Some(stack) = dispenser.get(slot) else {
            return false;
        };
        let cfg = self.config;

        if let Some(handle) = self.locate(pos.relative(facing)) {
            let one = stack.copy_with_count(1);
            let leftover =
                self.with_container(handle, |dest| add_item(None, dest, one, Some(facing.opposite()), &cfg));
            if !matches!(leftover, Some(None)) {
                return false;
            }
            dispenser.remove(slot, 1);
            self.events.push(WorldEvent::ItemsMoved {
                at: pos,
                kind: MoveKind::Dispense,
                item: stack.item,
                count: 1,
            });
            return true;
        }

        let Some(dropped) = dispenser.remove(slot, 1) else {
            return false;
        };
        let (dx, dy, dz) = facing.offset();
        let center = pos.center();
        let at = Vec3::new(
            center.x + 0.7 * dx as f64,
            center.y + 0.7 * dy as f64 - 0.125,
            center.z + 0.7 * dz as f64,
        );
        self.spawn_item(at, dropped);
        self.events.push(WorldEvent::ItemsMoved {
            at: pos,
            kind: MoveKind::Drop,
            item: stack.item,
            count: 1,
        });
        true
    }
}
