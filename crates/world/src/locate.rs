//! Container discovery by position.
//!
//! Lookup order: a block-state backed container (composter), then the block
//! entity at the position (joined with its partner when it is half of a
//! double chest), then entity-backed containers overlapping the block.

use crate::block::Block;
use crate::composter::ComposterContainer;
use crate::container::{CompoundContainer, Container};
use crate::entity::EntityId;
use crate::world::World;
use mdlogistics_core::{Aabb, BlockPos};
use rand::Rng;
use tracing::trace;

/// Where a located container lives. Resolve with [`World::with_container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerHandle {
    /// Container backed by the block state alone.
    Worldly(BlockPos),
    /// Block entity container.
    Block(BlockPos),
    /// Two chest halves, `first` addressed first.
    Compound { first: BlockPos, second: BlockPos },
    /// Entity-backed container.
    Entity(EntityId),
}

/// Find the container occupying `pos`. `None` means nothing can transfer
/// with that position this tick.
pub fn locate(world: &mut World, pos: BlockPos) -> Option<ContainerHandle> {
    let block = world.block(pos);
    if let Block::Composter { .. } = block {
        return Some(ContainerHandle::Worldly(pos));
    }

    if world.block_entities.contains_key(&pos) {
        if let Some(partner) = world.chest_partner(pos) {
            let (first, second) = match block {
                Block::Chest {
                    kind: crate::block::ChestType::Right,
                    ..
                } => (partner, pos),
                _ => (pos, partner),
            };
            return Some(ContainerHandle::Compound { first, second });
        }
        return Some(ContainerHandle::Block(pos));
    }

    if block.is_full_solid() && world.config.ignore_occluding_blocks {
        return None;
    }

    let area = Aabb::around(pos.center(), 1.0, 1.0);
    let candidates: Vec<EntityId> = world
        .entities
        .values()
        .filter(|entity| entity.is_container() && entity.bounding_box().intersects(&area))
        .map(|entity| entity.id)
        .collect();
    match candidates.len() {
        0 => None,
        1 => Some(ContainerHandle::Entity(candidates[0])),
        n => {
            let pick = world.rng.gen_range(0..n);
            trace!(?pos, candidates = n, pick, "chose among entity containers");
            Some(ContainerHandle::Entity(candidates[pick]))
        }
    }
}

impl World {
    /// Partner half of the double chest at `pos`: the neighbour in the
    /// connected direction must be a chest with the same facing, the opposite
    /// half type, and a block entity.
    pub fn chest_partner(&self, pos: BlockPos) -> Option<BlockPos> {
        let block = self.block(pos);
        let partner = block.chest_partner(pos)?;
        let (
            Block::Chest { facing, kind },
            Block::Chest {
                facing: other_facing,
                kind: other_kind,
            },
        ) = (block, self.block(partner))
        else {
            return None;
        };
        let paired = facing == other_facing
            && kind.opposite() == other_kind
            && self.block_entities.contains_key(&partner);
        paired.then_some(partner)
    }

    /// Find the container at `pos`.
    pub fn locate(&mut self, pos: BlockPos) -> Option<ContainerHandle> {
        locate(self, pos)
    }

    /// Lend the container behind `handle` to `f`. `None` when the handle no
    /// longer resolves (removed block entity, dead entity).
    pub fn with_container<R>(
        &mut self,
        handle: ContainerHandle,
        f: impl FnOnce(&mut dyn Container) -> R,
    ) -> Option<R> {
        match handle {
            ContainerHandle::Block(pos) => self
                .block_entities
                .get_mut(&pos)
                .map(|be| f(be.container_mut())),
            ContainerHandle::Compound { first, second } => {
                let mut second_be = self.block_entities.remove(&second)?;
                let result = self.block_entities.get_mut(&first).map(|first_be| {
                    let mut compound =
                        CompoundContainer::new(first_be.container_mut(), second_be.container_mut());
                    f(&mut compound)
                });
                self.block_entities.insert(second, second_be);
                result
            }
            ContainerHandle::Worldly(pos) => {
                let Some(Block::Composter { level }) = self.blocks.get(&pos).copied() else {
                    return None;
                };
                let mut composter = ComposterContainer::new(level, &mut self.rng);
                let result = f(&mut composter);
                let new_level = composter.level();
                if new_level != level {
                    self.blocks
                        .insert(pos, Block::Composter { level: new_level });
                    if new_level == crate::block::COMPOSTER_FULL {
                        self.schedule_ripening(pos);
                    }
                }
                Some(result)
            }
            ContainerHandle::Entity(id) => self
                .entities
                .get_mut(&id)
                .and_then(|entity| entity.container_mut())
                .map(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::ChestType;
    use crate::config::TransferConfig;
    use crate::entity::ChestMinecart;
    use mdlogistics_core::{Direction, ItemStack, RegistryKey, Vec3};

    fn world() -> World {
        World::new(11, TransferConfig::default())
    }

    fn chest(kind: ChestType) -> Block {
        Block::Chest {
            facing: Direction::South,
            kind,
        }
    }

    #[test]
    fn double_chest_is_left_half_first_from_either_side() {
        let mut world = world();
        let left = BlockPos::new(0, 64, 0);
        let right = chest(ChestType::Left).chest_partner(left).unwrap();
        world.set_block(left, chest(ChestType::Left));
        world.set_block(right, chest(ChestType::Right));

        let expected = ContainerHandle::Compound {
            first: left,
            second: right,
        };
        assert_eq!(world.locate(left), Some(expected));
        assert_eq!(world.locate(right), Some(expected));

        let size = world.with_container(expected, |c| {
            c.set(27, Some(ItemStack::new(RegistryKey::mdm("stone"), 3, 64)));
            c.size()
        });
        assert_eq!(size, Some(54));
        let right_slots = world.block_entity(right).unwrap().inventory().raw_slots();
        assert_eq!(right_slots[0].as_ref().unwrap().count, 3);
    }

    #[test]
    fn mismatched_halves_stay_single() {
        let mut world = world();
        let left = BlockPos::new(0, 64, 0);
        let right = chest(ChestType::Left).chest_partner(left).unwrap();
        world.set_block(left, chest(ChestType::Left));
        world.set_block(
            right,
            Block::Chest {
                facing: Direction::North,
                kind: ChestType::Right,
            },
        );
        assert_eq!(world.locate(left), Some(ContainerHandle::Block(left)));
    }

    #[test]
    fn composter_is_found_without_block_entity() {
        let mut world = world();
        let pos = BlockPos::new(2, 64, 2);
        world.set_block(pos, Block::Composter { level: 0 });
        assert_eq!(world.locate(pos), Some(ContainerHandle::Worldly(pos)));
    }

    #[test]
    fn entity_containers_are_found_and_tie_broken_reproducibly() {
        let pos = BlockPos::new(5, 64, 5);
        let picks: Vec<_> = (0..2)
            .map(|_| {
                let mut world = world();
                for i in 0..3 {
                    world.spawn_chest_minecart(
                        Vec3::new(5.5 + 0.01 * i as f64, 64.0, 5.5),
                        ChestMinecart::new(),
                    );
                }
                (0..4).map(|_| world.locate(pos)).collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(picks[0], picks[1]);
        assert!(picks[0]
            .iter()
            .all(|h| matches!(h, Some(ContainerHandle::Entity(_)))));
    }

    #[test]
    fn occluding_block_hides_entity_containers_when_configured() {
        let pos = BlockPos::new(0, 64, 0);
        let cart_pos = Vec3::new(0.5, 64.0, 0.5);

        let mut world = world();
        world.set_block(pos, Block::Solid);
        let cart = world.spawn_chest_minecart(cart_pos, ChestMinecart::new());
        assert_eq!(world.locate(pos), Some(ContainerHandle::Entity(cart)));

        let config = TransferConfig {
            ignore_occluding_blocks: true,
            ..TransferConfig::default()
        };
        let mut world = World::new(11, config);
        world.set_block(pos, Block::Solid);
        world.spawn_chest_minecart(cart_pos, ChestMinecart::new());
        assert_eq!(world.locate(pos), None);
        assert_eq!(world.locate(BlockPos::new(9, 9, 9)), None);
    }
}
