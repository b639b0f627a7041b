//! Position-keyed arena of blocks, block entities and entities.
//!
//! Nothing holds a pointer to anything else: every neighbour lookup goes
//! through the world by position (or entity id). Maps are ordered so a tick
//! visits block entities in ascending position order every run.

use crate::block::{Block, COMPOSTER_FULL, COMPOSTER_READY};
use crate::block_entity::BlockEntity;
use crate::chest::ChestBlockEntity;
use crate::config::TransferConfig;
use crate::container::Container;
use crate::entity::{ChestMinecart, Entity, EntityId, EntityKind};
use crate::loot::{LootRef, SharedLootSource};
use crate::viewers::{AgentId, ViewerNotifier, ViewerValidator};
use mdlogistics_core::{scoped_rng, BlockPos, ItemStack, RegistryKey, SimTick, Vec3};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Maximum distance (in blocks) between an agent and a container it views.
pub const VIEWER_RANGE: f64 = 5.0;

/// Domain mixed into the random stream of a reloaded world.
const RESUME_STREAM: u64 = 0x5245_5355_4D45;

/// How an item movement happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    /// Hopper ejected into the container it faces.
    Push,
    /// Hopper pulled from the container above.
    Pull,
    /// Hopper absorbed an item entity.
    Absorb,
    /// Dispenser moved an item into the container in front.
    Dispense,
    /// Dispenser dropped an item entity.
    Drop,
}

/// Externally observable world events, drained by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorldEvent {
    ContainerOpened {
        pos: BlockPos,
    },
    ContainerClosed {
        pos: BlockPos,
    },
    ViewerCountChanged {
        pos: BlockPos,
        previous: usize,
        count: usize,
    },
    ItemsMoved {
        at: BlockPos,
        kind: MoveKind,
        item: RegistryKey,
        count: u16,
    },
    LootUnpacked {
        pos: BlockPos,
    },
}

impl MoveKind {
    /// Stable label, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            MoveKind::Push => "push",
            MoveKind::Pull => "pull",
            MoveKind::Absorb => "absorb",
            MoveKind::Dispense => "dispense",
            MoveKind::Drop => "drop",
        }
    }
}

impl WorldEvent {
    /// Stable label, as serialized.
    pub fn kind(&self) -> &'static str {
        match self {
            WorldEvent::ContainerOpened { .. } => "container_opened",
            WorldEvent::ContainerClosed { .. } => "container_closed",
            WorldEvent::ViewerCountChanged { .. } => "viewer_count_changed",
            WorldEvent::ItemsMoved { .. } => "items_moved",
            WorldEvent::LootUnpacked { .. } => "loot_unpacked",
        }
    }
}

impl ViewerNotifier for Vec<WorldEvent> {
    fn on_open(&mut self, pos: BlockPos) {
        self.push(WorldEvent::ContainerOpened { pos });
    }

    fn on_close(&mut self, pos: BlockPos) {
        self.push(WorldEvent::ContainerClosed { pos });
    }

    fn on_viewer_count_changed(&mut self, pos: BlockPos, previous: usize, count: usize) {
        self.push(WorldEvent::ViewerCountChanged {
            pos,
            previous,
            count,
        });
    }
}

/// An external agent that can open containers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agent {
    /// Eye position.
    pub pos: Vec3,
    /// Container whose menu the agent has open.
    pub open_menu: Option<BlockPos>,
}

/// Default viewer predicate: the agent is close enough and its open menu
/// targets this container or its double-chest partner.
pub struct AgentValidator<'a> {
    agents: &'a BTreeMap<AgentId, Agent>,
    partner: Option<BlockPos>,
}

impl ViewerValidator for AgentValidator<'_> {
    fn is_valid_viewer(&self, agent: AgentId, pos: BlockPos) -> bool {
        let Some(agent) = self.agents.get(&agent) else {
            return false;
        };
        let targets_us = agent
            .open_menu
            .is_some_and(|menu| menu == pos || Some(menu) == self.partner);
        targets_us && agent.pos.distance_sq(pos.center()) <= VIEWER_RANGE * VIEWER_RANGE
    }
}

/// The simulated world.
pub struct World {
    tick: SimTick,
    seed: u64,
    pub(crate) config: TransferConfig,
    pub(crate) blocks: BTreeMap<BlockPos, Block>,
    pub(crate) block_entities: BTreeMap<BlockPos, BlockEntity>,
    pub(crate) entities: BTreeMap<EntityId, Entity>,
    next_entity_id: EntityId,
    agents: BTreeMap<AgentId, Agent>,
    pub(crate) rng: StdRng,
    loot: Option<SharedLootSource>,
    pub(crate) events: Vec<WorldEvent>,
    pub(crate) ripening: BTreeMap<BlockPos, SimTick>,
}

impl World {
    /// Empty world.
    pub fn new(seed: u64, config: TransferConfig) -> Self {
        Self {
            tick: SimTick::ZERO,
            seed,
            config: config.sanitized(),
            blocks: BTreeMap::new(),
            block_entities: BTreeMap::new(),
            entities: BTreeMap::new(),
            next_entity_id: 1,
            agents: BTreeMap::new(),
            rng: StdRng::seed_from_u64(seed),
            loot: None,
            events: Vec::new(),
            ripening: BTreeMap::new(),
        }
    }

    /// Current tick.
    pub fn current_tick(&self) -> SimTick {
        self.tick
    }

    /// Resume the clock at `tick` (loading). The random stream restarts
    /// from the seed and the tick.
    pub(crate) fn restore_clock(&mut self, tick: SimTick) {
        self.tick = tick;
        self.rng = scoped_rng(self.seed, RESUME_STREAM, tick);
    }

    /// World seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Transfer configuration.
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Install the loot source and connect every existing container to it,
    /// block entities and chest minecarts alike.
    pub fn set_loot_source(&mut self, source: SharedLootSource) {
        for (pos, be) in self.block_entities.iter_mut() {
            be.inventory_mut()
                .loot_state_mut()
                .attach(source.clone(), *pos, self.seed);
        }
        for entity in self.entities.values_mut() {
            attach_entity_loot(&source, self.seed, entity);
        }
        self.loot = Some(source);
    }

    /// Block at `pos` (air when unset).
    pub fn block(&self, pos: BlockPos) -> Block {
        self.blocks.get(&pos).copied().unwrap_or_default()
    }

    /// Non-air blocks in position order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockPos, Block)> + '_ {
        self.blocks.iter().map(|(pos, block)| (*pos, *block))
    }

    /// Place `block`, creating or discarding its block entity as needed. An
    /// existing block entity of the right kind is kept.
    pub fn set_block(&mut self, pos: BlockPos, block: Block) {
        if block == Block::Air {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block);
        }
        self.ripening.remove(&pos);

        let keep = self
            .block_entities
            .get(&pos)
            .is_some_and(|be| be.matches_block(block));
        if keep {
            if let Some(be) = self.block_entities.get_mut(&pos) {
                be.sync_with_block(block);
            }
            return;
        }
        if self.block_entities.remove(&pos).is_some() {
            debug!(?pos, "discarded block entity of replaced block");
        }
        if let Some(be) = BlockEntity::for_block(block) {
            self.insert_block_entity(pos, be);
        }
    }

    /// Place `block` with a prepared block entity (used by loading). The
    /// block entity is dropped when it does not belong on `block`.
    pub fn set_block_with_entity(&mut self, pos: BlockPos, block: Block, be: BlockEntity) {
        self.set_block(pos, block);
        if be.matches_block(block) {
            self.insert_block_entity(pos, be);
        }
    }

    pub(crate) fn insert_block_entity(&mut self, pos: BlockPos, mut be: BlockEntity) {
        if let Some(source) = &self.loot {
            be.inventory_mut()
                .loot_state_mut()
                .attach(source.clone(), pos, self.seed);
        }
        be.sync_with_block(self.block(pos));
        self.block_entities.insert(pos, be);
    }

    /// Block entity at `pos`.
    pub fn block_entity(&self, pos: BlockPos) -> Option<&BlockEntity> {
        self.block_entities.get(&pos)
    }

    /// Mutable block entity at `pos`.
    pub fn block_entity_mut(&mut self, pos: BlockPos) -> Option<&mut BlockEntity> {
        self.block_entities.get_mut(&pos)
    }

    /// Block entities in position order.
    pub fn block_entities(&self) -> impl Iterator<Item = (BlockPos, &BlockEntity)> + '_ {
        self.block_entities.iter().map(|(pos, be)| (*pos, be))
    }

    /// Container of the block entity at `pos`.
    pub fn container_mut(&mut self, pos: BlockPos) -> Option<&mut dyn Container> {
        self.block_entities
            .get_mut(&pos)
            .map(BlockEntity::container_mut)
    }

    /// Give the container at `pos` a pending loot reference.
    pub fn set_loot(&mut self, pos: BlockPos, loot: LootRef) -> bool {
        let Some(be) = self.block_entities.get_mut(&pos) else {
            return false;
        };
        be.inventory_mut().loot_state_mut().set(Some(loot));
        true
    }

    /// Lock or unlock a hopper (external signal).
    pub fn set_hopper_enabled(&mut self, pos: BlockPos, enabled: bool) -> bool {
        match self.blocks.get_mut(&pos) {
            Some(Block::Hopper { enabled: e, .. }) => {
                *e = enabled;
                true
            }
            _ => false,
        }
    }

    fn alloc_entity_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Spawn a free-floating item entity.
    pub fn spawn_item(&mut self, pos: Vec3, stack: ItemStack) -> EntityId {
        let id = self.alloc_entity_id();
        self.entities.insert(
            id,
            Entity {
                id,
                pos,
                kind: EntityKind::Item(stack),
            },
        );
        id
    }

    /// Spawn a chest minecart.
    pub fn spawn_chest_minecart(&mut self, pos: Vec3, cart: ChestMinecart) -> EntityId {
        let id = self.alloc_entity_id();
        let mut entity = Entity {
            id,
            pos,
            kind: EntityKind::ChestMinecart(cart),
        };
        if let Some(source) = &self.loot {
            attach_entity_loot(source, self.seed, &mut entity);
        }
        self.entities.insert(id, entity);
        id
    }

    /// Re-insert a loaded entity under its saved id.
    pub(crate) fn restore_entity(&mut self, mut entity: Entity) {
        self.next_entity_id = self.next_entity_id.max(entity.id + 1);
        if let Some(source) = &self.loot {
            attach_entity_loot(source, self.seed, &mut entity);
        }
        self.entities.insert(entity.id, entity);
    }

    /// Entity by id.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable entity by id.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    /// Remove an entity.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Add (or move) an agent.
    pub fn set_agent(&mut self, id: AgentId, pos: Vec3) {
        self.agents
            .entry(id)
            .and_modify(|agent| agent.pos = pos)
            .or_insert(Agent {
                pos,
                open_menu: None,
            });
    }

    /// Agent by id.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Remove an agent, closing whatever it had open.
    pub fn remove_agent(&mut self, id: AgentId) {
        self.close_container(id);
        self.agents.remove(&id);
    }

    /// `agent` opens the container at `pos` (both halves of a double chest).
    /// Resolves pending loot with the agent as opener.
    pub fn open_container(&mut self, agent: AgentId, pos: BlockPos) -> bool {
        if !self.agents.contains_key(&agent) || !self.block_entities.contains_key(&pos) {
            return false;
        }
        self.close_container(agent);

        let halves = [Some(pos), self.chest_partner(pos)];
        for half in halves.into_iter().flatten() {
            let Some(be) = self.block_entities.get_mut(&half) else {
                continue;
            };
            let state = be.inventory_mut().loot_state_mut();
            let pending = state.pending().is_some();
            state.set_opener(Some(agent));
            be.container_mut().ensure_resolved();
            if pending && be.inventory().loot().pending().is_none() {
                self.events.push(WorldEvent::LootUnpacked { pos: half });
            }
            if let Some(counter) = be.viewers_mut() {
                counter.increment(agent, half, &mut self.events);
            }
        }

        if let Some(a) = self.agents.get_mut(&agent) {
            a.open_menu = Some(pos);
        }
        trace!(agent, ?pos, "container opened");
        true
    }

    /// `agent` closes its open container.
    pub fn close_container(&mut self, agent: AgentId) -> bool {
        let Some(pos) = self
            .agents
            .get_mut(&agent)
            .and_then(|a| a.open_menu.take())
        else {
            return false;
        };
        let halves = [Some(pos), self.chest_partner(pos)];
        for half in halves.into_iter().flatten() {
            if let Some(counter) = self
                .block_entities
                .get_mut(&half)
                .and_then(BlockEntity::viewers_mut)
            {
                counter.decrement(agent, half, &mut self.events);
            }
        }
        true
    }

    /// Events recorded so far.
    pub fn events(&self) -> &[WorldEvent] {
        &self.events
    }

    /// Take all recorded events.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance one tick: ripen composters, then run every block entity's
    /// tick callback in ascending position order.
    pub fn step(&mut self) {
        self.tick = self.tick.advance(1);
        let now = self.tick;

        let due: Vec<BlockPos> = self
            .ripening
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(pos, _)| *pos)
            .collect();
        for pos in due {
            self.ripening.remove(&pos);
            if let Some(Block::Composter { level }) = self.blocks.get_mut(&pos) {
                if *level == COMPOSTER_FULL {
                    *level = COMPOSTER_READY;
                }
            }
        }

        let keys: Vec<BlockPos> = self.block_entities.keys().copied().collect();
        for pos in keys {
            let Some(mut be) = self.block_entities.remove(&pos) else {
                continue;
            };
            let block = self.block(pos);
            self.tick_block_entity(pos, block, &mut be);
            self.block_entities.insert(pos, be);
        }
    }

    /// Run `ticks` steps.
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Per-tick callback for one block entity. The block entity is out of
    /// the arena for the duration.
    fn tick_block_entity(&mut self, pos: BlockPos, block: Block, be: &mut BlockEntity) {
        if let BlockEntity::Hopper(hopper) = be {
            if let Block::Hopper { facing, enabled } = block {
                crate::transfer::tick_hopper(self, pos, facing, enabled, hopper);
            }
        }

        if let Some(counter) = be.viewers_mut() {
            let validator = AgentValidator {
                agents: &self.agents,
                partner: self.chest_partner(pos),
            };
            counter.tick(
                self.tick,
                self.config.viewer_recheck_interval,
                pos,
                &validator,
                &mut self.events,
            );
        }
    }

    /// Units of `item` held anywhere: block entity slots, item entities and
    /// minecarts. Pending loot is not counted.
    pub fn total_count(&self, item: &RegistryKey) -> u64 {
        let in_slots = |slots: &[Option<ItemStack>]| -> u64 {
            slots
                .iter()
                .flatten()
                .filter(|stack| &stack.item == item)
                .map(|stack| stack.count as u64)
                .sum()
        };
        let blocks: u64 = self
            .block_entities
            .values()
            .map(|be| in_slots(be.inventory().raw_slots()))
            .sum();
        let entities: u64 = self
            .entities
            .values()
            .map(|entity| match &entity.kind {
                EntityKind::Item(stack) if &stack.item == item => stack.count as u64,
                EntityKind::Item(_) => 0,
                EntityKind::ChestMinecart(cart) => in_slots(cart.inventory().raw_slots()),
            })
            .sum();
        blocks + entities
    }

    /// Place a chest pre-filled from a prepared block entity (convenience for
    /// tests and scenarios).
    pub fn place_chest(&mut self, pos: BlockPos, block: Block, chest: ChestBlockEntity) {
        let be = match block {
            Block::Barrel => BlockEntity::Barrel(chest),
            _ => BlockEntity::Chest(chest),
        };
        self.set_block_with_entity(pos, block, be);
    }

    pub(crate) fn schedule_ripening(&mut self, pos: BlockPos) {
        let at = self
            .tick
            .advance(crate::composter::COMPOSTER_RIPEN_TICKS);
        self.ripening.insert(pos, at);
    }
}

/// Entity containers roll their loot from the block they stand in.
fn attach_entity_loot(source: &SharedLootSource, world_seed: u64, entity: &mut Entity) {
    let origin = entity.block_pos();
    if let Some(state) = entity.container_mut().and_then(|c| c.loot_mut()) {
        state.attach(source.clone(), origin, world_seed);
    }
}
