//! TOML scenario files for the headless runner.
//!
//! ```toml
//! name = "furnace line"
//! seed = 7
//! ticks = 200
//!
//! [config]
//! items_per_transfer = 1
//!
//! [[blocks]]
//! pos = { x = 0, y = 65, z = 0 }
//! block = "barrel"
//! slots = [{ slot = 0, item = "mdm:iron_ore", count = 16 }]
//!
//! [[blocks]]
//! pos = { x = 0, y = 64, z = 0 }
//! block = "hopper"
//! facing = "down"
//!
//! [[actions]]
//! tick = 40
//! action = "set_enabled"
//! pos = { x = 0, y = 64, z = 0 }
//! enabled = false
//! ```

use anyhow::{Context, Result};
use mdlogistics_core::{BlockPos, ItemStack, RegistryKey, SimTick, Vec3, DEFAULT_MAX_STACK_SIZE};
use mdlogistics_testkit::{JsonlSink, TransferMetrics};
use mdlogistics_world::{
    AgentId, Block, ChestMinecart, Container, LootRef, LootTables, TransferConfig, World,
    WorldEvent,
};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

fn default_ticks() -> u64 {
    100
}

fn default_max_stack() -> u16 {
    DEFAULT_MAX_STACK_SIZE
}

/// A scenario: the initial world plus scheduled actions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Display name.
    pub name: String,
    /// World seed.
    pub seed: u64,
    /// Ticks to run.
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Transfer config for this scenario.
    pub config: Option<TransferConfig>,
    /// Loot table JSON, relative to the scenario file.
    pub loot_tables: Option<PathBuf>,
    /// Blocks to place.
    pub blocks: Vec<BlockSpec>,
    /// Free item entities.
    pub items: Vec<ItemEntitySpec>,
    /// Chest minecarts.
    pub minecarts: Vec<MinecartSpec>,
    /// Agents present from the start.
    pub agents: Vec<AgentSpec>,
    /// Scheduled actions, applied before the tick they name.
    pub actions: Vec<ActionSpec>,
    #[serde(skip)]
    base_dir: PathBuf,
}

/// A block plus its initial contents.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockSpec {
    pub pos: BlockPos,
    #[serde(flatten)]
    pub block: Block,
    #[serde(default)]
    pub slots: Vec<SlotSpec>,
    #[serde(default)]
    pub loot: Option<LootSpec>,
}

/// One pre-filled slot.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotSpec {
    pub slot: usize,
    pub item: RegistryKey,
    pub count: u16,
    #[serde(default = "default_max_stack")]
    pub max_stack_size: u16,
}

impl SlotSpec {
    fn stack(&self) -> ItemStack {
        ItemStack::new(self.item.clone(), self.count, self.max_stack_size)
    }
}

/// Pending loot reference.
#[derive(Debug, Clone, Deserialize)]
pub struct LootSpec {
    pub table: RegistryKey,
    #[serde(default)]
    pub seed: u64,
}

impl From<&LootSpec> for LootRef {
    fn from(spec: &LootSpec) -> Self {
        LootRef {
            table: spec.table.clone(),
            seed: spec.seed,
        }
    }
}

/// Free item entity.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemEntitySpec {
    pub pos: Vec3,
    pub item: RegistryKey,
    pub count: u16,
    #[serde(default = "default_max_stack")]
    pub max_stack_size: u16,
}

/// Chest minecart.
#[derive(Debug, Clone, Deserialize)]
pub struct MinecartSpec {
    pub pos: Vec3,
    #[serde(default)]
    pub slots: Vec<SlotSpec>,
    #[serde(default)]
    pub loot: Option<LootSpec>,
}

/// Agent able to open containers.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSpec {
    pub id: AgentId,
    pub pos: Vec3,
}

/// An action applied just before tick `tick` runs.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionSpec {
    pub tick: u64,
    #[serde(flatten)]
    pub action: Action,
}

/// Scheduled world interaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Open { agent: AgentId, pos: BlockPos },
    Close { agent: AgentId },
    MoveAgent { agent: AgentId, pos: Vec3 },
    SetEnabled { pos: BlockPos, enabled: bool },
    Dispense { pos: BlockPos },
    EntityInside { pos: BlockPos, entity: u64 },
}

impl Scenario {
    /// Parse a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        let mut scenario = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))?;
        scenario.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(scenario)
    }

    /// Parse scenario TOML. Relative paths resolve against the working
    /// directory.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Build the initial world. `config` replaces the scenario's own
    /// `[config]` table when given.
    pub fn build(&self, config: Option<TransferConfig>) -> Result<World> {
        let config = config.or(self.config).unwrap_or_default();
        let mut world = World::new(self.seed, config);

        if let Some(path) = &self.loot_tables {
            let path = self.base_dir.join(path);
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read loot tables {}", path.display()))?;
            let tables = LootTables::from_json_str(&contents)?;
            info!(tables = tables.len(), "Loaded loot tables");
            world.set_loot_source(Arc::new(tables));
        }

        for spec in &self.blocks {
            world.set_block(spec.pos, spec.block);
            match world.container_mut(spec.pos) {
                Some(container) => fill(container, &spec.slots, &format!("{:?}", spec.pos)),
                None if !spec.slots.is_empty() => {
                    warn!(pos = ?spec.pos, "Block has no inventory; ignoring its slots")
                }
                None => {}
            }
            if let Some(loot) = &spec.loot {
                if !world.set_loot(spec.pos, loot.into()) {
                    warn!(pos = ?spec.pos, "Block has no inventory; ignoring its loot");
                }
            }
        }

        for spec in &self.items {
            world.spawn_item(
                spec.pos,
                ItemStack::new(spec.item.clone(), spec.count, spec.max_stack_size),
            );
        }

        for spec in &self.minecarts {
            let mut cart = ChestMinecart::new();
            fill(&mut cart, &spec.slots, "minecart");
            if let (Some(loot), Some(state)) = (&spec.loot, cart.loot_mut()) {
                state.set(Some(loot.into()));
            }
            world.spawn_chest_minecart(spec.pos, cart);
        }

        for agent in &self.agents {
            world.set_agent(agent.id, agent.pos);
        }
        Ok(world)
    }

    /// Item kinds placed by the scenario.
    pub fn tracked_items(&self) -> BTreeSet<RegistryKey> {
        let block_slots = self.blocks.iter().flat_map(|b| b.slots.iter());
        let cart_slots = self.minecarts.iter().flat_map(|m| m.slots.iter());
        block_slots
            .chain(cart_slots)
            .map(|slot| slot.item.clone())
            .chain(self.items.iter().map(|item| item.item.clone()))
            .collect()
    }

    /// Apply the actions scheduled for `tick`.
    pub fn apply_actions(&self, world: &mut World, tick: SimTick) {
        for spec in self.actions.iter().filter(|a| a.tick == tick.0) {
            let applied = match &spec.action {
                Action::Open { agent, pos } => world.open_container(*agent, *pos),
                Action::Close { agent } => world.close_container(*agent),
                Action::MoveAgent { agent, pos } => {
                    world.set_agent(*agent, *pos);
                    true
                }
                Action::SetEnabled { pos, enabled } => world.set_hopper_enabled(*pos, *enabled),
                Action::Dispense { pos } => world.dispense(*pos),
                Action::EntityInside { pos, entity } => world.entity_inside(*pos, *entity),
            };
            debug!(tick = tick.0, action = ?spec.action, applied, "applied scheduled action");
        }
    }

    /// Run `ticks` ticks, streaming events to `sink` and tallying moves.
    pub fn run(
        &self,
        world: &mut World,
        ticks: u64,
        mut sink: Option<&mut JsonlSink>,
    ) -> Result<TransferMetrics> {
        let tracked = self.tracked_items();
        let mut metrics = TransferMetrics {
            ticks,
            totals_before: totals(world, &tracked),
            ..TransferMetrics::default()
        };

        for _ in 0..ticks {
            let next = world.current_tick().advance(1);
            self.apply_actions(world, next);
            world.step();
            let events = world.drain_events();
            for event in &events {
                if let WorldEvent::ItemsMoved { kind, count, .. } = event {
                    metrics.record_move(kind.as_str(), u64::from(*count));
                }
            }
            if let Some(sink) = sink.as_deref_mut() {
                for event in &events {
                    sink.write(&mdlogistics_testkit::EventRecord {
                        tick: world.current_tick(),
                        kind: event.kind(),
                        payload: event,
                    })?;
                }
            }
        }

        metrics.totals_after = totals(world, &tracked);
        Ok(metrics)
    }
}

fn fill(container: &mut dyn Container, slots: &[SlotSpec], owner: &str) {
    for spec in slots {
        if spec.slot >= container.size() {
            warn!(owner, slot = spec.slot, size = container.size(), "Slot out of range");
            continue;
        }
        container.set(spec.slot, Some(spec.stack()));
    }
}

fn totals(world: &World, items: &BTreeSet<RegistryKey>) -> BTreeMap<String, u64> {
    items
        .iter()
        .map(|item| (item.to_string(), world.total_count(item)))
        .collect()
}
