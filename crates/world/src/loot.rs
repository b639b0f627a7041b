//! Lazy loot-table population.
//!
//! A container may be created holding only a [`LootRef`] (table id + seed).
//! The first time any slot is observed the reference is consumed: a
//! [`LootSource`] rolls the table once and the resulting stacks are written
//! into the slots left to right. Rolling is an external concern; this module
//! only consumes the result. [`LootTables`] is a small data-driven source so
//! the crate works standalone.

use crate::container::Container;
use anyhow::{Context, Result};
use mdlogistics_core::{scoped_rng, BlockPos, ItemStack, RegistryKey, SimTick};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Deferred reference to procedurally determined initial contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootRef {
    /// Loot table id.
    pub table: RegistryKey,
    /// Roll seed. 0 derives a seed from the world seed and container position.
    pub seed: u64,
}

/// Where and for whom a roll happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LootContext {
    /// Position of the container being filled.
    pub origin: BlockPos,
    /// Agent whose access triggered the roll, if any.
    pub opener: Option<u64>,
}

/// External collaborator that turns a table id + seed into stacks.
pub trait LootSource: Send + Sync {
    /// Roll `table` with `seed`. `None` when the table is unknown.
    fn roll(&self, table: &RegistryKey, seed: u64, ctx: &LootContext) -> Option<Vec<ItemStack>>;
}

/// Shared handle to the world's loot source.
pub type SharedLootSource = Arc<dyn LootSource>;

/// Pending loot reference plus what is needed to resolve it.
#[derive(Clone, Default)]
pub struct LootState {
    pending: Option<LootRef>,
    source: Option<SharedLootSource>,
    origin: BlockPos,
    world_seed: u64,
    opener: Option<u64>,
}

impl fmt::Debug for LootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LootState")
            .field("pending", &self.pending)
            .field("attached", &self.source.is_some())
            .field("origin", &self.origin)
            .finish()
    }
}

impl LootState {
    /// Store a pending reference, replacing any previous one.
    pub fn set(&mut self, loot: Option<LootRef>) {
        self.pending = loot;
    }

    /// Pending reference, if unresolved.
    pub fn pending(&self) -> Option<&LootRef> {
        self.pending.as_ref()
    }

    /// Connect to the world's loot source. Until attached, a pending
    /// reference stays pending.
    pub fn attach(&mut self, source: SharedLootSource, origin: BlockPos, world_seed: u64) {
        self.source = Some(source);
        self.origin = origin;
        self.world_seed = world_seed;
    }

    /// Record the agent whose access will trigger the roll.
    pub fn set_opener(&mut self, opener: Option<u64>) {
        self.opener = opener;
    }

    /// Take the pending reference for resolution. The reference is cleared
    /// here, before any slot is written, so a nested resolve is a no-op.
    fn begin(&mut self) -> Option<(LootRef, SharedLootSource, LootContext, u64)> {
        let source = self.source.clone()?;
        let loot = self.pending.take()?;
        let seed = if loot.seed == 0 {
            scoped_rng(self.world_seed, self.origin.seed_hash(), SimTick::ZERO).gen()
        } else {
            loot.seed
        };
        let ctx = LootContext {
            origin: self.origin,
            opener: self.opener.take(),
        };
        Some((loot, source, ctx, seed))
    }
}

/// Resolve `container`'s pending loot reference, if any.
///
/// No-op without a reference or without an attached source. Unknown tables
/// and rolls that overflow the slot count are logged; the container is
/// marked changed once the reference is consumed.
pub fn resolve_loot<C: Container + ?Sized>(container: &mut C) {
    let Some((loot, source, ctx, seed)) = container.loot_mut().and_then(LootState::begin) else {
        return;
    };

    match source.roll(&loot.table, seed, &ctx) {
        Some(stacks) => {
            let size = container.size();
            if stacks.len() > size {
                warn!(
                    table = %loot.table,
                    rolled = stacks.len(),
                    slots = size,
                    "loot roll exceeds container size; dropping excess stacks"
                );
            }
            for (slot, mut stack) in stacks.into_iter().take(size).enumerate() {
                stack.limit_size(container.max_stack_size_for(&stack));
                *container.slot_mut(slot) = (stack.count > 0).then_some(stack);
            }
            debug!(table = %loot.table, origin = ?ctx.origin, "unpacked loot table");
        }
        None => {
            warn!(table = %loot.table, origin = ?ctx.origin, "unknown loot table; container left empty");
        }
    }

    container.set_changed();
}

/// One weighted entry of a [`LootTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    /// Item key.
    pub item: RegistryKey,
    /// Intrinsic maximum stack size of the item.
    #[serde(default = "default_max_stack")]
    pub max_stack_size: u16,
    /// Minimum count (inclusive).
    #[serde(default = "one")]
    pub min: u16,
    /// Maximum count (inclusive).
    #[serde(default = "one")]
    pub max: u16,
    /// Probability in `0.0..=1.0` that the entry produces a stack.
    #[serde(default = "always")]
    pub chance: f64,
}

fn default_max_stack() -> u16 {
    mdlogistics_core::DEFAULT_MAX_STACK_SIZE
}

fn one() -> u16 {
    1
}

fn always() -> f64 {
    1.0
}

/// A flat list of independent entries, rolled in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LootTable {
    /// Entries in roll order.
    pub entries: Vec<LootEntry>,
}

impl LootTable {
    /// Roll every entry once with `rng`.
    pub fn roll(&self, rng: &mut impl Rng) -> Vec<ItemStack> {
        let mut stacks = Vec::new();
        for entry in &self.entries {
            if entry.chance <= 0.0 || rng.gen::<f64>() >= entry.chance {
                continue;
            }
            let (lo, hi) = (entry.min.min(entry.max), entry.min.max(entry.max));
            let count = if lo == hi { lo } else { rng.gen_range(lo..=hi) };
            if count > 0 {
                stacks.push(ItemStack::new(entry.item.clone(), count, entry.max_stack_size));
            }
        }
        stacks
    }
}

/// In-memory table registry keyed by table id.
#[derive(Debug, Clone, Default)]
pub struct LootTables {
    tables: BTreeMap<RegistryKey, LootTable>,
}

impl LootTables {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a table.
    pub fn insert(&mut self, id: RegistryKey, table: LootTable) {
        self.tables.insert(id, table);
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True when no tables are registered.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Parse `{ "mdm:chests/dungeon": { "entries": [...] }, ... }`.
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let tables: BTreeMap<RegistryKey, LootTable> =
            serde_json::from_str(contents).context("Failed to parse loot tables")?;
        Ok(Self { tables })
    }
}

impl LootSource for LootTables {
    fn roll(&self, table: &RegistryKey, seed: u64, ctx: &LootContext) -> Option<Vec<ItemStack>> {
        let table = self.tables.get(table)?;
        let mut rng = scoped_rng(seed, ctx.origin.seed_hash(), SimTick::ZERO);
        Some(table.roll(&mut rng))
    }
}
