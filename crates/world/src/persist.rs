//! Saving and loading containers and whole worlds.
//!
//! Block entities persist as key/value records (JSON objects). Loading a
//! record is lenient: a missing or malformed field falls back to its default
//! with a warning, so one bad slot never loses the rest of the container.
//!
//! A world snapshot wraps those records in a `.mdls` file: a 14-byte header
//! (magic, version, CRC32 of the payload, payload length) followed by a
//! zstd-compressed bincode payload. Header and checksum failures are errors.

use crate::block::{Block, COMPOSTER_FULL};
use crate::block_entity::BlockEntity;
use crate::chest::{ChestBlockEntity, CHEST_SLOT_COUNT};
use crate::config::TransferConfig;
use crate::container::Inventory;
use crate::dispenser::{DispenserBlockEntity, DISPENSER_SLOT_COUNT};
use crate::entity::EntityRecord;
use crate::furnace::{FurnaceBlockEntity, FURNACE_SLOT_COUNT};
use crate::hopper::{HopperBlockEntity, HOPPER_SLOT_COUNT};
use crate::loot::LootRef;
use crate::transfer::TransferArbiter;
use crate::world::World;
use anyhow::{Context, Result};
use crc32fast::Hasher;
use mdlogistics_core::{
    BlockPos, Direction, ItemStack, RegistryKey, SimTick, DEFAULT_MAX_STACK_SIZE, MAX_STACK_LIMIT,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Magic number for snapshot files ("MDLS").
const SNAPSHOT_MAGIC: u32 = 0x4D444C53;

/// Current snapshot format version.
const SNAPSHOT_VERSION: u16 = 1;

const HEADER_LEN: usize = 14;

/// Typed persistence failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PersistError {
    #[error("block entity record is not an object")]
    NotAnObject,
    #[error("block entity record has no usable id")]
    MissingId,
    #[error("unknown block entity id `{0}`")]
    UnknownKind(String),
    #[error("snapshot header too short")]
    TruncatedHeader,
    #[error("invalid snapshot magic: expected 0x{expected:08X}, got 0x{found:08X}")]
    BadMagic { expected: u32, found: u32 },
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),
    #[error("CRC32 mismatch: expected {expected:08X}, got {found:08X}")]
    ChecksumMismatch { expected: u32, found: u32 },
}

// ---------------------------------------------------------------------------
// Block entity records
// ---------------------------------------------------------------------------

/// Encode a block entity as a key/value record. A container with pending
/// loot saves the reference instead of its slots.
pub fn block_entity_to_record(be: &BlockEntity) -> Value {
    let mut record = Map::new();
    record.insert("id".into(), json!(be.type_id()));

    let inventory = be.inventory();
    match inventory.loot().pending() {
        Some(loot) => {
            record.insert("LootTable".into(), json!(loot.table.to_string()));
            if loot.seed != 0 {
                record.insert("LootTableSeed".into(), json!(loot.seed as i64));
            }
        }
        None => {
            record.insert("Items".into(), items_to_value(inventory.raw_slots()));
        }
    }

    if let Some(hopper) = be.as_hopper() {
        record.insert("TransferCooldown".into(), json!(hopper.arbiter.cooldown));
    }
    Value::Object(record)
}

/// Decode a block entity record. Only a record that is not an object or
/// names no known kind is rejected; everything else is repaired.
pub fn block_entity_from_record(record: &Value) -> Result<BlockEntity, PersistError> {
    let obj = record.as_object().ok_or(PersistError::NotAnObject)?;
    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .ok_or(PersistError::MissingId)?;
    let key = RegistryKey::parse(id).map_err(|_| PersistError::UnknownKind(id.to_string()))?;

    let size = match key.path() {
        "chest" | "barrel" => CHEST_SLOT_COUNT,
        "hopper" => HOPPER_SLOT_COUNT,
        "dispenser" => DISPENSER_SLOT_COUNT,
        "furnace" => FURNACE_SLOT_COUNT,
        _ => return Err(PersistError::UnknownKind(id.to_string())),
    };
    if key.namespace() != mdlogistics_core::DEFAULT_NAMESPACE {
        return Err(PersistError::UnknownKind(id.to_string()));
    }

    let inventory = read_inventory(obj, size);
    Ok(match key.path() {
        "chest" => BlockEntity::Chest(ChestBlockEntity::from_inventory(inventory)),
        "barrel" => BlockEntity::Barrel(ChestBlockEntity::from_inventory(inventory)),
        "hopper" => {
            let mut arbiter = TransferArbiter::new(Direction::Down);
            arbiter.cooldown = read_cooldown(obj);
            BlockEntity::Hopper(HopperBlockEntity::from_parts(inventory, arbiter))
        }
        "dispenser" => BlockEntity::Dispenser(DispenserBlockEntity::from_inventory(inventory)),
        _ => BlockEntity::Furnace(FurnaceBlockEntity::from_inventory(inventory)),
    })
}

fn items_to_value(slots: &[Option<ItemStack>]) -> Value {
    let items = slots
        .iter()
        .enumerate()
        .filter_map(|(slot, stack)| stack.as_ref().map(|stack| (slot, stack)))
        .map(|(slot, stack)| {
            let mut entry = json!({
                "Slot": slot,
                "id": stack.item.to_string(),
                "count": stack.count,
                "max_stack_size": stack.max_stack_size(),
            });
            if let Some(components) = &stack.components {
                entry["components"] = json!(components);
            }
            entry
        })
        .collect();
    Value::Array(items)
}

fn read_inventory(obj: &Map<String, Value>, size: usize) -> Inventory {
    if let Some(loot) = read_loot(obj) {
        let mut inventory = Inventory::new(size);
        inventory.loot_state_mut().set(Some(loot));
        return inventory;
    }
    Inventory::from_slots(size, read_items(obj, size))
}

fn read_loot(obj: &Map<String, Value>) -> Option<LootRef> {
    let raw = obj.get("LootTable")?;
    let Some(table) = raw.as_str().and_then(|s| RegistryKey::parse(s).ok()) else {
        warn!(value = %raw, "Invalid loot table reference; treating container as plain");
        return None;
    };
    let seed = match obj.get("LootTableSeed") {
        None => 0,
        Some(value) => value.as_i64().map(|seed| seed as u64).unwrap_or_else(|| {
            warn!(%value, "Invalid loot table seed; using 0");
            0
        }),
    };
    Some(LootRef { table, seed })
}

fn read_items(obj: &Map<String, Value>, size: usize) -> Vec<Option<ItemStack>> {
    let mut slots = vec![None; size];
    let Some(items) = obj.get("Items") else {
        return slots;
    };
    let Some(entries) = items.as_array() else {
        warn!("Items is not a list; loading an empty container");
        return slots;
    };
    for entry in entries {
        match read_slot(entry) {
            Some((slot, stack)) if slot < size => slots[slot] = Some(stack),
            Some((slot, _)) => warn!(slot, size, "Dropping item in out-of-range slot"),
            None => warn!(%entry, "Dropping malformed item entry"),
        }
    }
    slots
}

fn read_slot(entry: &Value) -> Option<(usize, ItemStack)> {
    let slot = usize::try_from(entry.get("Slot")?.as_u64()?).ok()?;
    let item = RegistryKey::parse(entry.get("id")?.as_str()?).ok()?;
    let max = entry
        .get("max_stack_size")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_MAX_STACK_SIZE as u64)
        .clamp(1, MAX_STACK_LIMIT as u64) as u16;
    let count = entry.get("count").and_then(Value::as_u64).unwrap_or(1);
    if count == 0 {
        return None;
    }
    let count = count.min(max as u64) as u16;

    let mut stack = ItemStack::new(item, count, max);
    if let Some(components) = entry.get("components") {
        match serde_json::from_value::<Vec<u8>>(components.clone()) {
            Ok(bytes) => stack = stack.with_components(bytes),
            Err(err) => warn!(%err, "Dropping malformed item components"),
        }
    }
    Some((slot, stack))
}

fn read_cooldown(obj: &Map<String, Value>) -> i32 {
    match obj.get("TransferCooldown") {
        None => 0,
        Some(value) => value
            .as_i64()
            .map(|cooldown| cooldown.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
            .unwrap_or_else(|| {
                warn!(%value, "Invalid TransferCooldown; using 0");
                0
            }),
    }
}

// ---------------------------------------------------------------------------
// World snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct SnapshotHeader {
    magic: u32,
    version: u16,
    crc32: u32,
    payload_len: u32,
}

impl SnapshotHeader {
    fn new(crc32: u32, payload_len: u32) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: SNAPSHOT_VERSION,
            crc32,
            payload_len,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN);
        bytes.extend_from_slice(&self.magic.to_le_bytes());
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.crc32.to_le_bytes());
        bytes.extend_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, PersistError> {
        if bytes.len() < HEADER_LEN {
            return Err(PersistError::TruncatedHeader);
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != SNAPSHOT_MAGIC {
            return Err(PersistError::BadMagic {
                expected: SNAPSHOT_MAGIC,
                found: magic,
            });
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != SNAPSHOT_VERSION {
            return Err(PersistError::UnsupportedVersion(version));
        }
        let crc32 = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        let payload_len = u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]);
        Ok(Self {
            magic,
            version,
            crc32,
            payload_len,
        })
    }
}

/// One block position: its state, and its block entity record if any. Both
/// are JSON so the tagged block and record formats stay self-describing.
#[derive(Debug, Serialize, Deserialize)]
struct BlockRecord {
    pos: BlockPos,
    state: Vec<u8>,
    entity: Option<Vec<u8>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotPayload {
    tick: u64,
    seed: u64,
    blocks: Vec<BlockRecord>,
    entities: Vec<EntityRecord>,
}

fn checksum(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Serialize `world` into snapshot bytes (header + compressed payload).
pub fn encode_snapshot(world: &World) -> Result<Vec<u8>> {
    let mut blocks = Vec::with_capacity(world.blocks.len());
    for (pos, block) in &world.blocks {
        let state = serde_json::to_vec(block).context("Failed to encode block state")?;
        let entity = match world.block_entities.get(pos) {
            Some(be) => Some(
                serde_json::to_vec(&block_entity_to_record(be))
                    .context("Failed to encode block entity record")?,
            ),
            None => None,
        };
        blocks.push(BlockRecord {
            pos: *pos,
            state,
            entity,
        });
    }
    let payload = SnapshotPayload {
        tick: world.current_tick().0,
        seed: world.seed(),
        blocks,
        entities: world.entities().map(EntityRecord::from_entity).collect(),
    };

    let serialized = bincode::serialize(&payload).context("Failed to serialize snapshot")?;
    let compressed =
        zstd::encode_all(&serialized[..], 3).context("Failed to compress snapshot")?;
    let payload_len =
        u32::try_from(compressed.len()).context("Snapshot payload exceeds 4 GiB")?;

    let header = SnapshotHeader::new(checksum(&compressed), payload_len);
    let mut bytes = header.to_bytes();
    bytes.extend_from_slice(&compressed);
    Ok(bytes)
}

/// Rebuild a world from snapshot bytes. Agents and pending events are not
/// part of a snapshot; the world random stream restarts from the seed and
/// saved tick.
pub fn decode_snapshot(bytes: &[u8], config: TransferConfig) -> Result<World> {
    let header = SnapshotHeader::from_bytes(bytes)?;
    let compressed = bytes
        .get(HEADER_LEN..HEADER_LEN + header.payload_len as usize)
        .context("Snapshot payload truncated")?;
    let computed = checksum(compressed);
    if computed != header.crc32 {
        return Err(PersistError::ChecksumMismatch {
            expected: header.crc32,
            found: computed,
        }
        .into());
    }

    let decompressed = zstd::decode_all(compressed).context("Failed to decompress snapshot")?;
    let payload: SnapshotPayload =
        bincode::deserialize(&decompressed).context("Failed to deserialize snapshot")?;

    let mut world = World::new(payload.seed, config);
    world.restore_clock(SimTick(payload.tick));
    for record in payload.blocks {
        let block: Block = match serde_json::from_slice(&record.state) {
            Ok(block) => block,
            Err(err) => {
                warn!(pos = ?record.pos, %err, "Skipping unreadable block state");
                continue;
            }
        };
        let entity = record.entity.and_then(|raw| {
            let decoded = serde_json::from_slice::<Value>(&raw)
                .map_err(|err| err.to_string())
                .and_then(|value| block_entity_from_record(&value).map_err(|err| err.to_string()));
            decoded
                .map_err(|err| warn!(pos = ?record.pos, %err, "Replacing unreadable block entity"))
                .ok()
        });
        match entity {
            Some(be) => world.set_block_with_entity(record.pos, block, be),
            None => world.set_block(record.pos, block),
        }
        if block == (Block::Composter { level: COMPOSTER_FULL }) {
            world.schedule_ripening(record.pos);
        }
    }
    for record in payload.entities {
        if let Some(entity) = record.into_entity() {
            world.restore_entity(entity);
        }
    }
    debug!(tick = payload.tick, "Loaded world snapshot");
    Ok(world)
}

/// Write a snapshot of `world` to `path`.
pub fn save_snapshot(world: &World, path: &Path) -> Result<()> {
    let bytes = encode_snapshot(world)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create snapshot directory")?;
    }
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create snapshot {}", path.display()))?;
    file.write_all(&bytes).context("Failed to write snapshot")?;
    file.sync_all().context("Failed to sync snapshot")?;
    Ok(())
}

/// Load a snapshot from `path`.
pub fn load_snapshot(path: &Path, config: TransferConfig) -> Result<World> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open snapshot {}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .context("Failed to read snapshot")?;
    decode_snapshot(&bytes, config)
}
