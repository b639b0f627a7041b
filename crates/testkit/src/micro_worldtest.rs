//! Micro-worldtest harness for deterministic, tick-based tests.
//!
//! A micro-worldtest steps a tiny simulation for a fixed number of ticks and
//! snapshots selected state each tick. The captured frames are returned for
//! direct assertions; when a golden path is configured the report is also
//! compared against it (or updated when `MDL_UPDATE_SNAPSHOTS=1` is set).

use crate::snapshot::assert_json_snapshot;
use anyhow::Result;
use mdlogistics_core::SimTick;
use serde::Serialize;
use std::path::PathBuf;

/// Configuration for a micro-worldtest.
#[derive(Debug, Clone)]
pub struct MicroWorldtestConfig {
    /// Human-readable name (written into the snapshot report).
    pub name: String,
    /// Number of ticks to step (frames include the initial state at tick 0).
    pub ticks: u64,
    /// Golden JSON file, if the run should be compared against one.
    pub snapshot_path: Option<PathBuf>,
}

impl MicroWorldtestConfig {
    /// Config without a golden file.
    pub fn new(name: impl Into<String>, ticks: u64) -> Self {
        Self {
            name: name.into(),
            ticks,
            snapshot_path: None,
        }
    }

    /// Compare the report against `path`.
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }
}

/// Single snapshot frame captured at a given tick.
#[derive(Debug, Clone, Serialize)]
pub struct MicroWorldtestFrame<S> {
    /// Tick number.
    pub tick: u64,
    /// Snapshot payload.
    pub snapshot: S,
}

#[derive(Debug, Clone, Serialize)]
struct MicroWorldtestReport<'a, S> {
    name: &'a str,
    frames: &'a [MicroWorldtestFrame<S>],
}

/// Run a micro-worldtest and return its frames.
///
/// Captures the initial snapshot at tick 0, then steps `config.ticks` times,
/// capturing a snapshot after each step (so there are `ticks + 1` frames).
pub fn run_micro_worldtest<State, Snapshot, StepFn, SnapFn>(
    config: MicroWorldtestConfig,
    mut state: State,
    mut step: StepFn,
    mut snapshot: SnapFn,
) -> Result<Vec<MicroWorldtestFrame<Snapshot>>>
where
    Snapshot: Serialize,
    StepFn: FnMut(SimTick, &mut State),
    SnapFn: FnMut(SimTick, &State) -> Snapshot,
{
    let mut frames = Vec::with_capacity(config.ticks as usize + 1);

    let mut tick = SimTick::ZERO;
    frames.push(MicroWorldtestFrame {
        tick: tick.0,
        snapshot: snapshot(tick, &state),
    });

    for _ in 0..config.ticks {
        step(tick, &mut state);
        tick = tick.advance(1);
        frames.push(MicroWorldtestFrame {
            tick: tick.0,
            snapshot: snapshot(tick, &state),
        });
    }

    if let Some(path) = &config.snapshot_path {
        let report = MicroWorldtestReport {
            name: &config.name,
            frames: &frames,
        };
        assert_json_snapshot(path, &report)?;
    }
    Ok(frames)
}
