#![warn(missing_docs)]
//! Deterministic testing surfaces: JSONL event capture, the micro-worldtest
//! tick harness, golden JSON snapshots and transfer metrics reports.

mod metrics;
mod micro_worldtest;
mod snapshot;

use anyhow::{Context, Result};
use mdlogistics_core::SimTick;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub use metrics::*;
pub use micro_worldtest::*;
pub use snapshot::*;

/// Primary event record captured by headless tests.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a, P: Serialize> {
    /// Simulation tick when the event occurred.
    pub tick: SimTick,
    /// Short kind label.
    pub kind: &'a str,
    /// Event payload.
    pub payload: &'a P,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: BufWriter<File>,
    lines: usize,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent directories if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create event log {}", path.display()))?;
        Ok(Self {
            file: BufWriter::new(file),
            lines: 0,
        })
    }

    /// Append an event to the log.
    pub fn write<P: Serialize>(&mut self, event: &EventRecord<'_, P>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    /// Append every payload in `events` under one tick and kind.
    pub fn write_all<P: Serialize>(&mut self, tick: SimTick, kind: &str, events: &[P]) -> Result<()> {
        for payload in events {
            self.write(&EventRecord {
                tick,
                kind,
                payload,
            })?;
        }
        Ok(())
    }

    /// Lines written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Flush buffered lines to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        let _ = self.file.flush();
    }
}
