//! Golden JSON files for worldtest reports.
//!
//! A report is stored with sorted object keys and a trailing newline, so the
//! file on disk only changes when the simulation does. Comparing fails on the
//! first differing line; exporting `MDL_UPDATE_SNAPSHOTS=1` regenerates the
//! golden file from the current run.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Environment variable that switches snapshot assertions to regeneration.
pub const UPDATE_SNAPSHOTS_ENV: &str = "MDL_UPDATE_SNAPSHOTS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Compare,
    Regenerate,
}

impl Mode {
    fn from_env() -> Self {
        match std::env::var(UPDATE_SNAPSHOTS_ENV) {
            Ok(flag) if matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes") => {
                Mode::Regenerate
            }
            _ => Mode::Compare,
        }
    }
}

/// Check `value` against the golden file at `path`, or rewrite the file when
/// regeneration is requested through [`UPDATE_SNAPSHOTS_ENV`].
pub fn assert_json_snapshot<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let rendered = canonical_json(value)?;
    match Mode::from_env() {
        Mode::Regenerate => regenerate(path, &rendered),
        Mode::Compare => compare(path, &rendered),
    }
}

fn compare(path: &Path, rendered: &str) -> Result<()> {
    let golden = fs::read_to_string(path).with_context(|| {
        format!(
            "No golden file at {}; set {UPDATE_SNAPSHOTS_ENV}=1 to generate it",
            path.display()
        )
    })?;
    if let Some((line, want, got)) = first_mismatch(&golden, rendered) {
        bail!(
            "{} differs at line {line}: expected `{want}`, got `{got}` (set {UPDATE_SNAPSHOTS_ENV}=1 to accept)",
            path.display()
        );
    }
    Ok(())
}

fn regenerate(path: &Path, rendered: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create golden directory {}", dir.display()))?;
    }
    fs::write(path, rendered).with_context(|| format!("Failed to write {}", path.display()))
}

/// 1-based line number and the two differing lines (`<eof>` past the end).
fn first_mismatch<'a>(golden: &'a str, rendered: &'a str) -> Option<(usize, &'a str, &'a str)> {
    let mut want = golden.lines();
    let mut got = rendered.lines();
    let mut line = 0;
    loop {
        line += 1;
        match (want.next(), got.next()) {
            (None, None) => return None,
            (a, b) if a == b => continue,
            (a, b) => return Some((line, a.unwrap_or("<eof>"), b.unwrap_or("<eof>"))),
        }
    }
}

/// Pretty JSON with every object's keys sorted, newline terminated.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value).context("Failed to serialize snapshot value")?;
    let mut text =
        serde_json::to_string_pretty(&sorted(value)).context("Failed to format snapshot JSON")?;
    text.push('\n');
    Ok(text)
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sorted(value)))
                    .collect::<Map<_, _>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        scalar => scalar,
    }
}
