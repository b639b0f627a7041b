use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;

/// Transfer tuning. Every field has a classic default, so a partial (or
/// missing) config file is fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Cooldown after a successful move, in ticks.
    pub transfer_cooldown: i32,
    /// Cooldown after a scheduled tick in which nothing moved (disabled
    /// hoppers included). Only applied when > 1.
    pub check_interval: i32,
    /// Units moved per eject or container pull.
    pub items_per_transfer: u16,
    /// Apply the transfer cooldown when the eject target has room but none of
    /// the hopper's stacks fit, or when a pull from a container finds no room.
    pub cooldown_when_full: bool,
    /// Skip entity-backed containers inside full solid blocks.
    pub ignore_occluding_blocks: bool,
    /// Ticks between viewer validity rechecks.
    pub viewer_recheck_interval: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            transfer_cooldown: 8,
            check_interval: 1,
            items_per_transfer: 1,
            cooldown_when_full: false,
            ignore_occluding_blocks: false,
            viewer_recheck_interval: 5,
        }
    }
}

impl TransferConfig {
    /// Load from TOML, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_lenient(&contents, &path.display().to_string()),
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    warn!("Transfer config not found at {}. Using defaults", path.display());
                } else {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                TransferConfig::default()
            }
        }
    }

    /// Parse TOML text, falling back to defaults on errors. `origin` names
    /// the source in the warning.
    pub fn from_toml_lenient(contents: &str, origin: &str) -> Self {
        match toml::from_str::<TransferConfig>(contents) {
            Ok(cfg) => cfg.sanitized(),
            Err(err) => {
                warn!("Failed to parse {origin}: {err}. Using defaults");
                TransferConfig::default()
            }
        }
    }

    /// Save as TOML.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    /// Clamp out-of-range values back to usable ones.
    pub fn sanitized(mut self) -> Self {
        if self.transfer_cooldown < 1 {
            warn!(value = self.transfer_cooldown, "transfer_cooldown must be >= 1; using 8");
            self.transfer_cooldown = 8;
        }
        if self.items_per_transfer == 0 {
            warn!("items_per_transfer must be >= 1; using 1");
            self.items_per_transfer = 1;
        }
        self.viewer_recheck_interval = self.viewer_recheck_interval.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = TransferConfig::from_toml_lenient("items_per_transfer = 4\n", "test");
        assert_eq!(cfg.items_per_transfer, 4);
        assert_eq!(cfg.transfer_cooldown, 8);
        assert_eq!(cfg.viewer_recheck_interval, 5);
    }

    #[test]
    fn malformed_toml_falls_back() {
        let cfg = TransferConfig::from_toml_lenient("transfer_cooldown = \"soon\"", "test");
        assert_eq!(cfg, TransferConfig::default());
    }

    #[test]
    fn nonsense_values_are_clamped() {
        let cfg = TransferConfig::from_toml_lenient(
            "transfer_cooldown = 0\nitems_per_transfer = 0\n",
            "test",
        );
        assert_eq!(cfg.transfer_cooldown, 8);
        assert_eq!(cfg.items_per_transfer, 1);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = TransferConfig::load_from_path(Path::new("/nonexistent/mdlogistics.toml"));
        assert_eq!(cfg, TransferConfig::default());
    }
}
