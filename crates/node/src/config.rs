//! TOML configuration for the `generals` binary.

use anyhow::{Context, Result};
use generals_types::{Address, Order};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// File-level settings. Every field has a command-line override; the file
/// mainly exists so the participant table is written once and shared.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Tolerated Byzantine faults m; the run lasts m + 1 rounds.
    pub faults: Option<u32>,

    /// The commander's proposal. Ignored at every other id.
    pub order: Option<Order>,

    /// Participant addresses in id order; entry 0 is the commander.
    #[serde(default, rename = "peer")]
    pub peers: Vec<Address>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: FileConfig = toml::from_str(
            r#"
            faults = 1
            order = "attack"

            [[peer]]
            host = "10.0.0.1"
            port = 9000

            [[peer]]
            host = "10.0.0.2"
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.faults, Some(1));
        assert_eq!(config.order, Some(Order::Attack));
        assert_eq!(
            config.peers,
            vec![Address::new("10.0.0.1", 9000), Address::new("10.0.0.2", 9000)]
        );
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.faults, None);
        assert_eq!(config.order, None);
        assert!(config.peers.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("retries = 7").is_err());
    }
}
