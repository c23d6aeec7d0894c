//! Module `config` define construction parameters shared by containers.

use serde::Deserialize;

use crate::Result;

/// Default name for containers.
pub const NAME: &str = "gcontainer";
/// Default order for [BTree][crate::tree::BTree], maximum number of
/// children per node.
pub const ORDER: usize = 3;
/// Minimum order allowed for [BTree][crate::tree::BTree].
pub const MIN_ORDER: usize = 3;

/// Configuration for containers.
///
/// Mode flags are consumed once, at construction, and never switched
/// later for the life of the container.
#[derive(Clone, Debug)]
pub struct Config {
    /// Name of the container, used in logs and stats.
    pub name: String,
    /// Concurrency-safe mode. When false, callers must serialize access.
    ///
    /// Default: true
    pub safe: bool,
    /// Whether a contending thread shall spin, or yield to the OS
    /// scheduler, while waiting for the latch. Relevant in safe mode.
    ///
    /// Default: true
    pub spin: bool,
    /// Maximum number of children per node, applicable to BTree.
    ///
    /// Default: [ORDER]
    pub order: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            name: NAME.to_string(),
            safe: true,
            spin: true,
            order: ORDER,
        }
    }
}

impl Config {
    pub fn new(name: &str) -> Config {
        Config {
            name: name.to_string(),
            ..Config::default()
        }
    }

    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = name.to_string();
        self
    }

    pub fn set_safe(&mut self, safe: bool) -> &mut Self {
        self.safe = safe;
        self
    }

    pub fn set_spin(&mut self, spin: bool) -> &mut Self {
        self.spin = spin;
        self
    }

    pub fn set_order(&mut self, order: usize) -> &mut Self {
        self.order = order;
        self
    }

    /// Parse configuration from toml text, absent fields shall pick
    /// their default values.
    pub fn from_toml(text: &str) -> Result<Config> {
        let cfg: TomlConfig = err_at!(FailToml, toml::from_str(text))?;
        let config: Config = cfg.into();
        if config.order < MIN_ORDER {
            err_at!(InvalidInput, msg: "b-tree order {} < {}", config.order, MIN_ORDER)
        } else {
            Ok(config)
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct TomlConfig {
    name: Option<String>,
    safe: Option<bool>,
    spin: Option<bool>,
    order: Option<usize>,
}

impl From<TomlConfig> for Config {
    fn from(cfg: TomlConfig) -> Config {
        let def = Config::default();
        Config {
            name: cfg.name.unwrap_or(def.name),
            safe: cfg.safe.unwrap_or(def.safe),
            spin: cfg.spin.unwrap_or(def.spin),
            order: cfg.order.unwrap_or(def.order),
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
