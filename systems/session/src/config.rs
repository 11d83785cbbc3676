//! TOML session configuration.

use std::{collections::BTreeMap, time::Duration};

use hearthvale_core::{ItemDefinition, ItemId, NodeKind, Tile};
use hearthvale_system_transactions::DEFAULT_INVENTORY_SLOTS;
use hearthvale_world::{GridParseError, PlacementError};
use serde::Deserialize;
use thiserror::Error;

/// Configuration of the built-in demo world.
pub const DEMO_CONFIG: &str = include_str!("demo.toml");

/// Everything needed to build a [`crate::Session`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SessionConfig {
    /// Whether mutations are reconciled with a server.
    #[serde(default)]
    pub connected: bool,
    /// Number of inventory slots.
    #[serde(default = "default_inventory_slots")]
    pub inventory_slots: usize,
    /// Bank layout.
    #[serde(default)]
    pub bank: BankConfig,
    /// Grid layout and spawn point.
    pub world: WorldConfig,
    /// Capacity and pacing per node kind.
    #[serde(default)]
    pub node_kinds: BTreeMap<NodeKind, NodeKindConfig>,
    /// Placed resource nodes.
    #[serde(default)]
    pub nodes: Vec<NodePlacement>,
    /// Item definitions.
    #[serde(default)]
    pub items: Vec<ItemDefinition>,
}

/// Bank layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct BankConfig {
    /// Number of tabs.
    #[serde(default = "default_tabs")]
    pub tabs: usize,
    /// Slots in each tab.
    #[serde(default = "default_slots_per_tab")]
    pub slots_per_tab: usize,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            tabs: default_tabs(),
            slots_per_tab: default_slots_per_tab(),
        }
    }
}

/// Grid layout, one string per row: `.` walkable, `#` blocked, `B` bank booth.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Rows from north to south.
    pub rows: Vec<String>,
    /// Tile the player starts on, as `[x, y]`.
    pub spawn: [u32; 2],
}

impl WorldConfig {
    /// Spawn point as a tile.
    #[must_use]
    pub fn spawn_tile(&self) -> Tile {
        Tile::new(self.spawn[0], self.spawn[1])
    }
}

/// Capacity and pacing shared by every node of a kind.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NodeKindConfig {
    /// Units held by a full node.
    pub max_resources: u32,
    /// Seconds for a depleted node to regrow completely.
    pub respawn_secs: f64,
    /// Item added to the inventory per harvested unit.
    #[serde(default)]
    pub yield_item: Option<ItemId>,
}

impl NodeKindConfig {
    /// Respawn time as a duration, or `None` when negative or not finite.
    #[must_use]
    pub fn respawn_time(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.respawn_secs).ok()
    }
}

/// A resource node placed on the grid.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NodePlacement {
    /// Kind of the node; must appear in `node_kinds`.
    pub kind: NodeKind,
    /// Column of the node.
    pub x: u32,
    /// Row of the node.
    pub y: u32,
}

/// Reasons a configuration could not be turned into a session.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML text was malformed or missing required fields.
    #[error("invalid session config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The grid layout could not be parsed.
    #[error("invalid world layout: {0}")]
    Grid(#[from] GridParseError),
    /// A node references a kind with no `node_kinds` entry.
    #[error("node at {tile} uses unknown kind `{kind}`")]
    UnknownNodeKind {
        /// Kind named by the node.
        kind: NodeKind,
        /// Tile of the node.
        tile: Tile,
    },
    /// A node kind has an unusable respawn time.
    #[error("node kind `{0}` has an invalid respawn time")]
    InvalidRespawn(NodeKind),
    /// A node could not be placed onto the grid.
    #[error("node at {tile} cannot be placed: {source}")]
    Placement {
        /// Tile of the node.
        tile: Tile,
        /// Why placement failed.
        source: PlacementError,
    },
    /// The spawn point is not a walkable tile.
    #[error("spawn point {0} is not walkable")]
    SpawnBlocked(Tile),
}

impl SessionConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Configuration of the built-in demo world.
    pub fn demo() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEMO_CONFIG)
    }
}

fn default_inventory_slots() -> usize {
    DEFAULT_INVENTORY_SLOTS
}

fn default_tabs() -> usize {
    8
}

fn default_slots_per_tab() -> usize {
    50
}
