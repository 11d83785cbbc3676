#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Hearthvale client simulation.
//!
//! This crate defines the value types and message surface that connect the
//! presentation layer, the simulation systems, and the remote authority.
//! Presentation submits [`Intent`] values describing what the player asked
//! for, systems mutate the session state in response, and the [`protocol`]
//! module describes every message exchanged with the authoritative server.

use std::{collections::HashMap, f32::consts::FRAC_PI_4, fmt};

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub mod protocol;

/// Canonical banner emitted when a session boots.
pub const WELCOME_BANNER: &str = "Welcome to Hearthvale.";

/// Location of a single grid tile expressed as column and row coordinates.
///
/// Rows grow southward, matching screen space.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Tile {
    x: u32,
    y: u32,
}

impl Tile {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Chebyshev (king-move) distance between two tiles.
    #[must_use]
    pub fn chebyshev_distance(self, other: Tile) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Returns the tile displaced by the provided offset, if it stays non-negative.
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32) -> Option<Tile> {
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Some(Tile::new(x, y))
    }

    /// World position located on the tile origin.
    #[must_use]
    pub fn to_world(self) -> WorldPos {
        WorldPos::new(self.x as f32, self.y as f32)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Continuous position in tile units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPos {
    /// Horizontal coordinate measured in tiles.
    pub x: f32,
    /// Vertical coordinate measured in tiles, growing southward.
    pub y: f32,
}

impl WorldPos {
    /// Creates a new world position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Tile containing the position, using the integer floor of each axis.
    ///
    /// Negative coordinates clamp to the first row or column.
    #[must_use]
    pub fn tile(self) -> Tile {
        Tile::new(self.x.floor().max(0.0) as u32, self.y.floor().max(0.0) as u32)
    }

    /// Converts the position into a `glam` vector.
    #[must_use]
    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Builds a position from a `glam` vector.
    #[must_use]
    pub fn from_vec2(value: Vec2) -> Self {
        Self::new(value.x, value.y)
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn distance(self, other: WorldPos) -> f32 {
        self.as_vec2().distance(other.as_vec2())
    }
}

impl From<Tile> for WorldPos {
    fn from(tile: Tile) -> Self {
        tile.to_world()
    }
}

/// Eight-way facing exposed to presentation and gameplay systems.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Facing {
    /// Toward decreasing rows.
    North,
    /// Toward decreasing rows and increasing columns.
    NorthEast,
    /// Toward increasing columns.
    East,
    /// Toward increasing rows and columns.
    SouthEast,
    /// Toward increasing rows.
    #[default]
    South,
    /// Toward increasing rows and decreasing columns.
    SouthWest,
    /// Toward decreasing columns.
    West,
    /// Toward decreasing rows and columns.
    NorthWest,
}

impl Facing {
    /// Buckets a movement vector into one of the eight facings.
    ///
    /// Returns `None` for a zero vector, where no facing can be derived.
    #[must_use]
    pub fn from_vector(dx: f32, dy: f32) -> Option<Facing> {
        if dx == 0.0 && dy == 0.0 {
            return None;
        }

        let octant = ((dy.atan2(dx) / FRAC_PI_4).round() as i32).rem_euclid(8);
        let facing = match octant {
            0 => Facing::East,
            1 => Facing::SouthEast,
            2 => Facing::South,
            3 => Facing::SouthWest,
            4 => Facing::West,
            5 => Facing::NorthWest,
            6 => Facing::North,
            _ => Facing::NorthEast,
        };
        Some(facing)
    }

    /// Facing from one tile toward another, if they differ.
    #[must_use]
    pub fn between(from: Tile, to: Tile) -> Option<Facing> {
        let dx = to.x() as f32 - from.x() as f32;
        let dy = to.y() as f32 - from.y() as f32;
        Self::from_vector(dx, dy)
    }
}

/// Identifier of an item definition, e.g. `"coins"` or `"oak_logs"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates a new item identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrowed string form of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Contents of a single inventory or bank slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    /// Item held by the slot.
    pub id: ItemId,
    /// Number of units held by the slot.
    pub quantity: u32,
    /// Whether the stack is the noted (always stackable) representation.
    #[serde(default, skip_serializing_if = "is_false")]
    pub noted: bool,
}

impl ItemStack {
    /// Creates an unnoted stack.
    #[must_use]
    pub fn new(id: impl Into<String>, quantity: u32) -> Self {
        Self {
            id: ItemId::new(id),
            quantity,
            noted: false,
        }
    }

    /// Returns the same stack flagged as noted.
    #[must_use]
    pub fn into_noted(mut self) -> Self {
        self.noted = true;
        self
    }

    /// Returns a copy of the stack carrying a different quantity.
    #[must_use]
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            id: self.id.clone(),
            quantity,
            noted: self.noted,
        }
    }

    /// Two stacks merge when both the item and the noted flag agree.
    #[must_use]
    pub fn stacks_with(&self, other: &ItemStack) -> bool {
        self.id == other.id && self.noted == other.noted
    }
}

/// Static description of an item's storage behaviour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Identifier of the described item.
    pub id: ItemId,
    /// Display name used in notices.
    #[serde(default)]
    pub name: String,
    /// Whether many units share a single inventory slot.
    #[serde(default)]
    pub stackable: bool,
    /// Whether the item is a book, which can never be noted.
    #[serde(default)]
    pub book: bool,
}

impl ItemDefinition {
    /// Name shown to the player, falling back to the identifier.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

/// Lookup table of item definitions.
#[derive(Clone, Debug, Default)]
pub struct ItemCatalog {
    definitions: HashMap<ItemId, ItemDefinition>,
}

impl ItemCatalog {
    /// Builds a catalog from the provided definitions. Later duplicates win.
    #[must_use]
    pub fn from_definitions(definitions: impl IntoIterator<Item = ItemDefinition>) -> Self {
        let definitions = definitions
            .into_iter()
            .map(|definition| (definition.id.clone(), definition))
            .collect();
        Self { definitions }
    }

    /// Definition registered for the item, if any.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&ItemDefinition> {
        self.definitions.get(id)
    }

    /// Unknown items are treated as non-stackable.
    #[must_use]
    pub fn is_stackable(&self, id: &ItemId) -> bool {
        self.get(id).is_some_and(|definition| definition.stackable)
    }

    /// Whether the item may be converted to its noted form.
    #[must_use]
    pub fn can_be_noted(&self, id: &ItemId) -> bool {
        self.get(id)
            .map_or(true, |definition| !definition.stackable && !definition.book)
    }

    /// Whether a stack occupies a single slot regardless of quantity.
    #[must_use]
    pub fn stack_occupies_one_slot(&self, stack: &ItemStack) -> bool {
        stack.noted || self.is_stackable(&stack.id)
    }

    /// Name used when telling the player about the item.
    #[must_use]
    pub fn display_name<'a>(&'a self, id: &'a ItemId) -> &'a str {
        self.get(id)
            .map_or(id.as_str(), ItemDefinition::display_name)
    }
}

/// Kind of harvestable node, e.g. `"tree"` or `"copper_rock"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKind(String);

impl NodeKind {
    /// Creates a new node kind.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrowed string form of the kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key identifying a resource node: its kind and the tile it occupies.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    /// Kind of the node.
    pub kind: NodeKind,
    /// Tile occupied by the node.
    pub tile: Tile,
}

impl NodeKey {
    /// Creates a new node key.
    #[must_use]
    pub fn new(kind: NodeKind, tile: Tile) -> Self {
        Self { kind, tile }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind, self.tile)
    }
}

/// Amount chosen from the deposit/withdraw quantity menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuantitySelector {
    /// A single unit.
    One,
    /// Five units.
    Five,
    /// Ten units.
    Ten,
    /// Fourteen units.
    Fourteen,
    /// A player-entered amount.
    Custom(u32),
    /// Every available unit of the item across all slots.
    All,
}

impl QuantitySelector {
    /// Resolves the selector against the number of units available.
    #[must_use]
    pub fn resolve(self, available: u32) -> u32 {
        let requested = match self {
            Self::One => 1,
            Self::Five => 5,
            Self::Ten => 10,
            Self::Fourteen => 14,
            Self::Custom(amount) => amount,
            Self::All => return available,
        };
        requested.min(available)
    }
}

/// Player intents produced by the presentation layer and consumed by the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Intent {
    /// Walk to the provided tile.
    MoveTo {
        /// Destination tile.
        tile: Tile,
    },
    /// Walk next to the resource node on the tile and harvest it on arrival.
    HarvestAt {
        /// Tile occupied by the node.
        tile: Tile,
    },
    /// Open the bank, walking to the bank booth on the tile first if provided.
    OpenBank {
        /// Bank booth to approach, or `None` when already standing at one.
        #[serde(default)]
        booth: Option<Tile>,
    },
    /// Close the bank interface.
    CloseBank,
    /// Deposit from an inventory slot.
    Deposit {
        /// Inventory slot that was clicked.
        slot: usize,
        /// Amount to deposit.
        amount: QuantitySelector,
    },
    /// Deposit every occupied inventory slot.
    DepositAll,
    /// Withdraw from a bank slot.
    Withdraw {
        /// Bank slot that was clicked.
        slot: usize,
        /// Amount to withdraw.
        amount: QuantitySelector,
    },
    /// Swap or move two bank slots.
    Reorganize {
        /// Slot being dragged.
        from: usize,
        /// Slot being dropped onto.
        to: usize,
    },
    /// Drop a bank slot onto another tab.
    MoveToTab {
        /// Slot being dragged.
        from: usize,
        /// Destination tab index.
        tab: usize,
    },
    /// Switch the active bank tab.
    SelectTab {
        /// Tab to activate.
        tab: usize,
    },
    /// Toggle withdrawal of noted items.
    SetNoteMode {
        /// Whether note mode should be active.
        enabled: bool,
    },
    /// Stop walking immediately.
    Cancel,
}

/// Severity attached to a player-facing notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    /// Informational message.
    Info,
    /// Something the player asked for did not happen.
    Warning,
}

/// Player-facing message surfaced by a system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    /// Severity of the notice.
    pub level: NoticeLevel,
    /// Human readable text.
    pub text: String,
}

impl Notice {
    /// Creates an informational notice.
    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    /// Creates a warning notice.
    #[must_use]
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }
}
