#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session root owning every simulation component.
//!
//! Presentation submits [`Intent`] values and reads state back; it never
//! touches the components directly. Two clocks drive the session:
//! [`Session::frame`] advances movement on the animation clock and
//! [`Session::advance_clock`] advances regrowth and staggered deposits on
//! the wall clock. Server messages arrive through [`Session::receive`].

use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};

use hearthvale_core::{
    protocol::{ClientMessage, NodeAction, ServerMessage, SyncChannel},
    Facing, Intent, ItemCatalog, ItemId, ItemStack, NodeKey, NodeKind, Notice, Tile, WorldPos,
    WELCOME_BANNER,
};
use hearthvale_system_movement::{MovementController, MovementEvent};
use hearthvale_system_resources::{NodeSpec, ResourceEvent, ResourceNodeRegistry};
use hearthvale_system_transactions::{
    Bank, Inventory, InventoryProvider, Store, SyncMode, TransactionClient,
};
use hearthvale_world::{
    navigation::{find_path, find_path_to_adjacent},
    GridMap, WorldObject,
};
use tracing::{debug, info, warn};

mod config;

pub use config::{
    BankConfig, ConfigError, NodeKindConfig, NodePlacement, SessionConfig, WorldConfig,
    DEMO_CONFIG,
};

/// Action run when the player arrives at the end of a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArrivalAction {
    /// Harvest the node.
    Harvest(NodeKey),
    /// Open the bank interface.
    OpenBank,
}

/// Explicit owner of the grid, movement, resource nodes, store and channel.
#[derive(Debug)]
pub struct Session<C> {
    grid: GridMap,
    movement: MovementController<ArrivalAction>,
    resources: ResourceNodeRegistry,
    yields: BTreeMap<NodeKind, ItemId>,
    transactions: TransactionClient,
    store: Store,
    channel: C,
    intents: VecDeque<Intent>,
    movement_events: Vec<MovementEvent<ArrivalAction>>,
    resource_events: Vec<ResourceEvent>,
    notices: Vec<Notice>,
}

impl<C: SyncChannel> Session<C> {
    /// Creates a session with no resource nodes registered.
    #[must_use]
    pub fn new(
        grid: GridMap,
        spawn: Tile,
        transactions: TransactionClient,
        store: Store,
        channel: C,
    ) -> Self {
        info!(%spawn, "{WELCOME_BANNER}");
        Self {
            grid,
            movement: MovementController::new(spawn.to_world()),
            resources: ResourceNodeRegistry::new(),
            yields: BTreeMap::new(),
            transactions,
            store,
            channel,
            intents: VecDeque::new(),
            movement_events: Vec::new(),
            resource_events: Vec::new(),
            notices: Vec::new(),
        }
    }

    /// Builds a session from configuration, placing every configured node.
    pub fn from_config(config: &SessionConfig, channel: C) -> Result<Self, ConfigError> {
        let mut grid = GridMap::from_ascii(&config.world.rows)?;
        let spawn = config.world.spawn_tile();

        let mut nodes = Vec::with_capacity(config.nodes.len());
        for placement in &config.nodes {
            let tile = Tile::new(placement.x, placement.y);
            let Some(kind) = config.node_kinds.get(&placement.kind) else {
                return Err(ConfigError::UnknownNodeKind {
                    kind: placement.kind.clone(),
                    tile,
                });
            };
            let respawn = kind
                .respawn_time()
                .ok_or_else(|| ConfigError::InvalidRespawn(placement.kind.clone()))?;
            grid.place_object(tile, WorldObject::ResourceNode(placement.kind.clone()))
                .map_err(|source| ConfigError::Placement { tile, source })?;
            nodes.push((
                NodeKey::new(placement.kind.clone(), tile),
                NodeSpec::new(kind.max_resources, respawn),
                kind.yield_item.clone(),
            ));
        }
        if !grid.is_walkable(spawn) {
            return Err(ConfigError::SpawnBlocked(spawn));
        }

        let catalog = ItemCatalog::from_definitions(config.items.iter().cloned());
        let mode = if config.connected {
            SyncMode::Connected
        } else {
            SyncMode::Disconnected
        };
        let store = Store::new(
            Inventory::new(config.inventory_slots),
            Bank::new(config.bank.tabs, config.bank.slots_per_tab),
        );

        let mut session = Self::new(
            grid,
            spawn,
            TransactionClient::new(catalog, mode),
            store,
            channel,
        );
        for (key, spec, yield_item) in nodes {
            session.register_node(key, spec, yield_item);
        }
        Ok(session)
    }

    /// Registers a resource node already placed on the grid.
    pub fn register_node(&mut self, key: NodeKey, spec: NodeSpec, yield_item: Option<ItemId>) {
        if let Some(item) = yield_item {
            let _ = self.yields.insert(key.kind.clone(), item);
        }
        if !self.resources.register(key.clone(), spec) {
            debug!(node = %key, "node already registered");
        }
    }

    /// Queues an intent for the next frame.
    pub fn submit(&mut self, intent: Intent) {
        self.intents.push_back(intent);
    }

    /// Intents waiting for the next frame.
    #[must_use]
    pub fn queued_intents(&self) -> usize {
        self.intents.len()
    }

    /// Runs one animation frame: consumes queued intents, moves the player,
    /// and runs the arrival action once the destination is reached.
    pub fn frame(&mut self, dt: Duration) {
        while let Some(intent) = self.intents.pop_front() {
            self.handle_intent(intent);
        }

        let first_new = self.movement_events.len();
        self.movement.tick(dt, &mut self.movement_events);
        let arrivals: Vec<ArrivalAction> = self.movement_events[first_new..]
            .iter()
            .filter_map(|event| match event {
                MovementEvent::Completed { arrival, .. } => arrival.clone(),
                _ => None,
            })
            .collect();
        for arrival in arrivals {
            match arrival {
                ArrivalAction::Harvest(key) => self.harvest(&key),
                ArrivalAction::OpenBank => self.open_bank(),
            }
        }
    }

    /// Advances the wall clock driving regrowth and staggered deposits.
    pub fn advance_clock(&mut self, dt: Duration) {
        self.resources.advance(dt, &mut self.resource_events);
        self.transactions
            .advance(&mut self.store, &mut self.channel, dt);
    }

    /// Applies a message from the server.
    pub fn receive(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::ResourceDepleted { .. } => {
                if let Some(key) = message.node_key() {
                    let _ = self.resources.apply_depleted(&key, &mut self.resource_events);
                }
            }
            ServerMessage::ResourceRespawned { count, .. } => {
                if let Some(key) = message.node_key() {
                    let _ = self
                        .resources
                        .apply_respawned(&key, *count, &mut self.resource_events);
                }
            }
            _ => {
                let _ = self
                    .transactions
                    .receive(&mut self.store, &mut self.channel, message);
            }
        }
    }

    /// Current continuous position.
    #[must_use]
    pub fn position(&self) -> WorldPos {
        self.movement.position()
    }

    /// Tile the player stands on.
    #[must_use]
    pub fn tile(&self) -> Tile {
        self.movement.tile()
    }

    /// Current eight-way facing.
    #[must_use]
    pub fn facing(&self) -> Facing {
        self.movement.facing()
    }

    /// Reports whether the player is walking.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.movement.is_moving()
    }

    /// Units left on the node at the tile.
    #[must_use]
    pub fn node_count(&self, tile: Tile) -> Option<u32> {
        match self.grid.object_at(tile)? {
            WorldObject::ResourceNode(kind) => self
                .resources
                .resource_count(&NodeKey::new(kind.clone(), tile)),
            WorldObject::Bank => None,
        }
    }

    /// World grid.
    #[must_use]
    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    /// Movement controller.
    #[must_use]
    pub fn movement(&self) -> &MovementController<ArrivalAction> {
        &self.movement
    }

    /// Resource node registry.
    #[must_use]
    pub fn resources(&self) -> &ResourceNodeRegistry {
        &self.resources
    }

    /// Inventory and bank.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Transaction client.
    #[must_use]
    pub fn transactions(&self) -> &TransactionClient {
        &self.transactions
    }

    /// Channel messages are sent through.
    #[must_use]
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Switches between connected and disconnected mode.
    pub fn set_connected(&mut self, connected: bool) {
        self.transactions.set_connected(connected);
    }

    /// Takes the movement events raised since the last drain, oldest first.
    pub fn drain_movement_events(&mut self) -> Vec<MovementEvent<ArrivalAction>> {
        std::mem::take(&mut self.movement_events)
    }

    /// Takes the resource events raised since the last drain.
    pub fn drain_resource_events(&mut self) -> Vec<ResourceEvent> {
        std::mem::take(&mut self.resource_events)
    }

    /// Takes every notice raised since the last drain, oldest first.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut notices = std::mem::take(&mut self.notices);
        notices.extend(self.transactions.drain_notices());
        notices
    }

    fn handle_intent(&mut self, intent: Intent) {
        debug!(?intent, "intent");
        match intent {
            Intent::MoveTo { tile } => {
                let path = find_path(&self.grid, self.movement.position(), tile);
                if path.is_empty() {
                    self.notices.push(Notice::info("You can't reach that."));
                    return;
                }
                let _ = self.movement.clear_arrival();
                let _ = self.movement.follow(path, &mut self.movement_events);
            }
            Intent::HarvestAt { tile } => {
                let Some(WorldObject::ResourceNode(kind)) = self.grid.object_at(tile) else {
                    self.notices
                        .push(Notice::info("There is nothing to harvest there."));
                    return;
                };
                let key = NodeKey::new(kind.clone(), tile);
                if let Err(error) = self.resources.can_harvest(&key) {
                    self.notices.push(Notice::info(error.to_string()));
                    return;
                }
                self.walk_next_to(tile, ArrivalAction::Harvest(key));
            }
            Intent::OpenBank { booth: Some(booth) } => {
                if !matches!(self.grid.object_at(booth), Some(WorldObject::Bank)) {
                    self.notices.push(Notice::info("That is not a bank booth."));
                    return;
                }
                self.walk_next_to(booth, ArrivalAction::OpenBank);
            }
            Intent::OpenBank { booth: None } => {
                if self.movement.is_moving() || !self.grid.is_next_to_bank(self.tile()) {
                    self.notices
                        .push(Notice::info("You need to stand next to a bank booth."));
                    return;
                }
                self.open_bank();
            }
            Intent::CloseBank => self.transactions.close_bank(&self.store, &mut self.channel),
            Intent::Deposit { slot, amount } => {
                let _ = self
                    .transactions
                    .deposit(&mut self.store, &mut self.channel, slot, amount);
            }
            Intent::DepositAll => {
                let _ = self
                    .transactions
                    .deposit_all(&mut self.store, &mut self.channel);
            }
            Intent::Withdraw { slot, amount } => {
                let _ = self
                    .transactions
                    .withdraw(&mut self.store, &mut self.channel, slot, amount);
            }
            Intent::Reorganize { from, to } => {
                let _ = self
                    .transactions
                    .reorganize(&mut self.store, &mut self.channel, from, to);
            }
            Intent::MoveToTab { from, tab } => {
                let _ = self
                    .transactions
                    .move_to_tab(&mut self.store, &mut self.channel, from, tab);
            }
            Intent::SelectTab { tab } => {
                let _ = self.transactions.set_active_tab(&mut self.store, tab);
            }
            Intent::SetNoteMode { enabled } => self.transactions.set_note_mode(enabled),
            Intent::Cancel => self.movement.cancel(&mut self.movement_events),
        }
    }

    fn walk_next_to(&mut self, target: Tile, action: ArrivalAction) {
        let path = find_path_to_adjacent(&self.grid, self.movement.position(), target);
        if path.is_empty() {
            self.notices.push(Notice::info("You can't reach that."));
            return;
        }
        let _ = self.movement.set_arrival(action);
        let _ = self.movement.follow(path, &mut self.movement_events);
    }

    fn open_bank(&mut self) {
        self.transactions.open_bank(&mut self.channel);
        info!("bank opened");
    }

    fn harvest(&mut self, key: &NodeKey) {
        self.movement.face_towards(key.tile);
        if let Err(error) = self.resources.can_harvest(key) {
            self.notices.push(Notice::info(error.to_string()));
            return;
        }

        let loot = self.yields.get(&key.kind).map(|item| ItemStack {
            id: item.clone(),
            quantity: 1,
            noted: false,
        });
        let stackable = loot
            .as_ref()
            .is_some_and(|stack| self.transactions.catalog().is_stackable(&stack.id));
        if let Some(stack) = &loot {
            let merges = stackable
                && self
                    .store
                    .inventory
                    .slots()
                    .iter()
                    .flatten()
                    .any(|held| held.stacks_with(stack));
            if !merges && self.store.inventory.free_slots() == 0 {
                self.notices.push(Notice::info(format!(
                    "Your inventory is too full to hold any more {}.",
                    self.transactions.catalog().display_name(&stack.id)
                )));
                return;
            }
        }

        let remaining = match self.resources.harvest(key, &mut self.resource_events) {
            Ok(remaining) => remaining,
            Err(error) => {
                self.notices.push(Notice::info(error.to_string()));
                return;
            }
        };
        if let Some(stack) = loot {
            let _ = self.store.inventory.add_item(&stack, stackable);
        }
        debug!(node = %key, remaining, "harvested");

        if self.transactions.is_connected() {
            self.report(ClientMessage::resource_action(key, NodeAction::Harvest));
            if remaining == 0 {
                self.report(ClientMessage::resource_action(key, NodeAction::Deplete));
            }
        }
    }

    fn report(&mut self, message: ClientMessage) {
        if let Err(error) = self.channel.send(message) {
            warn!(%error, "resource report not sent");
        }
    }
}
