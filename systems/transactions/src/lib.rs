#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Inventory and bank mutations reconciled against an authoritative server.
//!
//! While disconnected every mutation is final. While connected the client
//! applies each mutation optimistically, sends a request over the
//! [`SyncChannel`] and records a [`PendingTransaction`]. A confirmation
//! carries the full canonical containers, which replace local state
//! outright. A denial is never undone arithmetically: the client asks for
//! one authoritative refresh and treats the next snapshot as ground truth.

use std::{collections::VecDeque, fmt, time::Duration};

use hearthvale_core::{
    protocol::{ClientMessage, ServerMessage, SlotData, SyncChannel},
    ItemCatalog, ItemId, ItemStack, Notice, QuantitySelector,
};
use tracing::{debug, info, warn};

mod containers;

pub use containers::{
    Bank, Inventory, InventoryProvider, Store, StoreSnapshot, DEFAULT_INVENTORY_SLOTS,
};

/// Delay between two requests issued by "deposit all".
pub const DEPOSIT_ALL_STAGGER: Duration = Duration::from_millis(100);

/// Whether mutations are reconciled with a server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncMode {
    /// Mutations are final immediately.
    Disconnected,
    /// Mutations are optimistic until the server answers.
    Connected,
}

/// Identifier assigned to each transaction in issue order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which confirmation resolves a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    /// Inventory to bank.
    Deposit,
    /// Bank to inventory.
    Withdraw,
    /// Bank slot to bank slot.
    Reorganize,
}

/// Lifecycle of a pending transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionState {
    /// Applied locally and awaiting the server's answer.
    OptimisticApplied,
    /// Denied; waiting for the authoritative refresh.
    Resyncing,
}

/// A request the server has not answered yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTransaction {
    /// Issue-order identifier.
    pub id: TransactionId,
    /// Confirmation family resolving the transaction.
    pub kind: TransactionKind,
    /// Message sent to the server.
    pub request: ClientMessage,
    /// Containers as they were right before the optimistic mutation.
    pub snapshot: StoreSnapshot,
    /// Transaction clock reading when the request was sent.
    pub issued_at: Duration,
    /// Current lifecycle state.
    pub state: TransactionState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct QueuedDeposit {
    slot: usize,
    due: Duration,
}

/// Applies inventory and bank mutations and reconciles them with the server.
#[derive(Debug)]
pub struct TransactionClient {
    catalog: ItemCatalog,
    mode: SyncMode,
    pending: VecDeque<PendingTransaction>,
    next_id: u64,
    refresh_in_flight: bool,
    last_version: Option<u64>,
    note_mode: bool,
    bank_open: bool,
    clock: Duration,
    deposit_queue: VecDeque<QueuedDeposit>,
    notices: Vec<Notice>,
}

impl TransactionClient {
    /// Creates a client with the bank closed and note mode off.
    #[must_use]
    pub fn new(catalog: ItemCatalog, mode: SyncMode) -> Self {
        Self {
            catalog,
            mode,
            pending: VecDeque::new(),
            next_id: 0,
            refresh_in_flight: false,
            last_version: None,
            note_mode: false,
            bank_open: false,
            clock: Duration::ZERO,
            deposit_queue: VecDeque::new(),
            notices: Vec::new(),
        }
    }

    /// Item definitions used for stacking and noting decisions.
    #[must_use]
    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    /// Current synchronisation mode.
    #[must_use]
    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Reports whether the client talks to a server.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.mode == SyncMode::Connected
    }

    /// Switches modes. Going offline discards every pending transaction.
    pub fn set_connected(&mut self, connected: bool) {
        let mode = if connected {
            SyncMode::Connected
        } else {
            SyncMode::Disconnected
        };
        if mode == self.mode {
            return;
        }

        if mode == SyncMode::Disconnected {
            if !self.pending.is_empty() {
                warn!(dropped = self.pending.len(), "pending transactions discarded");
            }
            self.pending.clear();
            self.refresh_in_flight = false;
        }
        self.mode = mode;
        info!(?mode, "sync mode changed");
    }

    /// Transactions still awaiting an answer, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &PendingTransaction> {
        self.pending.iter()
    }

    /// Number of transactions awaiting an answer.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether an authoritative refresh has been requested and not answered.
    #[must_use]
    pub fn refresh_in_flight(&self) -> bool {
        self.refresh_in_flight
    }

    /// Version of the last applied snapshot.
    #[must_use]
    pub fn last_version(&self) -> Option<u64> {
        self.last_version
    }

    /// Whether withdrawals are requested as notes.
    #[must_use]
    pub fn note_mode(&self) -> bool {
        self.note_mode
    }

    /// Toggles withdrawal as notes.
    pub fn set_note_mode(&mut self, enabled: bool) {
        self.note_mode = enabled;
    }

    /// Whether the bank interface is open.
    #[must_use]
    pub fn is_bank_open(&self) -> bool {
        self.bank_open
    }

    /// Current reading of the transaction clock.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock
    }

    /// Inventory slots still waiting in the "deposit all" queue.
    pub fn queued_deposits(&self) -> impl Iterator<Item = usize> + '_ {
        self.deposit_queue.iter().map(|queued| queued.slot)
    }

    /// Notices raised since the last drain.
    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Takes every notice raised since the last drain.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Opens the bank interface, requesting the canonical contents when connected.
    pub fn open_bank(&mut self, channel: &mut dyn SyncChannel) {
        self.bank_open = true;
        if self.is_connected() {
            self.request_refresh(channel);
        }
    }

    /// Closes the bank interface, pushing the local bank when connected.
    ///
    /// Queued "deposit all" entries are abandoned.
    pub fn close_bank<I: InventoryProvider>(
        &mut self,
        store: &Store<I>,
        channel: &mut dyn SyncChannel,
    ) {
        if !self.bank_open {
            return;
        }
        self.bank_open = false;
        self.deposit_queue.clear();

        if self.is_connected() {
            let message = ClientMessage::BankSync {
                bank_data: store.bank.slots().to_vec(),
            };
            if let Err(error) = channel.send(message) {
                warn!(%error, "bank sync not sent");
                self.notices
                    .push(Notice::warning("Your bank could not be saved to the server."));
            }
        }
    }

    /// Switches the bank tab new deposits prefer.
    pub fn set_active_tab<I: InventoryProvider>(&mut self, store: &mut Store<I>, tab: usize) -> bool {
        store.bank.set_active_tab(tab)
    }

    /// Changes the icon of a bank tab, telling the server when connected.
    pub fn set_tab_icon<I: InventoryProvider>(
        &mut self,
        store: &mut Store<I>,
        channel: &mut dyn SyncChannel,
        tab: usize,
        icon: Option<ItemId>,
    ) -> bool {
        let Some(previous) = store.bank.set_tab_icon(tab, icon.clone()) else {
            return false;
        };
        if !self.is_connected() {
            return true;
        }

        let message = ClientMessage::BankTabIconUpdate {
            tab_index: tab,
            icon,
        };
        if let Err(error) = channel.send(message) {
            warn!(%error, tab, "tab icon update not sent");
            let _ = store.bank.set_tab_icon(tab, previous);
            self.notices
                .push(Notice::warning("The tab icon could not be changed."));
            return false;
        }
        true
    }

    /// Deposits `amount` units of the item in an inventory slot.
    ///
    /// The total spans every inventory slot holding the same item with the
    /// same noted flag, draining the clicked slot first. One request is sent
    /// per source slot.
    pub fn deposit<I: InventoryProvider>(
        &mut self,
        store: &mut Store<I>,
        channel: &mut dyn SyncChannel,
        slot: usize,
        amount: QuantitySelector,
    ) -> bool {
        if !self.require_open_bank() {
            return false;
        }
        let Some(clicked) = store.inventory.slot(slot).cloned() else {
            return false;
        };

        let sources = matching_slots(store.inventory.slots(), slot, &clicked);
        let available = total_quantity(store.inventory.slots(), &sources);
        let mut remaining = amount.resolve(available);
        if remaining == 0 {
            return false;
        }
        if store.bank.deposit_target(&clicked).is_none() {
            self.bank_full();
            return false;
        }

        let mut deposited = false;
        for source in sources {
            if remaining == 0 {
                break;
            }
            let Some(held) = store.inventory.slot(source) else {
                continue;
            };
            let take = held.quantity.min(remaining);
            if !self.deposit_slot(store, channel, source, take) {
                break;
            }
            remaining -= take;
            deposited = true;
        }
        deposited
    }

    /// Queues one deposit per occupied inventory slot, staggered by
    /// [`DEPOSIT_ALL_STAGGER`] on the transaction clock.
    ///
    /// The first request goes out immediately. While disconnected every slot
    /// is deposited at once.
    pub fn deposit_all<I: InventoryProvider>(
        &mut self,
        store: &mut Store<I>,
        channel: &mut dyn SyncChannel,
    ) -> bool {
        if !self.require_open_bank() {
            return false;
        }

        let occupied: Vec<usize> = store
            .inventory
            .slots()
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| index)
            .filter(|index| !self.deposit_queue.iter().any(|queued| queued.slot == *index))
            .collect();
        if occupied.is_empty() {
            self.notices.push(Notice::info("You have nothing to deposit."));
            return false;
        }

        if !self.is_connected() {
            let mut deposited = false;
            for slot in occupied {
                let Some(quantity) = store.inventory.slot(slot).map(|held| held.quantity) else {
                    continue;
                };
                if !self.deposit_slot(store, channel, slot, quantity) {
                    break;
                }
                deposited = true;
            }
            return deposited;
        }

        let mut due = self
            .deposit_queue
            .back()
            .map_or(self.clock, |last| last.due.saturating_add(DEPOSIT_ALL_STAGGER));
        for slot in occupied {
            self.deposit_queue.push_back(QueuedDeposit { slot, due });
            due = due.saturating_add(DEPOSIT_ALL_STAGGER);
        }
        debug!(queued = self.deposit_queue.len(), "deposit all queued");
        self.release_due_deposits(store, channel);
        true
    }

    /// Advances the transaction clock, releasing queued "deposit all" requests.
    pub fn advance<I: InventoryProvider>(
        &mut self,
        store: &mut Store<I>,
        channel: &mut dyn SyncChannel,
        dt: Duration,
    ) {
        self.clock = self.clock.saturating_add(dt);
        self.release_due_deposits(store, channel);
    }

    /// Withdraws `amount` units of the item in a bank slot.
    ///
    /// With note mode on, items that are neither stackable nor books arrive
    /// noted; for other items note mode is ignored and the player is told
    /// why. A noted bank stack always withdraws noted. Non-stackable items
    /// are limited to the free inventory slots.
    pub fn withdraw<I: InventoryProvider>(
        &mut self,
        store: &mut Store<I>,
        channel: &mut dyn SyncChannel,
        slot: usize,
        amount: QuantitySelector,
    ) -> bool {
        if !self.require_open_bank() {
            return false;
        }
        let Some(clicked) = store.bank.slot(slot).cloned() else {
            return false;
        };

        let noted = if clicked.noted {
            true
        } else if self.note_mode && !self.catalog.can_be_noted(&clicked.id) {
            let name = self.catalog.display_name(&clicked.id);
            self.notices
                .push(Notice::info(format!("{name} cannot be withdrawn as a note.")));
            false
        } else {
            self.note_mode
        };
        let arriving = ItemStack {
            noted,
            ..clicked.with_quantity(1)
        };
        let one_slot = self.catalog.stack_occupies_one_slot(&arriving);

        let sources = matching_slots(store.bank.slots(), slot, &clicked);
        let available = total_quantity(store.bank.slots(), &sources);
        let requested = amount.resolve(available);
        if requested == 0 {
            return false;
        }

        let fits = if one_slot {
            let mergeable = store
                .inventory
                .slots()
                .iter()
                .flatten()
                .any(|held| held.stacks_with(&arriving));
            if mergeable || store.inventory.free_slots() > 0 {
                requested
            } else {
                0
            }
        } else {
            requested.min(u32::try_from(store.inventory.free_slots()).unwrap_or(u32::MAX))
        };
        if fits == 0 {
            self.inventory_full();
            return false;
        }
        if fits < requested {
            self.notices
                .push(Notice::info("You don't have enough inventory space."));
        }

        let mut remaining = fits;
        let mut withdrawn = false;
        for source in sources {
            if remaining == 0 {
                break;
            }
            let Some(held) = store.bank.slot(source) else {
                continue;
            };
            let take = held.quantity.min(remaining);
            if !self.withdraw_slot(store, channel, source, take, noted, one_slot) {
                break;
            }
            remaining -= take;
            withdrawn = true;
        }
        withdrawn
    }

    /// Swaps two bank slots, or moves into an empty one.
    pub fn reorganize<I: InventoryProvider>(
        &mut self,
        store: &mut Store<I>,
        channel: &mut dyn SyncChannel,
        from: usize,
        to: usize,
    ) -> bool {
        if !self.require_open_bank() {
            return false;
        }

        let snapshot = store.snapshot();
        if !store.bank.reorganize(from, to) {
            return false;
        }
        let request = ClientMessage::BankReorganizeRequest {
            from_slot: from,
            to_slot: to,
        };
        self.commit(store, channel, TransactionKind::Reorganize, request, snapshot)
    }

    /// Moves a bank slot into the first empty slot of another tab.
    pub fn move_to_tab<I: InventoryProvider>(
        &mut self,
        store: &mut Store<I>,
        channel: &mut dyn SyncChannel,
        from: usize,
        tab: usize,
    ) -> bool {
        if store.bank.slot(from).is_none()
            || tab >= store.bank.tab_count()
            || store.bank.tab_of(from) == tab
        {
            return false;
        }
        let Some(to) = store.bank.first_empty_in_tab(tab) else {
            self.notices.push(Notice::warning("That tab is full."));
            return false;
        };
        self.reorganize(store, channel, from, to)
    }

    /// Applies a server message. Returns `false` for messages that are not
    /// about the bank or inventory.
    pub fn receive<I: InventoryProvider>(
        &mut self,
        store: &mut Store<I>,
        channel: &mut dyn SyncChannel,
        message: &ServerMessage,
    ) -> bool {
        match message {
            ServerMessage::BankOpenConfirmed {
                bank_data,
                tab_data,
                inventory_data,
                version,
            } => {
                self.refresh_in_flight = false;
                let before = self.pending.len();
                self.pending
                    .retain(|pending| pending.state != TransactionState::Resyncing);
                if before != self.pending.len() {
                    debug!(resolved = before - self.pending.len(), "refresh resolved denials");
                }

                if self.accept_version(*version) {
                    store.bank.replace_all(bank_data.clone());
                    if !tab_data.is_empty() {
                        store.bank.replace_tab_icons(tab_data.clone());
                    }
                    if let Some(inventory) = inventory_data {
                        store.inventory.replace_all(inventory.clone());
                    }
                }
            }
            ServerMessage::BankOpenDenied { reason } => {
                warn!(%reason, "bank open denied");
                self.refresh_in_flight = false;
                self.bank_open = false;
                self.deposit_queue.clear();
                self.pending
                    .retain(|pending| pending.state != TransactionState::Resyncing);
                self.notices.push(Notice::warning(reason.clone()));
            }
            ServerMessage::BankDepositConfirmed {
                updated_bank,
                updated_inventory,
                item,
                version,
            }
            | ServerMessage::BankWithdrawConfirmed {
                updated_bank,
                updated_inventory,
                item,
                version,
            } => {
                let kind = if matches!(message, ServerMessage::BankDepositConfirmed { .. }) {
                    TransactionKind::Deposit
                } else {
                    TransactionKind::Withdraw
                };
                self.resolve_confirmed(kind, item.as_ref());
                self.apply_snapshot(store, *version, Some(updated_bank), Some(updated_inventory));
            }
            ServerMessage::BankReorganizeConfirmed { bank_data, version } => {
                self.resolve_confirmed(TransactionKind::Reorganize, None);
                self.apply_snapshot(store, *version, Some(bank_data), None);
            }
            ServerMessage::BankDepositDenied { reason } => {
                self.resolve_denied(channel, TransactionKind::Deposit, reason);
            }
            ServerMessage::BankWithdrawDenied { reason } => {
                self.resolve_denied(channel, TransactionKind::Withdraw, reason);
            }
            ServerMessage::BankReorganizeDenied { reason } => {
                self.resolve_denied(channel, TransactionKind::Reorganize, reason);
            }
            ServerMessage::ResourceDepleted { .. } | ServerMessage::ResourceRespawned { .. } => {
                return false;
            }
        }
        true
    }

    fn require_open_bank(&mut self) -> bool {
        if !self.bank_open {
            self.notices.push(Notice::warning("The bank is closed."));
        }
        self.bank_open
    }

    fn bank_full(&mut self) {
        self.notices.push(Notice::warning("Your bank is full."));
    }

    fn inventory_full(&mut self) {
        self.notices
            .push(Notice::warning("Your inventory is full."));
    }

    fn release_due_deposits<I: InventoryProvider>(
        &mut self,
        store: &mut Store<I>,
        channel: &mut dyn SyncChannel,
    ) {
        while let Some(head) = self.deposit_queue.front().copied() {
            if head.due > self.clock {
                break;
            }
            let _ = self.deposit_queue.pop_front();
            let Some(quantity) = store.inventory.slot(head.slot).map(|held| held.quantity) else {
                debug!(slot = head.slot, "queued deposit slot emptied meanwhile");
                continue;
            };
            if !self.deposit_slot(store, channel, head.slot, quantity) {
                self.deposit_queue.clear();
            }
        }
    }

    fn deposit_slot<I: InventoryProvider>(
        &mut self,
        store: &mut Store<I>,
        channel: &mut dyn SyncChannel,
        slot: usize,
        quantity: u32,
    ) -> bool {
        let Some(seen) = store.inventory.slot(slot).cloned() else {
            return false;
        };
        if store.bank.deposit_target(&seen).is_none() {
            self.bank_full();
            return false;
        }

        let snapshot = store.snapshot();
        let Some(removed) = store.inventory.remove_from_slot(slot, quantity) else {
            return false;
        };
        let quantity = removed.quantity;
        if store.bank.deposit(removed).is_none() {
            store.restore(&snapshot);
            self.bank_full();
            return false;
        }

        let request = ClientMessage::BankDepositRequest {
            inventory_slot: slot,
            item: seen,
            quantity,
            current_tab: store.bank.active_tab(),
        };
        self.commit(store, channel, TransactionKind::Deposit, request, snapshot)
    }

    fn withdraw_slot<I: InventoryProvider>(
        &mut self,
        store: &mut Store<I>,
        channel: &mut dyn SyncChannel,
        slot: usize,
        quantity: u32,
        noted: bool,
        one_slot: bool,
    ) -> bool {
        let Some(seen) = store.bank.slot(slot).cloned() else {
            return false;
        };

        let snapshot = store.snapshot();
        let Some(removed) = store.bank.take(slot, quantity) else {
            return false;
        };
        let quantity = removed.quantity;
        let arriving = ItemStack { noted, ..removed };
        if !store.inventory.add_item(&arriving, one_slot) {
            store.restore(&snapshot);
            self.inventory_full();
            return false;
        }

        let request = ClientMessage::BankWithdrawRequest {
            bank_slot: slot,
            item: seen,
            quantity,
            note_mode: noted,
        };
        self.commit(store, channel, TransactionKind::Withdraw, request, snapshot)
    }

    /// Finishes a mutation that has already been applied locally.
    fn commit<I: InventoryProvider>(
        &mut self,
        store: &mut Store<I>,
        channel: &mut dyn SyncChannel,
        kind: TransactionKind,
        request: ClientMessage,
        snapshot: StoreSnapshot,
    ) -> bool {
        if !self.is_connected() {
            debug!(?kind, "applied offline");
            return true;
        }

        if let Err(error) = channel.send(request.clone()) {
            warn!(%error, ?kind, "request not sent, rolling back");
            store.restore(&snapshot);
            self.notices
                .push(Notice::warning("The server could not be reached."));
            return false;
        }

        let id = TransactionId(self.next_id);
        self.next_id += 1;
        debug!(%id, ?kind, "optimistically applied");
        self.pending.push_back(PendingTransaction {
            id,
            kind,
            request,
            snapshot,
            issued_at: self.clock,
            state: TransactionState::OptimisticApplied,
        });
        true
    }

    fn oldest_awaiting(&self, kind: TransactionKind) -> Option<usize> {
        self.pending.iter().position(|pending| {
            pending.kind == kind && pending.state == TransactionState::OptimisticApplied
        })
    }

    fn resolve_confirmed(&mut self, kind: TransactionKind, item: Option<&ItemStack>) {
        match self.oldest_awaiting(kind) {
            Some(index) => {
                if let Some(resolved) = self.pending.remove(index) {
                    debug!(id = %resolved.id, ?kind, ?item, "transaction confirmed");
                }
            }
            None => debug!(?kind, "unsolicited confirmation"),
        }
    }

    fn resolve_denied(&mut self, channel: &mut dyn SyncChannel, kind: TransactionKind, reason: &str) {
        warn!(?kind, %reason, "transaction denied");
        self.notices.push(Notice::warning(reason));
        if let Some(index) = self.oldest_awaiting(kind) {
            self.pending[index].state = TransactionState::Resyncing;
        }
        self.request_refresh(channel);
    }

    /// Sends at most one authoritative refresh at a time.
    fn request_refresh(&mut self, channel: &mut dyn SyncChannel) {
        if self.refresh_in_flight {
            return;
        }
        match channel.send(ClientMessage::BankOpenRequest) {
            Ok(()) => self.refresh_in_flight = true,
            Err(error) => {
                warn!(%error, "refresh request not sent");
                self.notices
                    .push(Notice::warning("The server could not be reached."));
            }
        }
    }

    fn accept_version(&mut self, version: Option<u64>) -> bool {
        let Some(version) = version else {
            return true;
        };
        if self.last_version.is_some_and(|last| version < last) {
            warn!(version, last = ?self.last_version, "stale snapshot ignored");
            return false;
        }
        self.last_version = Some(version);
        true
    }

    fn apply_snapshot<I: InventoryProvider>(
        &mut self,
        store: &mut Store<I>,
        version: Option<u64>,
        bank: Option<&SlotData>,
        inventory: Option<&SlotData>,
    ) {
        if !self.accept_version(version) {
            return;
        }
        if let Some(bank) = bank {
            store.bank.replace_all(bank.clone());
        }
        if let Some(inventory) = inventory {
            store.inventory.replace_all(inventory.clone());
        }
    }
}

/// Slots holding stacks that merge with `clicked`, the clicked slot first.
fn matching_slots(slots: &[Option<ItemStack>], clicked_slot: usize, clicked: &ItemStack) -> Vec<usize> {
    std::iter::once(clicked_slot)
        .chain(
            slots
                .iter()
                .enumerate()
                .filter(|(index, slot)| {
                    *index != clicked_slot
                        && slot.as_ref().is_some_and(|held| held.stacks_with(clicked))
                })
                .map(|(index, _)| index),
        )
        .collect()
}

fn total_quantity(slots: &[Option<ItemStack>], sources: &[usize]) -> u32 {
    sources
        .iter()
        .filter_map(|&index| slots.get(index).and_then(Option::as_ref))
        .fold(0_u32, |total, held| total.saturating_add(held.quantity))
}

#[cfg(test)]
mod tests {
    use hearthvale_core::{ItemDefinition, NoticeLevel};

    use super::*;

    fn catalog() -> ItemCatalog {
        ItemCatalog::from_definitions([
            ItemDefinition {
                id: ItemId::new("coins"),
                name: "Coins".into(),
                stackable: true,
                book: false,
            },
            ItemDefinition {
                id: ItemId::new("logs"),
                name: "Logs".into(),
                stackable: false,
                book: false,
            },
        ])
    }

    fn offline() -> (TransactionClient, Store, Vec<ClientMessage>) {
        let mut client = TransactionClient::new(catalog(), SyncMode::Disconnected);
        let mut channel: Vec<ClientMessage> = Vec::new();
        client.open_bank(&mut channel);
        (client, Store::new(Inventory::new(4), Bank::new(2, 4)), channel)
    }

    #[test]
    fn offline_mutations_are_final_and_silent() {
        let (mut client, mut store, mut channel) = offline();
        let _ = store.inventory.add_item(&ItemStack::new("coins", 10), true);

        assert!(client.deposit(&mut store, &mut channel, 0, QuantitySelector::All));

        assert_eq!(store.bank.slot(0), Some(&ItemStack::new("coins", 10)));
        assert_eq!(store.inventory.slot(0), None);
        assert!(channel.is_empty());
        assert_eq!(client.pending_count(), 0);
    }

    #[test]
    fn closed_bank_refuses_mutations() {
        let mut client = TransactionClient::new(catalog(), SyncMode::Disconnected);
        let mut store: Store = Store::new(Inventory::new(4), Bank::new(1, 4));
        let _ = store.inventory.add_item(&ItemStack::new("coins", 1), true);

        let mut channel: Vec<ClientMessage> = Vec::new();
        assert!(!client.deposit(&mut store, &mut channel, 0, QuantitySelector::One));
        assert_eq!(client.notices()[0].level, NoticeLevel::Warning);
    }

    #[test]
    fn empty_slots_are_a_no_op() {
        let (mut client, mut store, mut channel) = offline();
        assert!(!client.deposit(&mut store, &mut channel, 2, QuantitySelector::All));
        assert!(!client.withdraw(&mut store, &mut channel, 2, QuantitySelector::All));
        assert!(client.notices().is_empty());
    }

    #[test]
    fn deposit_spans_matching_slots_clicked_first() {
        let (mut client, mut store, mut channel) = offline();
        for _ in 0..3 {
            let _ = store.inventory.add_item(&ItemStack::new("logs", 1), false);
        }

        assert!(client.deposit(&mut store, &mut channel, 2, QuantitySelector::Custom(2)));

        assert_eq!(store.inventory.slot(0), None);
        assert_eq!(store.inventory.slot(1), Some(&ItemStack::new("logs", 1)));
        assert_eq!(store.inventory.slot(2), None);
        assert_eq!(store.bank.slot(0), Some(&ItemStack::new("logs", 2)));
    }

    #[test]
    fn full_inventory_refuses_withdrawal_unchanged() {
        let (mut client, mut store, mut channel) = offline();
        store.inventory.replace_all(vec![Some(ItemStack::new("coins", 1)); 4]);
        store
            .bank
            .replace_all(vec![Some(ItemStack::new("logs", 3))]);
        let before = store.clone();

        assert!(!client.withdraw(&mut store, &mut channel, 0, QuantitySelector::One));
        assert_eq!(store, before);
        assert_eq!(
            client.drain_notices(),
            vec![Notice::warning("Your inventory is full.")]
        );
    }

    #[test]
    fn non_stackable_withdrawal_fits_what_it_can() {
        let (mut client, mut store, mut channel) = offline();
        store.inventory.replace_all(vec![Some(ItemStack::new("coins", 1)), None, None, None]);
        store.bank.replace_all(vec![Some(ItemStack::new("logs", 10))]);

        assert!(client.withdraw(&mut store, &mut channel, 0, QuantitySelector::All));

        assert_eq!(store.inventory.free_slots(), 0);
        assert_eq!(store.bank.slot(0), Some(&ItemStack::new("logs", 7)));
    }

    #[test]
    fn move_to_tab_uses_the_first_empty_slot_of_that_tab() {
        let (mut client, mut store, mut channel) = offline();
        store.bank.replace_all(vec![
            Some(ItemStack::new("coins", 5)),
            None,
            None,
            None,
            Some(ItemStack::new("logs", 1)),
        ]);

        assert!(client.move_to_tab(&mut store, &mut channel, 0, 1));
        assert_eq!(store.bank.slot(5), Some(&ItemStack::new("coins", 5)));
        assert!(!client.move_to_tab(&mut store, &mut channel, 5, 1));
    }

    #[test]
    fn only_older_versions_are_ignored() {
        let mut client = TransactionClient::new(catalog(), SyncMode::Connected);
        assert!(client.accept_version(Some(4)));
        assert!(client.accept_version(Some(4)));
        assert!(!client.accept_version(Some(2)));
        assert!(!client.accept_version(Some(3)));
        assert!(client.accept_version(None));
        assert!(client.accept_version(Some(5)));
        assert_eq!(client.last_version(), Some(5));
    }

    #[test]
    fn offline_deposit_all_into_a_full_bank_reports_failure() {
        let (mut client, mut store, mut channel) = offline();
        store.bank.replace_all(vec![Some(ItemStack::new("logs", 1)); 8]);
        let _ = store.inventory.add_item(&ItemStack::new("coins", 4), true);
        let before = store.clone();

        assert!(!client.deposit_all(&mut store, &mut channel));

        assert_eq!(store, before);
        assert_eq!(
            client.drain_notices(),
            vec![Notice::warning("Your bank is full.")]
        );
    }

    #[test]
    fn offline_deposit_all_empties_the_inventory() {
        let (mut client, mut store, mut channel) = offline();
        let _ = store.inventory.add_item(&ItemStack::new("coins", 4), true);
        let _ = store.inventory.add_item(&ItemStack::new("logs", 1), false);

        assert!(client.deposit_all(&mut store, &mut channel));

        assert_eq!(store.inventory.free_slots(), 4);
        assert!(channel.is_empty());
    }

    #[test]
    fn going_offline_drops_pending_transactions() {
        let mut client = TransactionClient::new(catalog(), SyncMode::Connected);
        let mut store: Store = Store::new(Inventory::new(4), Bank::new(1, 4));
        let mut channel: Vec<ClientMessage> = Vec::new();
        client.open_bank(&mut channel);
        let _ = store.inventory.add_item(&ItemStack::new("coins", 3), true);
        assert!(client.deposit(&mut store, &mut channel, 0, QuantitySelector::All));
        assert_eq!(client.pending_count(), 1);

        client.set_connected(false);

        assert_eq!(client.pending_count(), 0);
        assert!(!client.refresh_in_flight());
    }
}
