//! Slot containers mutated by transactions: the inventory and the tabbed bank.

use std::ops::Range;

use hearthvale_core::{protocol::SlotData, ItemId, ItemStack};

/// Default number of inventory slots.
pub const DEFAULT_INVENTORY_SLOTS: usize = 28;

/// Inventory collaborator consumed by the transaction client.
///
/// `stackable` tells the provider whether the stack may share a slot with
/// matching stacks; callers derive it from the item catalog.
pub trait InventoryProvider {
    /// Every slot, in order.
    fn slots(&self) -> &[Option<ItemStack>];

    /// Adds a whole stack, or nothing when it does not fit.
    fn add_item(&mut self, stack: &ItemStack, stackable: bool) -> bool;

    /// Removes up to `quantity` units from a slot and returns what was removed.
    fn remove_from_slot(&mut self, slot: usize, quantity: u32) -> Option<ItemStack>;

    /// Overwrites every slot with a canonical snapshot.
    fn replace_all(&mut self, slots: SlotData);

    /// Number of empty slots.
    fn free_slots(&self) -> usize {
        self.slots().iter().filter(|slot| slot.is_none()).count()
    }

    /// Stack held by a slot.
    fn slot(&self, slot: usize) -> Option<&ItemStack> {
        self.slots().get(slot).and_then(Option::as_ref)
    }
}

/// Fixed-size player inventory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inventory {
    slots: SlotData,
}

impl Inventory {
    /// Creates an empty inventory with the provided number of slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// Number of slots the inventory was created with.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(DEFAULT_INVENTORY_SLOTS)
    }
}

impl InventoryProvider for Inventory {
    fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    fn add_item(&mut self, stack: &ItemStack, stackable: bool) -> bool {
        if stack.quantity == 0 {
            return true;
        }

        if stackable {
            let merge = self
                .slots
                .iter()
                .position(|slot| slot.as_ref().is_some_and(|held| held.stacks_with(stack)));
            if let Some(index) = merge {
                let Some(held) = self.slots[index].as_mut() else {
                    return false;
                };
                let Some(total) = held.quantity.checked_add(stack.quantity) else {
                    return false;
                };
                held.quantity = total;
                return true;
            }
            return match self.slots.iter().position(Option::is_none) {
                Some(index) => {
                    self.slots[index] = Some(stack.clone());
                    true
                }
                None => false,
            };
        }

        let needed = stack.quantity as usize;
        if self.free_slots() < needed {
            return false;
        }
        let single = stack.with_quantity(1);
        for slot in self.slots.iter_mut().filter(|slot| slot.is_none()).take(needed) {
            *slot = Some(single.clone());
        }
        true
    }

    fn remove_from_slot(&mut self, slot: usize, quantity: u32) -> Option<ItemStack> {
        take_from(self.slots.get_mut(slot)?, quantity)
    }

    fn replace_all(&mut self, slots: SlotData) {
        let capacity = self.slots.len();
        self.slots = slots;
        if self.slots.len() < capacity {
            self.slots.resize(capacity, None);
        }
    }
}

/// Bank storage partitioned into equally sized tabs.
///
/// Every item stacks in the bank. Slot `i` belongs to tab `i / slots_per_tab`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bank {
    slots: SlotData,
    slots_per_tab: usize,
    tab_icons: Vec<Option<ItemId>>,
    active_tab: usize,
}

impl Bank {
    /// Creates an empty bank with `tabs × slots_per_tab` slots.
    #[must_use]
    pub fn new(tabs: usize, slots_per_tab: usize) -> Self {
        let tabs = tabs.max(1);
        let slots_per_tab = slots_per_tab.max(1);
        Self {
            slots: vec![None; tabs * slots_per_tab],
            slots_per_tab,
            tab_icons: vec![None; tabs],
            active_tab: 0,
        }
    }

    /// Every slot, in order.
    #[must_use]
    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    /// Stack held by a slot.
    #[must_use]
    pub fn slot(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Number of tabs.
    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.tab_icons.len()
    }

    /// Slots in each tab.
    #[must_use]
    pub const fn slots_per_tab(&self) -> usize {
        self.slots_per_tab
    }

    /// Tab containing the slot.
    #[must_use]
    pub const fn tab_of(&self, slot: usize) -> usize {
        slot / self.slots_per_tab
    }

    /// Slot indices belonging to a tab.
    #[must_use]
    pub fn tab_range(&self, tab: usize) -> Range<usize> {
        let start = (tab * self.slots_per_tab).min(self.slots.len());
        let end = (start + self.slots_per_tab).min(self.slots.len());
        start..end
    }

    /// Tab new deposits prefer.
    #[must_use]
    pub const fn active_tab(&self) -> usize {
        self.active_tab
    }

    /// Switches the active tab. Returns `false` for a tab that does not exist.
    pub fn set_active_tab(&mut self, tab: usize) -> bool {
        if tab >= self.tab_count() {
            return false;
        }
        self.active_tab = tab;
        true
    }

    /// Icon shown for every tab.
    #[must_use]
    pub fn tab_icons(&self) -> &[Option<ItemId>] {
        &self.tab_icons
    }

    /// Changes a tab icon and returns the previous one, or `None` for an unknown tab.
    pub fn set_tab_icon(&mut self, tab: usize, icon: Option<ItemId>) -> Option<Option<ItemId>> {
        let entry = self.tab_icons.get_mut(tab)?;
        Some(std::mem::replace(entry, icon))
    }

    /// Overwrites the tab icons, keeping the tab count.
    pub fn replace_tab_icons(&mut self, icons: Vec<Option<ItemId>>) {
        let tabs = self.tab_icons.len();
        self.tab_icons = icons;
        self.tab_icons.resize(tabs, None);
    }

    /// First slot anywhere in the bank holding a stack that merges with `stack`.
    #[must_use]
    pub fn find_stack(&self, stack: &ItemStack) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|held| held.stacks_with(stack)))
    }

    /// First empty slot of a tab.
    #[must_use]
    pub fn first_empty_in_tab(&self, tab: usize) -> Option<usize> {
        self.tab_range(tab).find(|&index| self.slots[index].is_none())
    }

    /// Slot a deposit of `stack` would land in: a merge anywhere, otherwise an
    /// empty slot in the active tab, otherwise any empty slot.
    #[must_use]
    pub fn deposit_target(&self, stack: &ItemStack) -> Option<usize> {
        self.find_stack(stack)
            .or_else(|| self.first_empty_in_tab(self.active_tab))
            .or_else(|| self.slots.iter().position(Option::is_none))
    }

    /// Stores a stack and returns the slot it landed in, or `None` when the bank is full.
    pub fn deposit(&mut self, stack: ItemStack) -> Option<usize> {
        let index = self.deposit_target(&stack)?;
        match self.slots[index].as_mut() {
            Some(held) => held.quantity = held.quantity.checked_add(stack.quantity)?,
            None => self.slots[index] = Some(stack),
        }
        Some(index)
    }

    /// Removes up to `quantity` units from a slot and returns what was removed.
    pub fn take(&mut self, slot: usize, quantity: u32) -> Option<ItemStack> {
        take_from(self.slots.get_mut(slot)?, quantity)
    }

    /// Swaps two slots, or moves into an empty one. Both slots must exist,
    /// differ, and `from` must be occupied.
    pub fn reorganize(&mut self, from: usize, to: usize) -> bool {
        if from == to || to >= self.slots.len() || self.slot(from).is_none() {
            return false;
        }
        self.slots.swap(from, to);
        true
    }

    /// Overwrites every slot with a canonical snapshot.
    pub fn replace_all(&mut self, slots: SlotData) {
        let capacity = self.tab_count() * self.slots_per_tab;
        self.slots = slots;
        if self.slots.len() < capacity {
            self.slots.resize(capacity, None);
        }
    }
}

impl Default for Bank {
    fn default() -> Self {
        Self::new(8, 50)
    }
}

fn take_from(slot: &mut Option<ItemStack>, quantity: u32) -> Option<ItemStack> {
    let held = slot.as_mut()?;
    if quantity == 0 {
        return None;
    }
    if quantity >= held.quantity {
        return slot.take();
    }
    held.quantity -= quantity;
    Some(held.with_quantity(quantity))
}

/// Copy of both containers taken immediately before a mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Bank slots.
    pub bank: SlotData,
    /// Inventory slots.
    pub inventory: SlotData,
}

/// Economic state owned by the session: one inventory and one bank.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Store<I = Inventory> {
    /// Player inventory.
    pub inventory: I,
    /// Player bank.
    pub bank: Bank,
}

impl<I: InventoryProvider> Store<I> {
    /// Bundles the containers.
    #[must_use]
    pub fn new(inventory: I, bank: Bank) -> Self {
        Self { inventory, bank }
    }

    /// Copies both containers.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            bank: self.bank.slots().to_vec(),
            inventory: self.inventory.slots().to_vec(),
        }
    }

    /// Puts both containers back to a snapshot.
    pub fn restore(&mut self, snapshot: &StoreSnapshot) {
        self.bank.replace_all(snapshot.bank.clone());
        self.inventory.replace_all(snapshot.inventory.clone());
    }
}
