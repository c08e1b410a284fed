use serde::{Deserialize, Serialize};

#[cfg(not(target_arch = "wasm32"))]
use crate::network::ItemPayload;

// ============================================================================
// Rarity
// ============================================================================

/// Rarity tier shared by quests and the items they reward.
///
/// Weights are relative likelihoods for quest selection, not percentages,
/// so they do not need to sum to any fixed total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 4] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Legendary,
    ];

    pub fn weight(&self) -> f64 {
        match self {
            Rarity::Common => 30.0,
            Rarity::Uncommon => 15.0,
            Rarity::Rare => 5.0,
            Rarity::Legendary => 0.5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Legendary => "Legendary",
        }
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Item Records
// ============================================================================

fn default_quantity() -> u32 {
    1
}

/// An item stack held in the inventory, or the single item a quest rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: u32,
    pub name: String,
    pub rarity: Rarity,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl ItemRecord {
    /// A fresh reward item; rewards always start as a single unit.
    pub fn reward(id: u32, name: &str, rarity: Rarity) -> Self {
        Self {
            id,
            name: name.to_string(),
            rarity,
            quantity: 1,
        }
    }
}

// ============================================================================
// Inventory
// ============================================================================

pub const INVENTORY_CAPACITY: usize = 10;

/// Returned when a new item name would need an eleventh slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("inventory is full ({} slots)", INVENTORY_CAPACITY)]
pub struct InventoryFull;

/// What happened to a reward that was added to the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Merged into an existing entry of the same name.
    Stacked { new_quantity: u32 },
    /// Took a new slot.
    Inserted,
}

/// Ordered item list, unique by name, at most [`INVENTORY_CAPACITY`] entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    items: Vec<ItemRecord>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= INVENTORY_CAPACITY
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ItemRecord> {
        self.items.iter().find(|item| item.name == name)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.find_by_name(name).is_some()
    }

    /// Whether an item with this name could be added: it either stacks onto
    /// an existing entry or there is a free slot.
    pub fn can_accept(&self, name: &str) -> bool {
        !self.is_full() || self.contains_name(name)
    }

    /// Add one unit of `item`, stacking by name. Leaves the inventory
    /// untouched when a new slot is needed and none is free.
    pub fn add_reward(&mut self, item: &ItemRecord) -> Result<AddOutcome, InventoryFull> {
        if let Some(existing) = self.items.iter_mut().find(|i| i.name == item.name) {
            existing.quantity = existing.quantity.saturating_add(1);
            return Ok(AddOutcome::Stacked {
                new_quantity: existing.quantity,
            });
        }

        if self.is_full() {
            return Err(InventoryFull);
        }

        let mut new_item = item.clone();
        new_item.quantity = 1;
        self.items.push(new_item);
        Ok(AddOutcome::Inserted)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Inventory in the shape the sync endpoint expects.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn to_payload(&self) -> Vec<ItemPayload> {
        self.items
            .iter()
            .map(|item| ItemPayload {
                item_id: item.id,
                quantity: item.quantity,
            })
            .collect()
    }
}

impl FromIterator<ItemRecord> for Inventory {
    fn from_iter<T: IntoIterator<Item = ItemRecord>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
