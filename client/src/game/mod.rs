pub mod item;
pub mod quest;
pub mod save;
pub mod state;

pub use item::{AddOutcome, Inventory, InventoryFull, ItemRecord, Rarity, INVENTORY_CAPACITY};
pub use quest::{CatalogError, QuestCatalog, QuestInstance, QuestTemplate, OFFER_COUNT};
pub use save::{SaveError, SAVE_KEY};
pub use state::{Game, GameError, GameState};
