//! StepOwl client library.
//!
//! Device-local side of the step-counting quest game: the quest catalog and
//! weighted offer selection, the game state driven by step-counter readings,
//! the save codec and the inventory sync client.

pub mod config;
pub mod game;
#[cfg(not(target_arch = "wasm32"))]
pub mod network;
pub mod storage;

pub use config::ClientConfig;
pub use game::{Game, GameError, GameState, QuestCatalog};
#[cfg(not(target_arch = "wasm32"))]
pub use network::SyncClient;
pub use storage::{FileStore, MemoryStore, SaveStore};
