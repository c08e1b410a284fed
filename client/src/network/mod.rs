pub mod messages;
mod sync;

pub use messages::{AddInventoryResponse, InventoryPayload, ItemPayload};
pub use sync::{SyncClient, SyncError};
