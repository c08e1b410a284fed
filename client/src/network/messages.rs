use serde::{Deserialize, Serialize};

// === Client -> Server Messages ===

/// One inventory stack as the sync server stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPayload {
    #[serde(rename = "itemId")]
    pub item_id: u32,
    pub quantity: u32,
}

/// Body of `POST /inventory/add`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryPayload {
    #[serde(rename = "playerId")]
    pub player_id: String,
    pub items: Vec<ItemPayload>,
}

// === Server -> Client Messages ===

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddInventoryResponse {
    #[serde(default)]
    pub success: bool,
    pub error: Option<String>,
}
