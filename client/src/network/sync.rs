//! Inventory sync client.
//!
//! Pushes the local inventory to the sync server so it can be picked up by
//! the desktop game. A sync is a single fire-and-forget attempt: it runs on
//! a background thread, reports through a callback and is never retried.

use std::thread::JoinHandle;
use std::time::Duration;

use super::messages::{AddInventoryResponse, InventoryPayload, ItemPayload};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("server returned {code}: {message}")]
    Status { code: u16, message: String },
    #[error("invalid server response: {0}")]
    Decode(String),
}

#[derive(Clone)]
pub struct SyncClient {
    base_url: String,
    agent: ureq::Agent,
}

impl SyncClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Blocking POST of the inventory to `/inventory/add`.
    pub fn send_inventory(&self, player_id: &str, items: &[ItemPayload]) -> Result<(), SyncError> {
        let url = format!("{}/inventory/add", self.base_url);
        let payload = InventoryPayload {
            player_id: player_id.to_string(),
            items: items.to_vec(),
        };

        let response = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_json(&payload)
            .map_err(map_ureq_error)?;

        let body: AddInventoryResponse = response
            .into_json()
            .map_err(|e| SyncError::Decode(e.to_string()))?;

        if body.success {
            Ok(())
        } else {
            Err(SyncError::Decode(
                body.error.unwrap_or_else(|| "server did not confirm sync".to_string()),
            ))
        }
    }

    /// Send the inventory without blocking the caller.
    ///
    /// Returns `None` when there is nothing to send. Otherwise the request
    /// runs on its own thread and `on_done` receives the outcome.
    pub fn sync_inventory<F>(
        &self,
        player_id: &str,
        items: Vec<ItemPayload>,
        on_done: F,
    ) -> Option<JoinHandle<()>>
    where
        F: FnOnce(Result<(), SyncError>) + Send + 'static,
    {
        if items.is_empty() {
            log::debug!("Inventory sync skipped for {}: nothing to send", player_id);
            return None;
        }

        let client = self.clone();
        let player_id = player_id.to_string();

        let spawned = std::thread::Builder::new()
            .name("inventory-sync".to_string())
            .spawn(move || {
                let result = client.send_inventory(&player_id, &items);
                match &result {
                    Ok(()) => log::info!("Synced {} item stacks for {}", items.len(), player_id),
                    Err(e) => log::error!("Inventory sync for {} failed: {}", player_id, e),
                }
                on_done(result);
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Failed to start inventory sync thread: {}", e);
                None
            }
        }
    }

    /// Fetch what the server currently stores for a player.
    pub fn fetch_inventory(&self, player_id: &str) -> Result<Vec<ItemPayload>, SyncError> {
        let url = format!(
            "{}/inventory/{}",
            self.base_url,
            urlencoding::encode(player_id)
        );

        self.agent
            .get(&url)
            .call()
            .map_err(map_ureq_error)?
            .into_json()
            .map_err(|e| SyncError::Decode(e.to_string()))
    }
}

fn map_ureq_error(err: ureq::Error) -> SyncError {
    match err {
        ureq::Error::Status(code, response) => {
            let message = response
                .into_json::<AddInventoryResponse>()
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| "no error message".to_string());
            SyncError::Status { code, message }
        }
        ureq::Error::Transport(transport) => SyncError::Transport(transport.to_string()),
    }
}
