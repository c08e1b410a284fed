//! Game state and the actions a player can take on it.
//!
//! [`Game`] owns the single [`GameState`] for a device. Step-counter readings
//! and player actions are applied through its methods, and every change is
//! written back to the save store straight away.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::item::{Inventory, InventoryFull};
use super::quest::{QuestCatalog, QuestInstance};
use super::save;
use crate::storage::SaveStore;

#[cfg(not(target_arch = "wasm32"))]
use crate::network::{SyncClient, SyncError};

/// Everything that survives an app restart.
///
/// At rest either a quest is active or offers are available, never both:
/// accepting a quest clears the offers, and cancelling or claiming draws new
/// ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Step-counter reading when the active quest was accepted.
    #[serde(default)]
    pub steps_at_quest_start: f64,
    #[serde(default)]
    pub inventory: Inventory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_quest: Option<QuestInstance>,
    #[serde(default)]
    pub available_quests: Vec<QuestInstance>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("no quest is active")]
    NoActiveQuest,
    #[error("the active quest is not completed yet")]
    QuestNotCompleted,
    #[error("quest {0} is not on offer")]
    UnknownQuest(String),
    #[error("inventory is full; only rewards that stack can be accepted")]
    InventoryFull,
    #[error("a player id is required to sync")]
    MissingPlayerId,
}

impl From<InventoryFull> for GameError {
    fn from(_: InventoryFull) -> Self {
        GameError::InventoryFull
    }
}

pub struct Game<R: Rng> {
    state: GameState,
    catalog: Arc<QuestCatalog>,
    rng: R,
    store: Box<dyn SaveStore>,
    /// Raw step-counter total since device boot.
    current_sensor_steps: f64,
    /// First reading seen this session.
    session_baseline: Option<f64>,
}

impl<R: Rng> Game<R> {
    /// Restore the saved game from `store`, drawing fresh offers if the
    /// player has neither an active quest nor anything to choose from.
    pub fn new(catalog: Arc<QuestCatalog>, store: Box<dyn SaveStore>, rng: R) -> Self {
        let state = save::load_state(store.as_ref());

        let mut game = Self {
            state,
            catalog,
            rng,
            store,
            current_sensor_steps: 0.0,
            session_baseline: None,
        };

        if game.state.active_quest.is_none() && game.state.available_quests.is_empty() {
            game.regenerate_offers();
            game.persist();
        }

        game
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn inventory(&self) -> &Inventory {
        &self.state.inventory
    }

    pub fn active_quest(&self) -> Option<&QuestInstance> {
        self.state.active_quest.as_ref()
    }

    pub fn available_quests(&self) -> &[QuestInstance] {
        &self.state.available_quests
    }

    pub fn catalog(&self) -> &QuestCatalog {
        &self.catalog
    }

    pub fn current_sensor_steps(&self) -> f64 {
        self.current_sensor_steps
    }

    pub fn session_baseline(&self) -> Option<f64> {
        self.session_baseline
    }

    /// Steps walked towards the active quest, as shown to the player.
    pub fn steps_in_quest(&self) -> u64 {
        if self.state.active_quest.is_none() {
            return 0;
        }
        (self.current_sensor_steps - self.state.steps_at_quest_start).max(0.0) as u64
    }

    /// Whether accepting `quest` could ever pay out: its reward must either
    /// stack onto an existing entry or fit in a free slot.
    pub fn can_accept(&self, quest: &QuestInstance) -> bool {
        self.state.inventory.can_accept(&quest.reward_item.name)
    }

    // ========================================================================
    // Sensor input
    // ========================================================================

    /// Feed a step-counter reading. The counter only resets on reboot, so
    /// progress is always measured against a stored reading.
    pub fn update_steps(&mut self, sensor_total: f64) {
        if self.session_baseline.is_none() {
            self.session_baseline = Some(sensor_total);
        }
        self.current_sensor_steps = sensor_total;

        self.check_progress(sensor_total);
    }

    /// Mark the active quest completed once enough steps have been walked.
    /// Completion is saved immediately so it survives the app being killed
    /// before the reward is claimed.
    pub fn check_progress(&mut self, sensor_total: f64) {
        let start = self.state.steps_at_quest_start;
        let Some(active) = self.state.active_quest.as_mut() else {
            return;
        };

        if !active.is_completed && sensor_total - start >= f64::from(active.target_steps) {
            active.is_completed = true;
            log::info!("Quest '{}' completed", active.description);
            self.persist();
        }
    }

    // ========================================================================
    // Player actions
    // ========================================================================

    /// Accept one of the offered quests.
    pub fn select_quest(&mut self, quest_id: &str) -> Result<(), GameError> {
        let quest = self
            .state
            .available_quests
            .iter()
            .find(|q| q.id == quest_id)
            .cloned()
            .ok_or_else(|| GameError::UnknownQuest(quest_id.to_string()))?;

        if !self.can_accept(&quest) {
            return Err(GameError::InventoryFull);
        }

        log::info!(
            "Accepted quest '{}' ({} steps for {})",
            quest.description,
            quest.target_steps,
            quest.reward_item.name
        );
        self.state.active_quest = Some(quest);
        self.state.available_quests.clear();
        self.state.steps_at_quest_start = self.current_sensor_steps;
        self.persist();
        Ok(())
    }

    /// Give up on the active quest and draw new offers.
    pub fn cancel_quest(&mut self) -> Result<(), GameError> {
        let Some(quest) = self.state.active_quest.take() else {
            return Err(GameError::NoActiveQuest);
        };

        log::info!("Cancelled quest '{}'", quest.description);
        self.state.steps_at_quest_start = 0.0;
        self.regenerate_offers();
        self.persist();
        Ok(())
    }

    /// Debug shortcut: rewind the quest start so the step math reports the
    /// target as reached. The reward still has to be claimed normally.
    pub fn debug_force_complete(&mut self) -> Result<(), GameError> {
        let Some(active) = self.state.active_quest.as_mut() else {
            return Err(GameError::NoActiveQuest);
        };

        self.state.steps_at_quest_start = self.current_sensor_steps - f64::from(active.target_steps);
        active.is_completed = true;
        log::warn!("Quest '{}' force-completed", active.description);
        self.persist();
        Ok(())
    }

    /// Move the completed quest's reward into the inventory.
    ///
    /// A reward that neither stacks nor fits is refused and the quest stays
    /// active, so the player is stuck until a slot frees up.
    pub fn claim_reward(&mut self) -> Result<(), GameError> {
        let Some(active) = self.state.active_quest.as_ref() else {
            return Err(GameError::NoActiveQuest);
        };
        if !active.is_completed {
            return Err(GameError::QuestNotCompleted);
        }

        let outcome = self.state.inventory.add_reward(&active.reward_item)?;
        log::info!("Claimed {} ({:?})", active.reward_item.name, outcome);

        self.state.active_quest = None;
        self.regenerate_offers();
        self.persist();
        Ok(())
    }

    pub fn clear_inventory(&mut self) {
        self.state.inventory.clear();
        self.persist();
    }

    /// Push the inventory to the sync server and empty it locally.
    ///
    /// The local inventory is cleared as soon as the request is dispatched,
    /// whatever the server eventually answers; a failed sync loses the
    /// batch. `on_done` receives the server outcome.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn sync_inventory<F>(
        &mut self,
        client: &SyncClient,
        player_id: &str,
        on_done: F,
    ) -> Result<Option<std::thread::JoinHandle<()>>, GameError>
    where
        F: FnOnce(Result<(), SyncError>) + Send + 'static,
    {
        let player_id = player_id.trim();
        if player_id.is_empty() {
            return Err(GameError::MissingPlayerId);
        }

        let payload = self.state.inventory.to_payload();
        let handle = client.sync_inventory(player_id, payload, on_done);
        self.clear_inventory();
        Ok(handle)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn regenerate_offers(&mut self) {
        self.state.available_quests = self.catalog.generate_offers(&mut self.rng);
    }

    /// Write the full state to the store. Failures are logged, never raised.
    fn persist(&mut self) {
        if let Err(e) = save::save_state(self.store.as_mut(), &self.state) {
            log::error!("Failed to save game: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::item::{ItemRecord, Rarity, INVENTORY_CAPACITY};
    use crate::game::quest::OFFER_COUNT;
    use crate::storage::{MemoryStore, StorageError};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    /// Store handle whose contents stay visible to the test after the game
    /// takes ownership of a clone.
    #[derive(Clone, Default)]
    struct SharedStore(Arc<Mutex<MemoryStore>>);

    impl SaveStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.lock().unwrap().get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.0.lock().unwrap().set(key, value)
        }
    }

    fn new_game(store: &SharedStore) -> Game<StdRng> {
        let catalog = Arc::new(QuestCatalog::builtin().unwrap());
        Game::new(catalog, Box::new(store.clone()), StdRng::seed_from_u64(99))
    }

    fn saved_state(store: &SharedStore) -> GameState {
        save::load_state(store)
    }

    fn quest_for(game: &Game<StdRng>, name: &str, id: u32, target_steps: u32) -> QuestInstance {
        let mut quest = game.available_quests()[0].clone();
        quest.id = format!("quest-{}", id);
        quest.description = format!("Find a {}", name);
        quest.target_steps = target_steps;
        quest.reward_item = ItemRecord::reward(id, name, Rarity::Rare);
        quest.is_completed = false;
        quest
    }

    fn fill_inventory(game: &mut Game<StdRng>, count: usize) {
        game.state.inventory = (0..count)
            .map(|i| ItemRecord::reward(100 + i as u32, &format!("Trinket {}", i), Rarity::Common))
            .collect();
    }

    /// Put `quest` on offer and accept it.
    fn accept(game: &mut Game<StdRng>, quest: QuestInstance) {
        let id = quest.id.clone();
        game.state.available_quests = vec![quest];
        game.select_quest(&id).unwrap();
    }

    #[test]
    fn test_new_game_has_offers_and_saves_them() {
        let store = SharedStore::default();
        let game = new_game(&store);

        assert!(game.active_quest().is_none());
        assert_eq!(game.available_quests().len(), OFFER_COUNT);
        assert_eq!(saved_state(&store), *game.state());
    }

    #[test]
    fn test_reload_restores_saved_state() {
        let store = SharedStore::default();
        let mut game = new_game(&store);
        game.update_steps(1000.0);
        let first_id = game.available_quests()[0].id.clone();
        game.select_quest(&first_id).unwrap();

        let reloaded = new_game(&store);
        assert_eq!(reloaded.state(), game.state());
        assert_eq!(reloaded.active_quest().unwrap().id, first_id);
    }

    #[test]
    fn test_select_quest_sets_start_and_clears_offers() {
        let store = SharedStore::default();
        let mut game = new_game(&store);
        game.update_steps(5000.0);

        let id = game.available_quests()[1].id.clone();
        game.select_quest(&id).unwrap();

        assert_eq!(game.active_quest().unwrap().id, id);
        assert!(game.available_quests().is_empty());
        assert_eq!(game.state().steps_at_quest_start, 5000.0);
        assert_eq!(saved_state(&store), *game.state());
    }

    #[test]
    fn test_select_unknown_quest_is_rejected() {
        let store = SharedStore::default();
        let mut game = new_game(&store);
        assert_eq!(
            game.select_quest("nope"),
            Err(GameError::UnknownQuest("nope".to_string()))
        );
        assert_eq!(game.available_quests().len(), OFFER_COUNT);
    }

    #[test]
    fn test_select_rejected_when_full_and_not_stackable() {
        let store = SharedStore::default();
        let mut game = new_game(&store);
        fill_inventory(&mut game, INVENTORY_CAPACITY);

        let new_reward = quest_for(&game, "Rose", 13, 500);
        let stackable = quest_for(&game, "Trinket 4", 104, 500);
        game.state.available_quests = vec![new_reward.clone(), stackable.clone()];

        assert_eq!(game.select_quest(&new_reward.id), Err(GameError::InventoryFull));
        assert!(game.active_quest().is_none());
        assert_eq!(game.available_quests().len(), 2);

        game.select_quest(&stackable.id).unwrap();
        assert_eq!(game.active_quest().unwrap().reward_item.name, "Trinket 4");
    }

    #[test]
    fn test_select_accepted_below_capacity() {
        let store = SharedStore::default();
        let mut game = new_game(&store);
        fill_inventory(&mut game, INVENTORY_CAPACITY - 1);

        let quest = quest_for(&game, "Rose", 13, 500);
        accept(&mut game, quest);
        assert!(game.active_quest().is_some());
    }

    #[test]
    fn test_progress_uses_steps_since_quest_start() {
        let store = SharedStore::default();
        let mut game = new_game(&store);
        assert_eq!(game.session_baseline(), None);

        game.update_steps(12_000.0);
        assert_eq!(game.session_baseline(), Some(12_000.0));

        let quest = quest_for(&game, "Rose", 13, 500);
        accept(&mut game, quest);

        game.update_steps(12_499.0);
        assert!(!game.active_quest().unwrap().is_completed);
        assert_eq!(game.steps_in_quest(), 499);

        game.update_steps(12_500.0);
        assert!(game.active_quest().unwrap().is_completed);
        assert_eq!(game.session_baseline(), Some(12_000.0));

        // Completion was saved before any claim
        assert!(saved_state(&store).active_quest.unwrap().is_completed);
    }

    #[test]
    fn test_steps_in_quest_without_active_quest() {
        let store = SharedStore::default();
        let mut game = new_game(&store);
        game.update_steps(300.0);
        assert_eq!(game.steps_in_quest(), 0);
    }

    #[test]
    fn test_cancel_quest() {
        let store = SharedStore::default();
        let mut game = new_game(&store);
        assert_eq!(game.cancel_quest(), Err(GameError::NoActiveQuest));

        game.update_steps(800.0);
        let quest = quest_for(&game, "Pearl", 14, 500);
        accept(&mut game, quest);

        game.cancel_quest().unwrap();
        assert!(game.active_quest().is_none());
        assert_eq!(game.state().steps_at_quest_start, 0.0);
        assert_eq!(game.available_quests().len(), OFFER_COUNT);
        assert_eq!(saved_state(&store), *game.state());
    }

    #[test]
    fn test_debug_force_complete_rewinds_start() {
        let store = SharedStore::default();
        let mut game = new_game(&store);
        assert_eq!(game.debug_force_complete(), Err(GameError::NoActiveQuest));

        game.update_steps(2000.0);
        let quest = quest_for(&game, "Gold Dust", 16, 10_000);
        accept(&mut game, quest);

        game.debug_force_complete().unwrap();
        assert!(game.active_quest().unwrap().is_completed);
        assert_eq!(game.state().steps_at_quest_start, 2000.0 - 10_000.0);
        assert_eq!(game.steps_in_quest(), 10_000);

        // Still needs a normal claim
        assert!(game.inventory().is_empty());
        game.claim_reward().unwrap();
        assert_eq!(game.inventory().items()[0].name, "Gold Dust");
    }

    #[test]
    fn test_claim_requires_completed_quest() {
        let store = SharedStore::default();
        let mut game = new_game(&store);
        assert_eq!(game.claim_reward(), Err(GameError::NoActiveQuest));

        let quest = quest_for(&game, "Rose", 13, 500);
        accept(&mut game, quest);
        assert_eq!(game.claim_reward(), Err(GameError::QuestNotCompleted));
        assert!(game.active_quest().is_some());
    }

    #[test]
    fn test_claim_stacks_existing_item() {
        let store = SharedStore::default();
        let mut game = new_game(&store);

        let mut rose = ItemRecord::reward(13, "Rose", Rarity::Rare);
        rose.quantity = 2;
        game.state.inventory = vec![rose].into_iter().collect();

        let quest = quest_for(&game, "Rose", 13, 500);
        accept(&mut game, quest);
        game.debug_force_complete().unwrap();
        game.claim_reward().unwrap();

        let inventory = game.inventory();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.find_by_name("Rose").unwrap().quantity, 3);
        assert!(game.active_quest().is_none());
        assert_eq!(game.available_quests().len(), OFFER_COUNT);
        assert_eq!(saved_state(&store), *game.state());
    }

    #[test]
    fn test_claim_inserts_new_item() {
        let store = SharedStore::default();
        let mut game = new_game(&store);

        let quest = quest_for(&game, "Pearl", 14, 500);
        accept(&mut game, quest);
        game.update_steps(500.0);
        game.claim_reward().unwrap();

        assert_eq!(game.inventory().len(), 1);
        let pearl = &game.inventory().items()[0];
        assert_eq!((pearl.id, pearl.quantity), (14, 1));
    }

    #[test]
    fn test_claim_when_full_leaves_quest_stuck() {
        let store = SharedStore::default();
        let mut game = new_game(&store);

        let quest = quest_for(&game, "Rose", 13, 500);
        accept(&mut game, quest);
        game.debug_force_complete().unwrap();

        // Slots filled up after the quest was accepted
        fill_inventory(&mut game, INVENTORY_CAPACITY);
        let before = game.inventory().clone();

        assert_eq!(game.claim_reward(), Err(GameError::InventoryFull));
        assert_eq!(*game.inventory(), before);
        assert_eq!(game.active_quest().unwrap().reward_item.name, "Rose");
        assert!(game.available_quests().is_empty());
    }

    #[test]
    fn test_clear_inventory_persists() {
        let store = SharedStore::default();
        let mut game = new_game(&store);
        fill_inventory(&mut game, 3);
        game.clear_inventory();
        assert!(game.inventory().is_empty());
        assert!(saved_state(&store).inventory.is_empty());
    }

    #[test]
    fn test_sync_requires_player_id() {
        let store = SharedStore::default();
        let mut game = new_game(&store);
        fill_inventory(&mut game, 2);

        let client = SyncClient::new("http://127.0.0.1:1", std::time::Duration::from_secs(1));
        let result = game.sync_inventory(&client, "   ", |_| {});
        assert!(matches!(result, Err(GameError::MissingPlayerId)));
        assert_eq!(game.inventory().len(), 2);
    }

    #[test]
    fn test_sync_clears_inventory_even_when_server_is_down() {
        let store = SharedStore::default();
        let mut game = new_game(&store);
        fill_inventory(&mut game, 2);

        let client = SyncClient::new("http://127.0.0.1:1", std::time::Duration::from_secs(2));
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = game
            .sync_inventory(&client, "p1", move |result| {
                tx.send(result.is_ok()).unwrap();
            })
            .unwrap()
            .expect("non-empty inventory is sent");

        assert!(game.inventory().is_empty());
        handle.join().unwrap();
        assert!(!rx.recv().unwrap());
        assert!(saved_state(&store).inventory.is_empty());
    }
}
