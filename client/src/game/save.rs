//! Game save codec.
//!
//! The whole [`GameState`] is written as one JSON blob under [`SAVE_KEY`]
//! after every change. Loading never fails the caller: a missing blob is a
//! new game and a corrupt one is logged and replaced by the default state.

use std::collections::HashSet;

use super::item::INVENTORY_CAPACITY;
use super::state::GameState;
use crate::storage::{SaveStore, StorageError};

/// Storage key for the current save format; older keys are ignored.
pub const SAVE_KEY: &str = "GAME_STATE_V2";

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("save json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid save data: {0}")]
    Invalid(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub fn encode(state: &GameState) -> Result<String, SaveError> {
    Ok(serde_json::to_string(state)?)
}

pub fn decode(blob: &str) -> Result<GameState, SaveError> {
    let state: GameState = serde_json::from_str(blob)?;
    validate(&state)?;
    Ok(state)
}

fn validate(state: &GameState) -> Result<(), SaveError> {
    let items = state.inventory.items();
    if items.len() > INVENTORY_CAPACITY {
        return Err(SaveError::Invalid(format!(
            "inventory holds {} items (capacity {})",
            items.len(),
            INVENTORY_CAPACITY
        )));
    }

    let mut names = HashSet::new();
    for item in items {
        if item.quantity == 0 {
            return Err(SaveError::Invalid(format!("'{}' has zero quantity", item.name)));
        }
        if !names.insert(item.name.as_str()) {
            return Err(SaveError::Invalid(format!("duplicate inventory entry '{}'", item.name)));
        }
    }

    if !state.steps_at_quest_start.is_finite() {
        return Err(SaveError::Invalid("stepsAtQuestStart is not finite".to_string()));
    }

    Ok(())
}

/// Load the saved game, falling back to a fresh state.
pub fn load_state(store: &dyn SaveStore) -> GameState {
    let blob = match store.get(SAVE_KEY) {
        Ok(Some(blob)) => blob,
        Ok(None) => return GameState::default(),
        Err(e) => {
            log::error!("Failed to read save data: {}", e);
            return GameState::default();
        }
    };

    match decode(&blob) {
        Ok(state) => {
            log::debug!(
                "Loaded save: {} items, active quest: {}, {} offers",
                state.inventory.len(),
                state.active_quest.is_some(),
                state.available_quests.len()
            );
            state
        }
        Err(e) => {
            log::error!("Save data is corrupt, starting fresh: {}", e);
            GameState::default()
        }
    }
}

pub fn save_state(store: &mut dyn SaveStore, state: &GameState) -> Result<(), SaveError> {
    let blob = encode(state)?;
    store.set(SAVE_KEY, &blob)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::item::{Inventory, ItemRecord, Rarity};
    use crate::game::quest::QuestCatalog;
    use crate::storage::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_state() -> GameState {
        let catalog = QuestCatalog::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        let mut rose = ItemRecord::reward(13, "Rose", Rarity::Rare);
        rose.quantity = 2;
        let inventory: Inventory = vec![rose, ItemRecord::reward(8, "Dandelion", Rarity::Common)]
            .into_iter()
            .collect();

        let mut active = catalog.generate_offers(&mut rng).remove(0);
        active.is_completed = true;

        GameState {
            steps_at_quest_start: 1234.5,
            inventory,
            active_quest: Some(active),
            available_quests: catalog.generate_offers(&mut rng),
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let state = sample_state();
        let decoded = decode(&encode(&state).unwrap()).unwrap();
        assert_eq!(decoded, state);

        let empty = GameState::default();
        assert_eq!(decode(&encode(&empty).unwrap()).unwrap(), empty);
    }

    #[test]
    fn test_blob_layout() {
        let state = sample_state();
        let value: serde_json::Value = serde_json::from_str(&encode(&state).unwrap()).unwrap();

        assert_eq!(value["stepsAtQuestStart"], 1234.5);
        assert_eq!(value["inventory"][0]["name"], "Rose");
        assert_eq!(value["inventory"][0]["quantity"], 2);
        assert_eq!(value["inventory"][0]["rarity"], "RARE");
        assert_eq!(value["activeQuest"]["isCompleted"], true);
        assert_eq!(value["availableQuests"].as_array().unwrap().len(), 3);

        let no_quest = encode(&GameState::default()).unwrap();
        assert!(!no_quest.contains("activeQuest"));
    }

    #[test]
    fn test_decode_defaults_missing_fields() {
        let state = decode(r#"{"inventory":[{"id":8,"name":"Dandelion","rarity":"COMMON"}]}"#).unwrap();
        assert_eq!(state.steps_at_quest_start, 0.0);
        assert_eq!(state.inventory.items()[0].quantity, 1);
        assert!(state.active_quest.is_none());
        assert!(state.available_quests.is_empty());
    }

    #[test]
    fn test_decode_rejects_invalid_inventory() {
        let duplicate = r#"{"inventory":[
            {"id":8,"name":"Dandelion","rarity":"COMMON","quantity":1},
            {"id":8,"name":"Dandelion","rarity":"COMMON","quantity":2}
        ]}"#;
        assert!(matches!(decode(duplicate), Err(SaveError::Invalid(_))));

        let unknown_rarity = r#"{"inventory":[{"id":1,"name":"X","rarity":"MYTHIC"}]}"#;
        assert!(matches!(decode(unknown_rarity), Err(SaveError::Json(_))));
    }

    #[test]
    fn test_load_state_tolerates_missing_and_corrupt() {
        let mut store = MemoryStore::new();
        assert_eq!(load_state(&store), GameState::default());

        store.set(SAVE_KEY, "{not json").unwrap();
        assert_eq!(load_state(&store), GameState::default());

        let state = sample_state();
        save_state(&mut store, &state).unwrap();
        assert_eq!(load_state(&store), state);
    }
}
