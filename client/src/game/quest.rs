//! Quest Catalog and Selection
//!
//! The catalog is a static pool of quest templates loaded from TOML. Offers
//! are drawn from it with a rarity-weighted inverse-CDF sampler; the random
//! source is always passed in so a seeded generator gives repeatable draws.

use std::collections::HashMap;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::item::{ItemRecord, Rarity};

/// Number of quests offered at a time.
pub const OFFER_COUNT: usize = 3;

const BUILTIN_CATALOG: &str = include_str!("../../data/quests.toml");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("catalog has no quests")]
    Empty,
    #[error("quest '{0}' has a zero step target")]
    ZeroTarget(String),
    #[error("reward '{name}' is mapped to item ids {first} and {second}")]
    ConflictingItemId { name: String, first: u32, second: u32 },
    #[error("item id {id} is used for rewards '{first}' and '{second}'")]
    ConflictingItemName { id: u32, first: String, second: String },
}

// ============================================================================
// Templates
// ============================================================================

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestTemplate {
    pub description: String,
    pub target_steps: u32,
    pub reward_item: String,
    /// Numeric id the sync server keys stored rows by.
    pub reward_item_id: u32,
    pub rarity: Rarity,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    quest: Vec<QuestTemplate>,
}

/// Non-empty, validated pool of quest templates.
#[derive(Debug, Clone)]
pub struct QuestCatalog {
    templates: Vec<QuestTemplate>,
}

impl QuestCatalog {
    pub fn new(templates: Vec<QuestTemplate>) -> Result<Self, CatalogError> {
        if templates.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut ids_by_name: HashMap<&str, u32> = HashMap::new();
        let mut names_by_id: HashMap<u32, &str> = HashMap::new();

        for template in &templates {
            if template.target_steps == 0 {
                return Err(CatalogError::ZeroTarget(template.description.clone()));
            }

            let name = template.reward_item.as_str();
            let id = template.reward_item_id;

            if let Some(&first) = ids_by_name.get(name) {
                if first != id {
                    return Err(CatalogError::ConflictingItemId {
                        name: name.to_string(),
                        first,
                        second: id,
                    });
                }
            }
            if let Some(&first) = names_by_id.get(&id) {
                if first != name {
                    return Err(CatalogError::ConflictingItemName {
                        id,
                        first: first.to_string(),
                        second: name.to_string(),
                    });
                }
            }

            ids_by_name.insert(name, id);
            names_by_id.insert(id, name);
        }

        Ok(Self { templates })
    }

    /// The quest pool shipped with the game.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(contents)?;
        Self::new(file.quest)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_toml_str(&contents)?;
        log::info!("Loaded {} quest templates from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    pub fn templates(&self) -> &[QuestTemplate] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.templates.iter().map(|t| t.rarity.weight()).sum()
    }

    /// Weighted draw: roll in `[0, total)` and walk the cumulative weights in
    /// catalog order, returning the first entry whose running sum reaches
    /// the roll.
    pub fn pick_template<R: Rng>(&self, rng: &mut R) -> &QuestTemplate {
        let roll = rng.gen_range(0.0..self.total_weight());

        let mut cumulative = 0.0;
        for template in &self.templates {
            cumulative += template.rarity.weight();
            if cumulative >= roll {
                return template;
            }
        }

        // Float accumulation fell short of the roll
        &self.templates[0]
    }

    /// Draw [`OFFER_COUNT`] independent offers (with replacement).
    pub fn generate_offers<R: Rng>(&self, rng: &mut R) -> Vec<QuestInstance> {
        (0..OFFER_COUNT)
            .map(|_| {
                let template = self.pick_template(rng);
                QuestInstance::from_template(template, rng)
            })
            .collect()
    }
}

// ============================================================================
// Quest Instances
// ============================================================================

/// A quest that has been offered to (or accepted by) the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestInstance {
    pub id: String,
    pub description: String,
    pub target_steps: u32,
    #[serde(with = "reward_item")]
    pub reward_item: ItemRecord,
    pub rarity: Rarity,
    pub is_completed: bool,
}

impl QuestInstance {
    pub fn from_template<R: Rng>(template: &QuestTemplate, rng: &mut R) -> Self {
        let id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();

        Self {
            id: id.to_string(),
            description: template.description.clone(),
            target_steps: template.target_steps,
            reward_item: ItemRecord::reward(
                template.reward_item_id,
                &template.reward_item,
                template.rarity,
            ),
            rarity: template.rarity,
            is_completed: false,
        }
    }
}

/// Reward items are stored without a quantity; they are always worth one.
mod reward_item {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::game::item::{ItemRecord, Rarity};

    #[derive(Serialize)]
    struct RewardRef<'a> {
        id: u32,
        name: &'a str,
        rarity: Rarity,
    }

    #[derive(Deserialize)]
    struct RewardOwned {
        id: u32,
        name: String,
        rarity: Rarity,
    }

    pub fn serialize<S: Serializer>(item: &ItemRecord, serializer: S) -> Result<S::Ok, S::Error> {
        RewardRef {
            id: item.id,
            name: &item.name,
            rarity: item.rarity,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ItemRecord, D::Error> {
        let raw = RewardOwned::deserialize(deserializer)?;
        Ok(ItemRecord::reward(raw.id, &raw.name, raw.rarity))
    }
}
