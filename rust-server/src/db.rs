use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

/// One stored stack for a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryRow {
    #[serde(rename = "itemId")]
    pub item_id: i64,
    pub quantity: i64,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        // Run migrations
        Self::migrate(&pool).await?;

        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        // One row per (player, item); the key makes quantity merges an upsert
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS inventory (
                player_id TEXT NOT NULL,
                item_id INTEGER NOT NULL,
                quantity INTEGER NOT NULL CHECK(typeof(quantity) = 'integer' AND quantity > 0),
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY(player_id, item_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    /// Add `quantity` to the player's stack of `item_id`, creating it if needed.
    /// A sum past `i64::MAX` would be stored as REAL by SQLite; the table's
    /// CHECK turns that into a constraint error and the row keeps its value.
    pub async fn upsert_item(
        &self,
        player_id: &str,
        item_id: i64,
        quantity: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO inventory (player_id, item_id, quantity) VALUES (?, ?, ?)
            ON CONFLICT(player_id, item_id) DO UPDATE SET
                quantity = quantity + excluded.quantity,
                updated_at = CURRENT_TIMESTAMP"#,
        )
        .bind(player_id)
        .bind(item_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_inventory(&self, player_id: &str) -> Result<Vec<InventoryRow>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT item_id, quantity FROM inventory WHERE player_id = ? ORDER BY item_id",
        )
        .bind(player_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| -> Result<InventoryRow, sqlx::Error> {
                Ok(InventoryRow {
                    item_id: r.try_get("item_id")?,
                    quantity: r.try_get("quantity")?,
                })
            })
            .collect()
    }
}
