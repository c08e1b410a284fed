//! HTTP surface of the inventory sync server.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ItemPayload {
    #[serde(rename = "itemId")]
    pub item_id: i64,
    pub quantity: i64,
}

/// Both fields are optional here so a missing one is answered with a 400
/// naming the problem rather than a generic parse failure.
#[derive(Debug, Deserialize)]
pub struct AddInventoryRequest {
    #[serde(rename = "playerId")]
    pub player_id: Option<String>,
    pub items: Option<Vec<ItemPayload>>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /inventory/add - merge a batch of item stacks into a player's
/// stored inventory.
///
/// Items are upserted one at a time without a spanning transaction: if one
/// fails, the ones before it stay merged.
async fn add_inventory(
    State(state): State<AppState>,
    payload: Result<Json<AddInventoryRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!("Rejected inventory upload: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let (player_id, items) = match (req.player_id, req.items) {
        (Some(player_id), Some(items)) if !player_id.is_empty() => (player_id, items),
        _ => return error_response(StatusCode::BAD_REQUEST, "Missing playerId or items"),
    };

    // Validate the whole batch before any write
    if let Some(bad) = items.iter().find(|i| i.item_id < 0 || i.quantity < 1) {
        warn!(
            "Rejected inventory upload for {}: item {} x{}",
            player_id, bad.item_id, bad.quantity
        );
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "Invalid item {}: quantity must be at least 1 and itemId not negative",
                bad.item_id
            ),
        );
    }

    for item in &items {
        if let Err(e) = state
            .db
            .upsert_item(&player_id, item.item_id, item.quantity)
            .await
        {
            error!(
                "Failed to store item {} x{} for {}: {}",
                item.item_id, item.quantity, player_id, e
            );
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    }

    info!("Stored {} item stacks for {}", items.len(), player_id);
    Json(serde_json::json!({ "success": true })).into_response()
}

/// GET /inventory/:player_id - everything stored for a player.
async fn get_inventory(State(state): State<AppState>, Path(player_id): Path<String>) -> Response {
    match state.db.get_inventory(&player_id).await {
        Ok(rows) => {
            info!("GET /inventory for {}: {} rows", player_id, rows.len());
            Json(rows).into_response()
        }
        Err(e) => {
            error!("Failed to load inventory for {}: {}", player_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Inventory sync
        .route("/inventory/add", post(add_inventory))
        // Path used by earlier app builds
        .route("/addToInventory/add", post(add_inventory))
        .route("/inventory/:player_id", get(get_inventory))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([axum::http::header::CONTENT_TYPE]),
        )
        .with_state(state)
}
