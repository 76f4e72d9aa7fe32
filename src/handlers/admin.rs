use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use super::auth::authenticate;
use super::JsonBody;
use crate::errors::AppError;
use crate::models::Booking;
use crate::services::bookings;
use crate::state::AppState;

// GET /admin/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Booking>>, AppError> {
    let requester = authenticate(&headers, &state)?;

    let listed = {
        let conn = state.conn()?;
        bookings::list_all(&conn, &requester)?
    };

    Ok(Json(listed))
}

// PATCH /admin/bookings/:id
//
// Clients should re-fetch the listing after a successful update instead of
// merging the response into local state.
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<serde_json::Value>,
) -> Result<Json<Booking>, AppError> {
    let requester = authenticate(&headers, &state)?;

    let updated = {
        let conn = state.conn()?;
        bookings::update_fields(&conn, &requester, &id, &body)?
    };

    Ok(Json(updated))
}
