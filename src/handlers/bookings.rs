use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use super::auth::authenticate;
use super::JsonBody;
use crate::errors::AppError;
use crate::models::{Booking, NewBooking};
use crate::services::bookings;
use crate::services::report::{self, Report};
use crate::state::AppState;

// POST /bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<NewBooking>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let requester = authenticate(&headers, &state)?;

    let booking = {
        let conn = state.conn()?;
        bookings::create_booking(&conn, &requester, body)?
    };

    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /bookings/mine
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Booking>>, AppError> {
    let requester = authenticate(&headers, &state)?;

    let conn = state.conn()?;
    let listed = bookings::list_for_owner(&conn, &requester, &requester.email)?;
    Ok(Json(listed))
}

// DELETE /bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let requester = authenticate(&headers, &state)?;

    {
        let conn = state.conn()?;
        bookings::delete_booking(&conn, &requester, &id)?;
    }

    Ok(Json(serde_json::json!({"ok": true})))
}

// GET /bookings/mine/report
pub async fn my_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let requester = authenticate(&headers, &state)?;
    let today = Utc::now().date_naive();

    let report = {
        let conn = state.conn()?;
        report::generate_report(&conn, &requester, &requester.email, today)?
    };

    let filename = Report::file_name(&requester.email, today);
    Ok((
        [
            (header::CONTENT_TYPE, report.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        report.bytes,
    )
        .into_response())
}
