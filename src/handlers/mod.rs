pub mod admin;
pub mod auth;
pub mod bookings;
pub mod chat;
pub mod health;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRequest};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::services::assistant::MAX_IMAGE_BYTES;
use crate::state::AppState;

/// Multipart framing and the text field ride on top of the image itself.
const CHAT_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 1024 * 1024;

/// `Json` whose rejections (bad syntax, wrong types, missing content type)
/// come back as `validation` errors in the usual error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/mine", get(bookings::my_bookings))
        .route("/bookings/mine/report", get(bookings::my_report))
        .route("/bookings/:id", delete(bookings::delete_booking))
        .route("/admin/bookings", get(admin::list_bookings))
        .route(
            "/admin/bookings/:id",
            patch(admin::update_booking).put(admin::update_booking),
        )
        .route(
            "/api/chat",
            post(chat::chat).layer(DefaultBodyLimit::max(CHAT_BODY_LIMIT)),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
