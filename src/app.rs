use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Meal photos routinely exceed axum's default 2 MiB body limit.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/progress", get(handlers::progress))
        .route("/profile", post(handlers::create_profile_form))
        .route("/meals/upload", post(handlers::upload_meal_form))
        .route("/meals/items/:index/remove", post(handlers::remove_item_form))
        .route("/meals/confirm", post(handlers::confirm_meal_form))
        .route("/meals/cancel", post(handlers::cancel_meal_form))
        .route("/meals/retry", post(handlers::retry_meal_form))
        .route("/weight", post(handlers::log_weight_form))
        .route("/api/profile", post(handlers::create_profile))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/capture", get(handlers::get_capture))
        .route("/api/meals/analyze", post(handlers::analyze_meal))
        .route("/api/meals/items/:index/remove", post(handlers::remove_item))
        .route("/api/meals/rename", post(handlers::rename_meal))
        .route("/api/meals/confirm", post(handlers::confirm_meal))
        .route("/api/meals/cancel", post(handlers::cancel_meal))
        .route("/api/meals/retry", post(handlers::retry_meal))
        .route("/api/weight", post(handlers::log_weight))
        .route("/api/weight-history", get(handlers::get_weight_history))
        .route("/api/chart", get(handlers::get_chart))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
