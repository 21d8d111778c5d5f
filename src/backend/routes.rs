use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::backend::{handlers, AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/properties",
            get(handlers::get_all_properties).post(handlers::create_property),
        )
        .route(
            "/api/properties/{id}",
            get(handlers::get_property)
                .put(handlers::update_property)
                .delete(handlers::delete_property),
        )
        .route(
            "/api/expenses",
            get(handlers::get_all_expenses).post(handlers::create_expense),
        )
        .route(
            "/api/expenses/property/{property_id}",
            get(handlers::get_expenses_by_property),
        )
        .route("/api/expenses/range", get(handlers::get_expenses_in_range))
        .route("/api/expenses/{id}", delete(handlers::delete_expense))
        .route("/api/expenses/{id}/upload", post(handlers::upload_receipt))
        .route(
            "/api/expenses/{id}/receipt",
            get(handlers::get_receipt).delete(handlers::delete_receipt),
        )
}
