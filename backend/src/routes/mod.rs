//! Route definitions for the Carestock API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - patients and their inventory and activities
        .nest("/patients", patient_routes(state.clone()))
        // Protected routes - scheduled jobs
        .nest("/jobs", job_routes(state))
}

/// Patient-scoped routes (protected)
fn patient_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        // Inventory
        .route(
            "/:patient_id/inventory",
            get(handlers::list_items).post(handlers::create_item),
        )
        .route(
            "/:patient_id/inventory/:item_id",
            get(handlers::get_item).put(handlers::update_item),
        )
        .route(
            "/:patient_id/inventory/:item_id/movements",
            get(handlers::list_item_movements).post(handlers::record_movement),
        )
        .route(
            "/:patient_id/movements",
            get(handlers::list_patient_movements),
        )
        .route(
            "/:patient_id/inventory-alerts",
            get(handlers::list_inventory_alerts),
        )
        // Activities
        .route(
            "/:patient_id/schedules",
            get(handlers::list_schedules).post(handlers::create_schedule),
        )
        .route(
            "/:patient_id/schedules/:schedule_id/active",
            put(handlers::set_schedule_active),
        )
        .route("/:patient_id/instances", get(handlers::list_instances))
        .route(
            "/:patient_id/instances/:instance_id/status",
            put(handlers::update_instance_status),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Job routes (protected)
fn job_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/decay/run", post(handlers::run_decay))
        .route("/doses/run", post(handlers::run_doses))
        .route("/runs", get(handlers::list_job_runs))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
