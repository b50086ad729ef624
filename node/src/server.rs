// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use lamport_ledger::{DeliveryRequest, DeliveryResponse, LogEntry};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::api::StateResponse;
use crate::dispatcher::SharedDispatcher;
use crate::errors::NodeError;
use crate::network::Transport;

/// Routes served by one replica.
///
/// `max_concurrent` bounds in-flight requests across all routes; excess
/// requests wait for a slot rather than being refused.
pub fn build_router<T: Transport>(dispatcher: SharedDispatcher<T>, max_concurrent: usize) -> Router {
    Router::new()
        .route("/v1/deliver", post(deliver::<T>))
        .route("/v1/events", get(events::<T>))
        .route("/v1/receipts", get(receipts::<T>))
        .route("/v1/state", get(state::<T>))
        // Observability
        .route("/metrics", get(metrics_handler))
        .with_state(dispatcher)
        .layer(GlobalConcurrencyLimitLayer::new(max_concurrent.max(1)))
        .layer(TraceLayer::new_for_http())
}

async fn deliver<T: Transport>(
    State(dispatcher): State<SharedDispatcher<T>>,
    Json(request): Json<DeliveryRequest>,
) -> Result<Json<DeliveryResponse>, NodeError> {
    let response = dispatcher.deliver(request).await?;
    Ok(Json(response))
}

async fn events<T: Transport>(State(dispatcher): State<SharedDispatcher<T>>) -> Json<Vec<LogEntry>> {
    Json(dispatcher.event_log().await)
}

async fn receipts<T: Transport>(
    State(dispatcher): State<SharedDispatcher<T>>,
) -> Json<Vec<DeliveryRequest>> {
    Json(dispatcher.receipts().await)
}

async fn state<T: Transport>(State(dispatcher): State<SharedDispatcher<T>>) -> Json<StateResponse> {
    Json(dispatcher.state().await)
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}
