use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{error::AppError, models::trip::TripRecord, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", get(trips_index))
        .route("/trips/:id", get(trip_show))
}

#[derive(Debug, Serialize)]
struct TripsResponse {
    trips: Vec<TripRecord>,
}

async fn trips_index(State(state): State<AppState>) -> Result<Json<TripsResponse>, AppError> {
    let trips = state.store.load().await?;
    Ok(Json(TripsResponse { trips }))
}

async fn trip_show(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<TripRecord>, AppError> {
    let trip = state
        .store
        .find(&trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(trip))
}
