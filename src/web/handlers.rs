//! HTTP request handlers.

use super::validate::validate_submission;
use super::{error_response, internal_error, AppState};
use crate::db::{
    AirTravelForm, CabBookingForm, CarRentalForm, ContactForm, ContentCategory,
    EventRegistrationForm, NewsletterForm, Submission, TourBookingForm,
};
use crate::stats::{self, RangeSelector};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

/// Maximum rows returned by a public content listing.
const CONTENT_PAGE_SIZE: usize = 50;

// ============================================================================
// Admin: dashboard statistics
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub range: Option<String>,
}

pub async fn handle_dashboard_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Response {
    let range = RangeSelector::from_param(query.range.as_deref());
    let now = Utc::now();

    match stats::aggregate_within(
        &state.store,
        range,
        now,
        state.config.recent_limit,
        state.config.stats_timeout,
    )
    .await
    {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            tracing::error!("Dashboard stats ({}) failed: {}", range.as_str(), e);
            internal_error()
        }
    }
}

// ============================================================================
// Public: form submissions
// ============================================================================

async fn submit(state: &AppState, submission: Submission) -> Response {
    if let Err(msg) = validate_submission(&submission) {
        return error_response(StatusCode::BAD_REQUEST, &msg);
    }

    let store = state.store.clone();
    let table = submission.category().table();
    let result =
        tokio::task::spawn_blocking(move || store.add_submission(&submission, Utc::now())).await;

    match result {
        Ok(Ok(id)) => {
            tracing::info!("Stored {} #{}", table, id);
            (StatusCode::CREATED, Json(json!({ "success": true, "id": id }))).into_response()
        }
        Ok(Err(e)) => {
            tracing::error!("Failed to store {}: {}", table, e);
            internal_error()
        }
        Err(e) => {
            tracing::error!("Insert task for {} failed: {}", table, e);
            internal_error()
        }
    }
}

pub async fn handle_tour_booking(
    State(state): State<AppState>,
    Json(form): Json<TourBookingForm>,
) -> Response {
    submit(&state, Submission::TourBooking(form)).await
}

pub async fn handle_car_rental(
    State(state): State<AppState>,
    Json(form): Json<CarRentalForm>,
) -> Response {
    submit(&state, Submission::CarRental(form)).await
}

pub async fn handle_cab_booking(
    State(state): State<AppState>,
    Json(form): Json<CabBookingForm>,
) -> Response {
    submit(&state, Submission::CabBooking(form)).await
}

pub async fn handle_event_registration(
    State(state): State<AppState>,
    Json(form): Json<EventRegistrationForm>,
) -> Response {
    submit(&state, Submission::EventRegistration(form)).await
}

pub async fn handle_air_travel(
    State(state): State<AppState>,
    Json(form): Json<AirTravelForm>,
) -> Response {
    submit(&state, Submission::AirTravel(form)).await
}

pub async fn handle_contact(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Response {
    submit(&state, Submission::Contact(form)).await
}

pub async fn handle_newsletter(
    State(state): State<AppState>,
    Json(form): Json<NewsletterForm>,
) -> Response {
    submit(&state, Submission::Newsletter(form)).await
}

// ============================================================================
// Public: content listings
// ============================================================================

pub async fn handle_list_content(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Response {
    let Some(category) = ContentCategory::from_slug(&slug) else {
        return error_response(StatusCode::NOT_FOUND, "Unknown content category");
    };

    let store = state.store.clone();
    let result =
        tokio::task::spawn_blocking(move || store.list_active_content(category, CONTENT_PAGE_SIZE)).await;

    match result {
        Ok(Ok(items)) => Json(json!({ "success": true, "items": items })).into_response(),
        Ok(Err(e)) => {
            tracing::error!("Failed to list {}: {}", category.table(), e);
            internal_error()
        }
        Err(e) => {
            tracing::error!("Listing task for {} failed: {}", category.table(), e);
            internal_error()
        }
    }
}

// ============================================================================
// Health
// ============================================================================

pub async fn handle_health(State(state): State<AppState>) -> Response {
    let store = state.store.clone();
    match tokio::task::spawn_blocking(move || store.ping()).await {
        Ok(Ok(())) => Json(json!({ "status": "ok" })).into_response(),
        Ok(Err(e)) => {
            tracing::warn!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable" }))).into_response()
        }
        Err(e) => {
            tracing::warn!("Health check task failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable" }))).into_response()
        }
    }
}
