//! Snapshot, market-event and quote handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::HttpServerState;
use crate::application::services::SimulationError;
use crate::domain::instrument::{InstrumentSnapshot, ProfileKind};
use crate::domain::volatility::MarketDirection;
use crate::infrastructure::quotes::Quotes;

// =============================================================================
// Errors
// =============================================================================

/// API error with HTTP response mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Resource not found (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data (400).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Service unavailable (503).
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<SimulationError> for ApiError {
    fn from(error: SimulationError) -> Self {
        match error {
            SimulationError::InvalidIntensity(_) | SimulationError::InvalidInterval => {
                Self::BadRequest(error.to_string())
            }
            SimulationError::Destroyed
            | SimulationError::NoRuntime
            | SimulationError::InvalidSeeds(_) => Self::Unavailable(error.to_string()),
        }
    }
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Body of `POST /api/events`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRequest {
    /// Which list to shock.
    pub profile: ProfileKind,
    /// Shock direction.
    pub direction: MarketDirection,
    /// Shock scale; defaults to 1.
    #[serde(default = "default_intensity")]
    pub intensity: f64,
}

const fn default_intensity() -> f64 {
    1.0
}

/// Response of `POST /api/events`.
#[derive(Debug, Clone, Serialize)]
pub struct EventResponse {
    /// Which list was shocked.
    pub profile: ProfileKind,
    /// Shock direction.
    pub direction: MarketDirection,
    /// Applied intensity.
    pub intensity: f64,
    /// Resulting snapshot list.
    pub snapshots: Vec<InstrumentSnapshot>,
}

/// Query of `GET /api/quotes`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotesQuery {
    /// Comma-separated symbols; empty means everything.
    #[serde(default)]
    pub symbols: Option<String>,
}

impl QuotesQuery {
    fn symbols(&self) -> Vec<String> {
        self.symbols
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

// =============================================================================
// Handlers
// =============================================================================

pub(super) async fn list_securities(
    State(state): State<Arc<HttpServerState>>,
) -> Json<Vec<InstrumentSnapshot>> {
    Json(state.securities.get_current_data())
}

pub(super) async fn list_indices(
    State(state): State<Arc<HttpServerState>>,
) -> Json<Vec<InstrumentSnapshot>> {
    Json(state.indices.get_current_data())
}

pub(super) async fn get_security(
    State(state): State<Arc<HttpServerState>>,
    Path(symbol): Path<String>,
) -> Result<Json<InstrumentSnapshot>, ApiError> {
    lookup(&state, ProfileKind::Securities, &symbol)
}

pub(super) async fn get_index(
    State(state): State<Arc<HttpServerState>>,
    Path(symbol): Path<String>,
) -> Result<Json<InstrumentSnapshot>, ApiError> {
    lookup(&state, ProfileKind::Indices, &symbol)
}

pub(super) async fn post_event(
    State(state): State<Arc<HttpServerState>>,
    Json(request): Json<EventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), ApiError> {
    let snapshots = state
        .service(request.profile)
        .simulate_event(request.direction, request.intensity)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(EventResponse {
            profile: request.profile,
            direction: request.direction,
            intensity: request.intensity,
            snapshots: snapshots.to_vec(),
        }),
    ))
}

pub(super) async fn get_quotes(
    State(state): State<Arc<HttpServerState>>,
    Query(query): Query<QuotesQuery>,
) -> Json<Quotes> {
    Json(state.quotes.fetch(&query.symbols()).await)
}

fn lookup(
    state: &HttpServerState,
    profile: ProfileKind,
    symbol: &str,
) -> Result<Json<InstrumentSnapshot>, ApiError> {
    state
        .service(profile)
        .get_one(symbol)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{profile} symbol {symbol}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_query_splits_and_trims() {
        let query = QuotesQuery {
            symbols: Some(" aapl, SPX ,,msft".to_string()),
        };
        assert_eq!(query.symbols(), vec!["aapl", "SPX", "msft"]);
        assert!(QuotesQuery::default().symbols().is_empty());
    }

    #[test]
    fn simulation_errors_map_to_status() {
        let bad = ApiError::from(SimulationError::InvalidIntensity(-1.0));
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);

        let gone = ApiError::from(SimulationError::Destroyed);
        assert_eq!(gone.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn event_request_defaults_intensity() {
        let request: EventRequest =
            serde_json::from_str(r#"{"profile":"indices","direction":"bearish"}"#).unwrap();
        assert_eq!(request.profile, ProfileKind::Indices);
        assert_eq!(request.direction, MarketDirection::Bearish);
        assert!((request.intensity - 1.0).abs() < f64::EPSILON);
    }
}
