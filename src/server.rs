use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::air::AirQualityBand;
use crate::data::Dataset;
use crate::display::DisplayState;
use crate::error::Error;
use crate::model::{AirSample, Layer, TravelMode};
use crate::overlay::{self, AirMarker, CircleMarker};
use crate::session::{MapSession, QueryOutcome, SessionSnapshot, SharedSession};

// Shared state for all handlers
pub struct AppState {
    pub session: SharedSession,
    pub wifi_layer: Vec<CircleMarker>,
    pub air_layer: Vec<AirMarker>,
}

impl AppState {
    /// Builds the static overlays once from the session's dataset.
    pub fn new(session: MapSession, wifi_radius_m: f64) -> Self {
        let dataset: &Dataset = session.dataset();
        let wifi_layer = overlay::wifi_layer(dataset, wifi_radius_m);
        let air_layer = overlay::air_layer(dataset);
        Self {
            session: SharedSession::new(session),
            wifi_layer,
            air_layer,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    // Any front end may call the API
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/state", get(current_state))
        .route("/route", post(display_route))
        .route("/place", post(show_place))
        .route("/layer", put(select_layer))
        .route("/mode", put(select_mode))
        .route("/air/select", post(select_air))
        .route("/layers/wifi", get(wifi_layer))
        .route("/layers/air", get(air_layer))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(bind: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("API server running on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

// --- API DTOs ---

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub destination: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaceRequest {
    #[serde(default)]
    pub place: String,
}

#[derive(Debug, Deserialize)]
pub struct LayerRequest {
    pub layer: Layer,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: TravelMode,
}

#[derive(Debug, Deserialize)]
pub struct AirSelectRequest {
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub outcome: QueryOutcome,
    #[serde(flatten)]
    pub state: SessionSnapshot,
}

#[derive(Debug, Serialize)]
pub struct AirSelectResponse {
    pub sample: AirSample,
    pub band: AirQualityBand,
    pub display: DisplayState,
}

#[derive(Debug, Serialize)]
pub struct WifiLayerResponse {
    pub wifi_count: usize,
    pub markers: Vec<CircleMarker>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_invalid_input() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            error!(error = %self.0, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

// --- Handlers ---

async fn current_state(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.session.lock().await.snapshot())
}

async fn display_route(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RouteRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let outcome = state
        .session
        .display_route(&payload.start, &payload.destination)
        .await?;
    Ok(Json(QueryResponse {
        outcome,
        state: state.session.lock().await.snapshot(),
    }))
}

async fn show_place(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlaceRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let outcome = state.session.show_place_pois(&payload.place).await?;
    Ok(Json(QueryResponse {
        outcome,
        state: state.session.lock().await.snapshot(),
    }))
}

async fn select_layer(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LayerRequest>,
) -> Json<SessionSnapshot> {
    let mut session = state.session.lock().await;
    session.select_layer(payload.layer);
    Json(session.snapshot())
}

async fn select_mode(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ModeRequest>,
) -> Json<SessionSnapshot> {
    let mut session = state.session.lock().await;
    session.select_travel_mode(payload.mode);
    Json(session.snapshot())
}

async fn select_air(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AirSelectRequest>,
) -> Result<Json<AirSelectResponse>, ApiError> {
    let mut session = state.session.lock().await;
    let sample = session.select_air_sample(payload.index)?.clone();
    Ok(Json(AirSelectResponse {
        band: sample.band(),
        sample,
        display: session.display_state(),
    }))
}

async fn wifi_layer(State(state): State<Arc<AppState>>) -> Json<WifiLayerResponse> {
    Json(WifiLayerResponse {
        wifi_count: state.wifi_layer.len(),
        markers: state.wifi_layer.clone(),
    })
}

async fn air_layer(State(state): State<Arc<AppState>>) -> Json<Vec<AirMarker>> {
    Json(state.air_layer.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::GeocodeError;
    use crate::model::Coordinate;
    use crate::overlay::tests::sample_dataset;
    use crate::service::{GeocodeResult, MapService, RouteResult};
    use async_trait::async_trait;

    struct NothingFound;

    #[async_trait]
    impl MapService for NothingFound {
        async fn route(&self, _: &str, _: &str, _: TravelMode) -> Result<RouteResult, GeocodeError> {
            Err(GeocodeError::Status("ZERO_RESULTS".into()))
        }

        async fn geocode(&self, _: &str) -> Result<GeocodeResult, GeocodeError> {
            Ok(GeocodeResult {
                location: Coordinate::new(48.2, 16.37),
                formatted_address: "Wien".into(),
            })
        }
    }

    fn state() -> Arc<AppState> {
        let session = MapSession::new(
            Arc::new(sample_dataset()),
            Arc::new(AppConfig::default()),
            Arc::new(NothingFound),
        );
        Arc::new(AppState::new(session, 50.0))
    }

    #[tokio::test]
    async fn test_route_failure_is_not_an_error() {
        let response = display_route(
            State(state()),
            Json(RouteRequest {
                start: "a".into(),
                destination: "b".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.outcome, QueryOutcome::Unresolved);
        assert!(!response.state.display.route_active);
    }

    #[tokio::test]
    async fn test_blank_place_is_unprocessable() {
        let err = show_place(State(state()), Json(PlaceRequest { place: " ".into() }))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_place_switches_to_poi_layer() {
        let state = state();
        select_layer(State(state.clone()), Json(LayerRequest { layer: Layer::Air })).await;

        let response = show_place(State(state), Json(PlaceRequest { place: "Karlsplatz".into() }))
            .await
            .unwrap();
        assert_eq!(response.outcome, QueryOutcome::Applied);
        assert_eq!(response.state.selected_layer, Layer::Poi);
        assert!(response.state.display.place_active);
        assert_eq!(response.state.statistics.wifi_nearby, 1);
    }

    #[tokio::test]
    async fn test_select_air_reports_band_and_flags() {
        let state = state();
        let response = select_air(State(state.clone()), Json(AirSelectRequest { index: 1 }))
            .await
            .unwrap();
        assert_eq!(response.band, AirQualityBand::Hazardous);
        assert!(response.display.pm10_active);
        assert!(!response.display.no2_active);

        let err = select_air(State(state), Json(AirSelectRequest { index: 5 }))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_static_layers() {
        let state = state();
        let wifi = wifi_layer(State(state.clone())).await;
        assert_eq!(wifi.wifi_count, 1);
        assert_eq!(air_layer(State(state)).await.len(), 2);
    }

    #[tokio::test]
    async fn test_mode_selection_is_reflected_in_state() {
        let response = select_mode(State(state()), Json(ModeRequest { mode: TravelMode::Car })).await;
        assert_eq!(response.travel_mode, TravelMode::Car);
    }
}
