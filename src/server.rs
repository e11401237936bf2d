use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use http::{
    header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, CONTENT_TYPE},
    Method, StatusCode,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::core::{display, leaderboard::Leaderboard, mutations::Scorekeeper};
use crate::error::{BoardError, BoardResult};

#[derive(Clone)]
pub struct AppState {
    pub leaderboard: Leaderboard,
    pub scorekeeper: Scorekeeper,
}

#[derive(Debug, Deserialize)]
struct StartGameRequest {
    username: String,
}

impl IntoResponse for BoardError {
    fn into_response(self) -> Response {
        match self {
            BoardError::MalformedInput(_) => {
                debug!("Rejected request. {self}");
                (StatusCode::BAD_REQUEST, "Bad request").into_response()
            }
            _ => {
                error!("{self}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

// Same fixed policy on every route: any origin, the route's own method.
fn cors(method: Method) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([method])
        .allow_headers([CONTENT_TYPE])
}

// OPTIONS requests that are not CORS preflights still get the policy headers.
fn preflight(method: &'static str) -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (ACCESS_CONTROL_ALLOW_METHODS, method),
            (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
}

async fn leaderboard_handler(State(state): State<AppState>) -> Result<String, BoardError> {
    let rows = state.leaderboard.build().await?;
    debug!("Serving leaderboard of {} rows", rows.len());
    display::leaderboard(&rows)
}

async fn start_game_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, BoardError> {
    let request = serde_json::from_slice::<StartGameRequest>(&body)
        .map_err(|e| BoardError::MalformedInput(format!("invalid start request body: {e}")))?;
    state.scorekeeper.start_game(&request.username).await?;
    Ok(StatusCode::OK)
}

pub fn router(state: AppState) -> Router {
    let leaderboard = Router::new()
        .route(
            "/leaderboard",
            get(leaderboard_handler).options(|| async { preflight("GET") }),
        )
        .layer(cors(Method::GET));

    let start = Router::new()
        .route(
            "/start",
            post(start_game_handler).options(|| async { preflight("POST") }),
        )
        .layer(cors(Method::POST));

    leaderboard
        .merge(start)
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

pub async fn serve(settings: &Settings, state: AppState) -> BoardResult<()> {
    let listener = TcpListener::bind((settings.host.as_str(), settings.port)).await?;
    info!("Server started on {}:{}", settings.host, settings.port);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Could not listen for shutdown signal. {e}");
        // Never resolve, the server keeps running until killed.
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
