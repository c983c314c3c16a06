//! HTTP Surface
//!
//! Endpoints:
//! - GET /start  streams the events of a fresh run as server-sent events
//! - GET /health

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Router,
};
use futures::stream::{self, Stream};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use negotiation_core::{join_stream, spawn_stream, RunOutcome, SimulationConfig};
use negotiation_events::SimEvent;

use crate::runtime::build_simulation;

/// Events buffered between the run and a slow client.
const STREAM_BUFFER: usize = 16;

/// Shared application state
type AppState = Arc<SimulationConfig>;

/// Builds the router for `config`.
pub fn router(config: SimulationConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/start", get(start))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(config))
}

/// Start the API server
pub async fn serve(config: SimulationConfig) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let (listener, local) = bind(&addr).await?;
    info!(addr = %local, "listening");
    serve_on(listener, config).await
}

/// Serves on an already bound listener.
pub async fn serve_on(listener: TcpListener, config: SimulationConfig) -> Result<()> {
    axum::serve(listener, router(config)).await?;
    Ok(())
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    "OK"
}

/// Starts a fresh run and streams its events.
///
/// Closing the connection drops the receiver; the run finishes the round
/// in flight and schedules no more.
async fn start(State(config): State<AppState>) -> Response {
    let simulation = match build_simulation(&config) {
        Ok(simulation) => simulation,
        Err(e) => {
            error!(error = %e, "failed to build simulation");
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response();
        }
    };

    let (rx, handle) = spawn_stream(simulation, STREAM_BUFFER);
    tokio::spawn(async move {
        match join_stream(handle).await {
            Ok(summary) => match summary.outcome {
                RunOutcome::Completed(reason) => info!(
                    run_id = %summary.run_id,
                    total_iterations = summary.total_iterations,
                    %reason,
                    "streamed run finished"
                ),
                RunOutcome::Disconnected => warn!(
                    run_id = %summary.run_id,
                    total_iterations = summary.total_iterations,
                    "client disconnected"
                ),
            },
            Err(e) => error!(error = %e, "streamed run failed"),
        }
    });

    Sse::new(event_stream(rx))
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Turns the run's channel into SSE frames of `data: {json}`.
fn event_stream(rx: mpsc::Receiver<SimEvent>) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(rx, |mut rx| async move {
        loop {
            let event = rx.recv().await?;
            match event.to_jsonl() {
                Ok(json) => return Some((Ok(Event::default().data(json)), rx)),
                Err(e) => warn!(error = %e, "skipping event that failed to serialize"),
            }
        }
    })
}

/// Binds `addr` and returns the listener with its resolved address.
pub async fn bind(addr: &str) -> Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    Ok((listener, local))
}
