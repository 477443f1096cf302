// API module for headless mode - HTTP endpoints to observe and steer the simulation

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;

use crate::config::SimulationConfig;
use crate::simulation::Simulation;
use crate::snapshot::{SimulationSnapshot, SimulationStats, TerrainSnapshot};
use rand::rngs::StdRng;

/// Upper bound on ticks a single `/step` request may run.
pub const MAX_STEPS_PER_REQUEST: usize = 100_000;

#[derive(Deserialize)]
pub struct StateQuery {
    #[serde(default)]
    pub fields: bool,
}

#[derive(Deserialize)]
pub struct StepQuery {
    pub steps: Option<usize>,
}

#[derive(Deserialize)]
pub struct FoodRequest {
    pub x: f32,
    pub y: f32,
    pub amount: Option<f32>,
}

#[derive(Deserialize)]
pub struct SpeedRequest {
    pub multiplier: f32,
}

// Shared state for the API server
#[derive(Clone)]
pub struct ApiState {
    pub simulation: Arc<Mutex<Simulation>>,
    pub rng: Arc<Mutex<StdRng>>,
}

impl ApiState {
    pub fn with_rng(sim: Simulation, rng: StdRng) -> Self {
        Self {
            simulation: Arc::new(Mutex::new(sim)),
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    fn simulation(&self) -> Result<MutexGuard<'_, Simulation>, StatusCode> {
        self.simulation
            .lock()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn rng(&self) -> Result<MutexGuard<'_, StdRng>, StatusCode> {
        self.rng.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    }
}

// GET /state?fields=true - Snapshot, optionally with the pheromone grids
async fn get_state(
    State(api_state): State<ApiState>,
    Query(params): Query<StateQuery>,
) -> Result<Json<SimulationSnapshot>, StatusCode> {
    let sim = api_state.simulation()?;
    Ok(Json(sim.snapshot(params.fields)))
}

// GET /terrain - Static terrain classification
async fn get_terrain(State(api_state): State<ApiState>) -> Result<Json<TerrainSnapshot>, StatusCode> {
    let sim = api_state.simulation()?;
    Ok(Json(sim.terrain_snapshot()))
}

// GET /stats - Population and food totals
async fn get_stats(State(api_state): State<ApiState>) -> Result<Json<SimulationStats>, StatusCode> {
    let sim = api_state.simulation()?;
    Ok(Json(sim.stats()))
}

// POST /step - Step the simulation forward
async fn step_simulation(
    State(api_state): State<ApiState>,
    Query(params): Query<StepQuery>,
) -> Result<Json<SimulationStats>, StatusCode> {
    let steps = params.steps.unwrap_or(1);
    if steps > MAX_STEPS_PER_REQUEST {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut sim = api_state.simulation()?;
    let mut rng = api_state.rng()?;
    for _ in 0..steps {
        sim.tick(&mut *rng);
    }
    Ok(Json(sim.stats()))
}

// POST /food - Drop player food at a world position
async fn drop_food(
    State(api_state): State<ApiState>,
    Json(request): Json<FoodRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut sim = api_state.simulation()?;
    let amount = request.amount.unwrap_or(sim.config.food.player_amount);
    let added = sim.spawn_food_at(request.x, request.y, amount);
    if !added {
        log::debug!("food drop at ({}, {}) ignored", request.x, request.y);
    }
    Ok(Json(serde_json::json!({ "added": added })))
}

// POST /reset - Rebuild the world from the current config
async fn reset_simulation(
    State(api_state): State<ApiState>,
) -> Result<Json<SimulationStats>, StatusCode> {
    let mut sim = api_state.simulation()?;
    let mut rng = api_state.rng()?;
    sim.reset(&mut *rng);
    log::info!("simulation reset");
    Ok(Json(sim.stats()))
}

// POST /pause - Toggle pause
async fn pause_simulation(
    State(api_state): State<ApiState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut sim = api_state.simulation()?;
    sim.toggle_pause();
    Ok(Json(serde_json::json!({ "paused": sim.paused })))
}

// POST /speed - Set the background tick rate multiplier
async fn set_speed(
    State(api_state): State<ApiState>,
    Json(request): Json<SpeedRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut sim = api_state.simulation()?;
    let multiplier = sim.set_speed(request.multiplier);
    Ok(Json(serde_json::json!({ "speed_multiplier": multiplier })))
}

// GET /config - Get simulation configuration
async fn get_config(
    State(api_state): State<ApiState>,
) -> Result<Json<SimulationConfig>, StatusCode> {
    let sim = api_state.simulation()?;
    Ok(Json(sim.config.clone()))
}

// Create the API router
pub fn create_router(api_state: ApiState) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/terrain", get(get_terrain))
        .route("/stats", get(get_stats))
        .route("/step", post(step_simulation))
        .route("/food", post(drop_food))
        .route("/reset", post(reset_simulation))
        .route("/pause", post(pause_simulation))
        .route("/speed", post(set_speed))
        .route("/config", get(get_config))
        .layer(CorsLayer::permissive())
        .with_state(api_state)
}

// Run the API server with automatic simulation stepping
pub async fn run_server(api_state: ApiState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(api_state.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    log::info!("formicarium headless API server running on http://localhost:{}", port);
    log::info!("  GET  /state?fields=BOOL - world snapshot (pheromone grids when fields=true)");
    log::info!("  GET  /terrain - terrain grid");
    log::info!("  GET  /stats - population and food totals");
    log::info!("  GET  /config - active configuration");
    log::info!("  POST /step?steps=N - advance N ticks (default: 1)");
    log::info!("  POST /food - drop food, body {{\"x\", \"y\", \"amount\"?}}");
    log::info!("  POST /pause - toggle pause");
    log::info!("  POST /speed - set speed, body {{\"multiplier\"}}");
    log::info!("  POST /reset - rebuild the world");

    // Spawn background task to continuously step the simulation
    let simulation_task = tokio::spawn(simulation_loop(api_state.clone()));

    let server_handle = tokio::spawn(async move { axum::serve(listener, app).await });

    tokio::select! {
        result = server_handle => {
            result??;
        }
        _ = simulation_task => {
            log::error!("simulation loop ended unexpectedly");
        }
    }

    Ok(())
}

// Background task that advances the world at ~60 frames per second
async fn simulation_loop(api_state: ApiState) {
    const TARGET_FPS: f32 = 60.0;
    let frame_duration = std::time::Duration::from_secs_f32(1.0 / TARGET_FPS);

    loop {
        let start = std::time::Instant::now();

        {
            let Ok(mut sim) = api_state.simulation.lock() else {
                break;
            };
            let Ok(mut rng) = api_state.rng.lock() else {
                break;
            };
            sim.run_frame(&mut *rng);
        }

        let elapsed = start.elapsed();
        if elapsed < frame_duration {
            tokio::time::sleep(frame_duration - elapsed).await;
        }
    }
}
