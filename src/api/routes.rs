use super::{ApiError, AppState};
use crate::{
    models::{
        CalculateResponse, Circle, CircleRequest, MessageResponse, NewCircle, NewPlayer,
        NewSpace, PayoutRecord, Player, PlayerCircleRequest, PlayerSpaceRequest, Space,
        SpaceRequest, Submission, SubmissionRequest,
    },
    payouts::compute_payouts,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

type JsonBody<T> = Result<Json<T>, JsonRejection>;

// ===== Route Handlers =====

pub async fn greeting() -> &'static str {
    "Welcome!"
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Database reachability
pub async fn status(State(state): State<AppState>) -> &'static str {
    match state.store.status() {
        Ok(()) => "online",
        Err(e) => {
            warn!("store status check failed: {:#}", e);
            "offline"
        }
    }
}

pub async fn create_player(
    State(state): State<AppState>,
    payload: JsonBody<NewPlayer>,
) -> Result<(StatusCode, Json<Player>), ApiError> {
    let Json(req) = payload?;
    req.validate().map_err(ApiError::BadRequest)?;

    let player = state.store.create_player(&req.name, req.money, req.risk)?;
    Ok((StatusCode::CREATED, Json(player)))
}

pub async fn get_player(
    State(state): State<AppState>,
    Path(puuid): Path<Uuid>,
) -> Result<Json<Player>, ApiError> {
    state
        .store
        .get_player(&puuid)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("player {} not found", puuid)))
}

pub async fn create_circle(
    State(state): State<AppState>,
    payload: JsonBody<NewCircle>,
) -> Result<(StatusCode, Json<Circle>), ApiError> {
    let Json(req) = payload?;
    req.validate().map_err(ApiError::BadRequest)?;

    let circle = state.store.create_circle(&req.name)?;
    Ok((StatusCode::CREATED, Json(circle)))
}

pub async fn create_space(
    State(state): State<AppState>,
    payload: JsonBody<NewSpace>,
) -> Result<(StatusCode, Json<Space>), ApiError> {
    let Json(req) = payload?;
    let (cuuid, fields) = req.validate().map_err(ApiError::BadRequest)?;

    let space = state.store.create_space(
        &cuuid,
        &req.name,
        &req.description,
        &req.pattern,
        &fields,
        req.stake,
    )?;
    Ok((StatusCode::CREATED, Json(space)))
}

pub async fn get_space(
    State(state): State<AppState>,
    Path(suuid): Path<Uuid>,
) -> Result<Json<Space>, ApiError> {
    state
        .store
        .get_space(&suuid)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("space {} not found", suuid)))
}

pub async fn list_joined(
    State(state): State<AppState>,
    Path(cuuid): Path<Uuid>,
) -> Result<Json<Vec<Player>>, ApiError> {
    Ok(Json(state.store.list_joined(&cuuid)?))
}

pub async fn list_models(
    State(state): State<AppState>,
    Path(suuid): Path<Uuid>,
) -> Result<Json<Vec<Submission>>, ApiError> {
    Ok(Json(state.store.list_models(&suuid)?))
}

pub async fn list_payouts(
    State(state): State<AppState>,
    Path(suuid): Path<Uuid>,
) -> Result<Json<Vec<PayoutRecord>>, ApiError> {
    Ok(Json(state.store.list_payouts(&suuid)?))
}

/// Load every model for the space, run the payout engine, store the result
pub async fn calculate_payouts(
    State(state): State<AppState>,
    payload: JsonBody<SpaceRequest>,
) -> Result<Json<CalculateResponse>, ApiError> {
    let Json(req) = payload?;
    let suuid = req.validate().map_err(ApiError::BadRequest)?;

    info!(space = %suuid, pattern = %req.pattern, "calculating payouts");

    let certainties = state.store.map_models(&suuid)?;
    let payouts = compute_payouts(&certainties, &req.fields, req.stake)?;
    let stored = state.store.post_payouts(&suuid, &payouts)?;

    Ok(Json(CalculateResponse {
        suuid,
        pattern: req.pattern,
        payouts,
        stored,
    }))
}

pub async fn submit_model(
    State(state): State<AppState>,
    payload: JsonBody<SubmissionRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = payload?;
    let (puuid, suuid) = req.validate().map_err(ApiError::BadRequest)?;

    state.store.submit_model(&puuid, &suuid, &req.model)?;
    Ok(Json(MessageResponse::new("model submitted")))
}

pub async fn join(
    State(state): State<AppState>,
    payload: JsonBody<PlayerCircleRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = payload?;
    let (puuid, cuuid) = req.validate().map_err(ApiError::BadRequest)?;

    state.store.join(&puuid, &cuuid)?;
    Ok(Json(MessageResponse::new("joined")))
}

pub async fn leave(
    State(state): State<AppState>,
    payload: JsonBody<PlayerCircleRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = payload?;
    let (puuid, cuuid) = req.validate().map_err(ApiError::BadRequest)?;

    if !state.store.leave(&puuid, &cuuid)? {
        return Err(ApiError::NotFound(format!(
            "player {} is not in circle {}",
            puuid, cuuid
        )));
    }
    Ok(Json(MessageResponse::new("left")))
}

pub async fn add_random(
    State(state): State<AppState>,
    payload: JsonBody<CircleRequest>,
) -> Result<Json<Player>, ApiError> {
    let Json(req) = payload?;
    let cuuid = req.validate().map_err(ApiError::BadRequest)?;

    state
        .store
        .add_random(&cuuid)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no player left to add".to_string()))
}

pub async fn delete_model(
    State(state): State<AppState>,
    payload: JsonBody<PlayerSpaceRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = payload?;
    let (puuid, suuid) = req.validate().map_err(ApiError::BadRequest)?;

    if !state.store.delete_model(&puuid, &suuid)? {
        return Err(ApiError::NotFound(format!(
            "no model from {} for space {}",
            puuid, suuid
        )));
    }
    Ok(Json(MessageResponse::new("model deleted")))
}

// ===== Response Types =====

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}
