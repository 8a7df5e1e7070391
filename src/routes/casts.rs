use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::db::{Cast, CastType};
use crate::error::AppResult;
use crate::extractors::{AdminUser, Body};
use crate::state::AppState;
use crate::validation::{path_id, CastRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/actors", get(actors))
        .route("/directors", get(directors))
        .route("/{id}", put(update).delete(remove))
}

async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Cast>>> {
    Ok(Json(state.casts.list(None).await?))
}

async fn actors(State(state): State<AppState>) -> AppResult<Json<Vec<Cast>>> {
    Ok(Json(state.casts.list(Some(CastType::Actor)).await?))
}

async fn directors(State(state): State<AppState>) -> AppResult<Json<Vec<Cast>>> {
    Ok(Json(state.casts.list(Some(CastType::Director)).await?))
}

async fn create(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Body(req): Body<CastRequest>,
) -> AppResult<Json<Cast>> {
    let input = req.validate_new()?;
    Ok(Json(state.casts.create(&actor, input).await?))
}

async fn update(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Path(id): Path<String>,
    Body(req): Body<CastRequest>,
) -> AppResult<Json<Cast>> {
    let id = path_id("id", &id)?;
    let patch = req.validate_patch()?;
    Ok(Json(state.casts.update(&actor, id, patch).await?))
}

async fn remove(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Path(id): Path<String>,
) -> AppResult<&'static str> {
    let id = path_id("id", &id)?;
    state.casts.delete(&actor, id).await?;
    Ok("cast removed")
}
