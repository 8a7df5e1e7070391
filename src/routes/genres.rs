use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::db::Genre;
use crate::error::AppResult;
use crate::extractors::{AdminUser, Body};
use crate::state::AppState;
use crate::validation::{path_id, GenreRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", put(update).delete(remove))
}

async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(state.genres.list().await?))
}

async fn create(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Body(req): Body<GenreRequest>,
) -> AppResult<Json<Genre>> {
    let name = req.validate()?;
    Ok(Json(state.genres.create(&actor, name).await?))
}

async fn update(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Path(id): Path<String>,
    Body(req): Body<GenreRequest>,
) -> AppResult<Json<Genre>> {
    let id = path_id("id", &id)?;
    let name = req.validate()?;
    Ok(Json(state.genres.update(&actor, id, name).await?))
}

async fn remove(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Path(id): Path<String>,
) -> AppResult<&'static str> {
    let id = path_id("id", &id)?;
    state.genres.delete(&actor, id).await?;
    Ok("genre removed")
}
