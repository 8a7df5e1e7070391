use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::db::{Comment, Film};
use crate::error::AppResult;
use crate::extractors::{AdminUser, Body, CurrentUser};
use crate::state::AppState;
use crate::validation::{path_id, CommentRequest, FilmRequest, RatingRequest};
use crate::views::{CommentView, FilmView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/comments", get(list_comments).post(add_comment))
        .route(
            "/{id}/comments/{comment_id}",
            put(edit_comment).delete(remove_comment),
        )
        .route("/{id}/ratings", post(rate))
        // Toggle answers GET as well as POST
        .route("/{id}/likes", get(toggle_like).post(toggle_like))
}

// -- Films --

async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<FilmView>>> {
    Ok(Json(state.films.list().await?))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<FilmView>> {
    let id = path_id("id", &id)?;
    Ok(Json(state.films.get(id).await?))
}

async fn create(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Body(req): Body<FilmRequest>,
) -> AppResult<Json<Film>> {
    let input = req.validate_new()?;
    Ok(Json(state.films.create(&actor, input).await?))
}

async fn update(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Path(id): Path<String>,
    Body(req): Body<FilmRequest>,
) -> AppResult<Json<Film>> {
    let id = path_id("id", &id)?;
    let patch = req.validate_patch()?;
    Ok(Json(state.films.update(&actor, id, patch).await?))
}

async fn remove(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Path(id): Path<String>,
) -> AppResult<&'static str> {
    let id = path_id("id", &id)?;
    state.films.delete(&actor, id).await?;
    Ok("film is removed")
}

// -- Comments --

async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<CommentView>>> {
    let film_id = path_id("filmId", &id)?;
    Ok(Json(state.comments.list(film_id).await?))
}

async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Body(req): Body<CommentRequest>,
) -> AppResult<Json<Comment>> {
    let film_id = path_id("filmId", &id)?;
    let text = req.validate()?;
    Ok(Json(state.comments.create(film_id, &actor, text).await?))
}

async fn edit_comment(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((id, comment_id)): Path<(String, String)>,
    Body(req): Body<CommentRequest>,
) -> AppResult<Json<Comment>> {
    let film_id = path_id("filmId", &id)?;
    let comment_id = path_id("commentId", &comment_id)?;
    let text = req.validate()?;
    Ok(Json(
        state
            .comments
            .update(film_id, comment_id, &actor, text)
            .await?,
    ))
}

async fn remove_comment(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((id, comment_id)): Path<(String, String)>,
) -> AppResult<&'static str> {
    let film_id = path_id("filmId", &id)?;
    let comment_id = path_id("commentId", &comment_id)?;
    state.comments.delete(film_id, comment_id, &actor).await?;
    Ok("comment is removed")
}

// -- Ratings and likes --

async fn rate(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Body(req): Body<RatingRequest>,
) -> AppResult<&'static str> {
    let film_id = path_id("filmId", &id)?;
    let value = req.validate()?;
    state.films.add_rating(film_id, actor.id, value).await?;
    Ok("rating added")
}

async fn toggle_like(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<&'static str> {
    let film_id = path_id("filmId", &id)?;
    let film = state.films.toggle_like(film_id, actor.id).await?;
    if film.liked_by(actor.id) {
        Ok("film liked")
    } else {
        Ok("removed like from film")
    }
}
