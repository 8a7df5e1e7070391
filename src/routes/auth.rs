use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::error::AppResult;
use crate::extractors::{AdminUser, Body, CurrentUser};
use crate::state::AppState;
use crate::validation::{
    path_id, ForgotPasswordRequest, LoginRequest, ProfileRequest, ResetPasswordRequest,
    SignupRequest,
};
use crate::views::{ProfileView, UserView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/verify_email/{token}", get(verify_email))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/{token}", post(reset_password))
        .route("/login", post(login))
        .route("/login/admin", post(admin_login))
        .route("/profile", get(profile).put(update_profile))
        .route("/add-admin", post(add_admin))
        .route("/users", get(list_users))
        .route("/users/{id}", delete(delete_user))
}

// -- Registration and verification --

/// POST /signup
async fn signup(
    State(state): State<AppState>,
    Body(req): Body<SignupRequest>,
) -> AppResult<&'static str> {
    state.identity.register(req.validate()?).await?;
    Ok("user created, please check your email for verification link")
}

/// GET /verify_email/{token}
async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<&'static str> {
    state.identity.verify_email(&token).await?;
    Ok("user verified")
}

// -- Password reset --

/// POST /forgot-password
async fn forgot_password(
    State(state): State<AppState>,
    Body(req): Body<ForgotPasswordRequest>,
) -> AppResult<&'static str> {
    let email = req.validate()?;
    state.identity.request_password_reset(&email).await?;
    Ok("reset password link sent")
}

/// POST /reset-password/{token}
async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Body(req): Body<ResetPasswordRequest>,
) -> AppResult<&'static str> {
    let password = req.validate()?;
    state.identity.reset_password(&token, &password).await?;
    Ok("password reset")
}

// -- Sessions --

/// POST /login — responds with the bare session token
async fn login(
    State(state): State<AppState>,
    Body(req): Body<LoginRequest>,
) -> AppResult<String> {
    state.identity.login(req.validate()?).await
}

/// POST /login/admin
async fn admin_login(
    State(state): State<AppState>,
    Body(req): Body<LoginRequest>,
) -> AppResult<String> {
    state.identity.admin_login(req.validate()?).await
}

// -- Own account --

async fn profile(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> AppResult<Json<ProfileView>> {
    Ok(Json(state.identity.profile(actor.id).await?))
}

async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Body(req): Body<ProfileRequest>,
) -> AppResult<Json<UserView>> {
    let patch = req.validate()?;
    Ok(Json(state.identity.update_profile(actor.id, patch).await?))
}

// -- Administration --

async fn add_admin(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Body(req): Body<SignupRequest>,
) -> AppResult<Json<UserView>> {
    let input = req.validate()?;
    Ok(Json(state.identity.add_admin(&actor, input).await?))
}

async fn list_users(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
) -> AppResult<Json<Vec<UserView>>> {
    Ok(Json(state.identity.list_users(&actor).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Path(id): Path<String>,
) -> AppResult<&'static str> {
    let id = path_id("id", &id)?;
    state.identity.delete_user(&actor, id).await?;
    Ok("user is deleted")
}
