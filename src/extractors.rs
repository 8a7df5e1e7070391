use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::db::Role;
use crate::error::AppError;
use crate::policy::Actor;
use crate::state::AppState;

/// The caller behind the session token in the `Authorization` header.
/// Accepts the bare token or `Bearer <token>`. Rejects with 401 when the
/// header is missing or the token does not verify.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Actor);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        state.identity.authorize(token).await.map(CurrentUser)
    }
}

/// Like `CurrentUser`, but the caller must also hold the Admin role (403).
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub Actor);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(actor) = CurrentUser::from_request_parts(parts, state).await?;
        state.identity.require_role(actor.id, Role::Admin).await?;
        Ok(AdminUser(actor))
    }
}

/// JSON body whose syntax and shape errors come back as 400 validation
/// failures instead of axum's default rejection.
pub struct Body<T>(pub T);

impl<T, S> FromRequest<S> for Body<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Body(value)),
            Err(rejection) => Err(body_error(rejection)),
        }
    }
}

fn body_error(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(e) => AppError::invalid(e.body_text()),
        JsonRejection::JsonSyntaxError(_) => AppError::invalid("request body is not valid JSON"),
        JsonRejection::MissingJsonContentType(_) => {
            AppError::invalid("expected a JSON request body")
        }
        other => AppError::invalid(other.body_text()),
    }
}
