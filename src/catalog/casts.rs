use std::collections::HashSet;
use std::sync::Arc;

use crate::db::{Cast, CastType, DocId, DocumentStore, Filter, Repo, UpdateOp};
use crate::error::{AppError, AppResult};
use crate::policy::{self, Actor};
use crate::validation::{CastPatch, NewCast};

/// Cast members, and the existence/type checks films rely on.
#[derive(Clone)]
pub struct CastDirectory {
    casts: Repo<Cast>,
}

impl CastDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            casts: Repo::new(store),
        }
    }

    /// All cast members, or only those of `kind`.
    pub async fn list(&self, kind: Option<CastType>) -> AppResult<Vec<Cast>> {
        let filter = match kind {
            Some(kind) => Filter::eq("type", kind.as_str()),
            None => Filter::All,
        };
        Ok(self.casts.find(filter).await?)
    }

    pub async fn create(&self, actor: &Actor, input: NewCast) -> AppResult<Cast> {
        policy::manage_catalog(actor).enforce("unauthorized action")?;

        let cast = Cast {
            id: DocId::new(),
            first_name: input.first_name,
            last_name: input.last_name,
            photo: input.photo,
            cast_type: input.cast_type,
            films: input.films,
        };
        self.casts.insert(&cast).await?;

        tracing::info!(cast_id = %cast.id, kind = cast.cast_type.as_str(), "Cast created");
        Ok(cast)
    }

    pub async fn update(&self, actor: &Actor, id: DocId, patch: CastPatch) -> AppResult<Cast> {
        policy::manage_catalog(actor).enforce("unauthorized action")?;

        let mut ops = Vec::new();
        if let Some(first_name) = patch.first_name {
            ops.push(UpdateOp::set("firstName", first_name));
        }
        if let Some(last_name) = patch.last_name {
            ops.push(UpdateOp::set("lastName", last_name));
        }
        if let Some(photo) = patch.photo {
            ops.push(UpdateOp::set("photo", photo));
        }
        if let Some(kind) = patch.cast_type {
            ops.push(UpdateOp::set("type", kind.as_str()));
        }
        if let Some(films) = patch.films {
            ops.push(UpdateOp::set("films", ids_value(&films)));
        }

        self.casts
            .update(id, &ops)
            .await?
            .ok_or_else(|| AppError::not_found("cast"))
    }

    /// Removes the cast member. Films still referencing it are left as they are.
    pub async fn delete(&self, actor: &Actor, id: DocId) -> AppResult<()> {
        policy::manage_catalog(actor).enforce("unauthorized action")?;

        if !self.casts.delete(id).await? {
            return Err(AppError::not_found("cast"));
        }
        tracing::info!(cast_id = %id, "Cast deleted");
        Ok(())
    }

    /// Every id must be distinct and name an Actor.
    pub async fn validate_actors(&self, ids: &[DocId]) -> AppResult<()> {
        ensure_distinct(ids, "actor")?;

        let found = self
            .casts
            .find(Filter::And(vec![
                Filter::In(ids.to_vec()),
                Filter::eq("type", CastType::Actor.as_str()),
            ]))
            .await?;
        if found.len() != ids.len() {
            return Err(AppError::not_found("actor"));
        }
        Ok(())
    }

    pub async fn validate_director(&self, id: DocId) -> AppResult<()> {
        match self.casts.get(id).await? {
            Some(cast) if cast.cast_type == CastType::Director => Ok(()),
            _ => Err(AppError::not_found("director")),
        }
    }

    /// Records `film_id` in the cast member's film list. Returns false when
    /// the cast member no longer exists.
    pub async fn add_film(&self, cast_id: DocId, film_id: DocId) -> AppResult<bool> {
        let updated = self
            .casts
            .update(cast_id, &[UpdateOp::push("films", film_id)])
            .await?;
        Ok(updated.is_some())
    }
}

/// Fails with `DuplicateReference` if any id repeats.
pub(crate) fn ensure_distinct(ids: &[DocId], what: &str) -> AppResult<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    if ids.iter().all(|id| seen.insert(*id)) {
        Ok(())
    } else {
        Err(AppError::DuplicateReference(format!("duplicate {what} ids")))
    }
}

pub(crate) fn ids_value(ids: &[DocId]) -> serde_json::Value {
    serde_json::Value::Array(ids.iter().map(|id| (*id).into()).collect())
}
