use std::sync::Arc;

use crate::catalog::casts::ensure_distinct;
use crate::db::{DocId, DocumentStore, Filter, Genre, Repo, UpdateOp};
use crate::error::{AppError, AppResult};
use crate::policy::{self, Actor};

#[derive(Clone)]
pub struct GenreDirectory {
    genres: Repo<Genre>,
}

impl GenreDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            genres: Repo::new(store),
        }
    }

    pub async fn list(&self) -> AppResult<Vec<Genre>> {
        Ok(self.genres.find(Filter::All).await?)
    }

    pub async fn create(&self, actor: &Actor, name: String) -> AppResult<Genre> {
        policy::manage_catalog(actor).enforce("unauthorized action")?;

        let genre = Genre {
            id: DocId::new(),
            name,
        };
        self.genres.insert(&genre).await?;
        Ok(genre)
    }

    pub async fn update(&self, actor: &Actor, id: DocId, name: String) -> AppResult<Genre> {
        policy::manage_catalog(actor).enforce("unauthorized action")?;

        self.genres
            .update(id, &[UpdateOp::set("name", name)])
            .await?
            .ok_or_else(|| AppError::not_found("genre"))
    }

    pub async fn delete(&self, actor: &Actor, id: DocId) -> AppResult<()> {
        policy::manage_catalog(actor).enforce("unauthorized action")?;

        if !self.genres.delete(id).await? {
            return Err(AppError::not_found("genre"));
        }
        Ok(())
    }

    /// Every id must be distinct and name an existing genre.
    pub async fn validate_genres(&self, ids: &[DocId]) -> AppResult<()> {
        ensure_distinct(ids, "genre")?;

        if self.genres.find_ids(ids).await?.len() != ids.len() {
            return Err(AppError::not_found("genre"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_store, Role};

    fn admin() -> Actor {
        Actor {
            id: DocId::new(),
            role: Role::Admin,
        }
    }

    #[tokio::test]
    async fn crud() {
        let genres = GenreDirectory::new(test_store());
        let genre = genres.create(&admin(), "Drama".into()).await.unwrap();

        let renamed = genres.update(&admin(), genre.id, "Noir".into()).await.unwrap();
        assert_eq!(renamed.name, "Noir");
        assert_eq!(genres.list().await.unwrap().len(), 1);

        genres.delete(&admin(), genre.id).await.unwrap();
        assert!(genres.list().await.unwrap().is_empty());
        assert!(matches!(
            genres.delete(&admin(), genre.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn validate_genres_rules() {
        let genres = GenreDirectory::new(test_store());
        let drama = genres.create(&admin(), "Drama".into()).await.unwrap();
        let comedy = genres.create(&admin(), "Comedy".into()).await.unwrap();

        assert!(genres.validate_genres(&[drama.id, comedy.id]).await.is_ok());
        assert!(matches!(
            genres.validate_genres(&[drama.id, drama.id]).await,
            Err(AppError::DuplicateReference(_))
        ));
        assert!(matches!(
            genres.validate_genres(&[drama.id, DocId::new()]).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn users_cannot_rename() {
        let genres = GenreDirectory::new(test_store());
        let drama = genres.create(&admin(), "Drama".into()).await.unwrap();
        let user = Actor {
            id: DocId::new(),
            role: Role::User,
        };
        assert!(matches!(
            genres.update(&user, drama.id, "Noir".into()).await,
            Err(AppError::Forbidden(_))
        ));
    }
}
