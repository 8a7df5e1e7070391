use std::marker::PhantomData;
use std::sync::Arc;

use crate::db::models::{DocId, Document};
use crate::db::store::{DocumentStore, Filter, StoreError, StoreResult, UpdateOp};

/// Typed accessor for the collection holding `T`.
pub struct Repo<T> {
    store: Arc<dyn DocumentStore>,
    _doc: PhantomData<fn() -> T>,
}

impl<T> Clone for Repo<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _doc: PhantomData,
        }
    }
}

impl<T: Document> Repo<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _doc: PhantomData,
        }
    }

    pub async fn get(&self, id: DocId) -> StoreResult<Option<T>> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn find(&self, filter: Filter) -> StoreResult<Vec<T>> {
        self.store
            .find(T::COLLECTION, &filter)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }

    pub async fn find_one(&self, filter: Filter) -> StoreResult<Option<T>> {
        Ok(self.find(filter).await?.into_iter().next())
    }

    pub async fn find_ids(&self, ids: &[DocId]) -> StoreResult<Vec<T>> {
        self.find(Filter::In(ids.to_vec())).await
    }

    pub async fn insert(&self, doc: &T) -> StoreResult<()> {
        let value = serde_json::to_value(doc)?;
        self.store.insert(T::COLLECTION, doc.id(), value).await
    }

    pub async fn update(&self, id: DocId, ops: &[UpdateOp]) -> StoreResult<Option<T>> {
        match self.store.update(T::COLLECTION, id, ops).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, id: DocId) -> StoreResult<bool> {
        self.store.delete(T::COLLECTION, id).await
    }

    pub async fn delete_many(&self, filter: Filter) -> StoreResult<u64> {
        self.store.delete_many(T::COLLECTION, &filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Genre;
    use crate::db::{memory_pool, run_migrations, SqliteDocumentStore};

    fn genres() -> Repo<Genre> {
        let pool = memory_pool().unwrap();
        run_migrations(&pool).unwrap();
        Repo::new(Arc::new(SqliteDocumentStore::new(pool)))
    }

    #[tokio::test]
    async fn typed_round_trip() {
        let repo = genres();
        let genre = Genre {
            id: DocId::new(),
            name: "Drama".into(),
        };
        repo.insert(&genre).await.unwrap();

        let loaded = repo.get(genre.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Drama");

        let renamed = repo
            .update(genre.id, &[UpdateOp::set("name", "Noir")])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Noir");
    }

    #[tokio::test]
    async fn find_ids_skips_unknown_ids() {
        let repo = genres();
        let genre = Genre {
            id: DocId::new(),
            name: "Comedy".into(),
        };
        repo.insert(&genre).await.unwrap();

        let found = repo.find_ids(&[genre.id, DocId::new()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, genre.id);
    }
}
