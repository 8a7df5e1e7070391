// Document store adapter - each collection is a table of JSON documents.
// Every operation touches exactly one document, or one filtered batch; there is
// no cross-document transaction.
use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use thiserror::Error;

use crate::db::models::DocId;
use crate::db::DbPool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Duplicate key in {0}")]
    Duplicate(&'static str),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Casts,
    Genres,
    Films,
    Comments,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Casts,
        Collection::Genres,
        Collection::Films,
        Collection::Comments,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Casts => "casts",
            Collection::Genres => "genres",
            Collection::Films => "films",
            Collection::Comments => "comments",
        }
    }
}

/// Selection over the documents of one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    /// Top-level field equals the value.
    Eq(&'static str, Value),
    /// Document id is one of these.
    In(Vec<DocId>),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Filter::Eq(field, value.into())
    }

    fn to_sql(&self, params: &mut Vec<SqlValue>) -> StoreResult<String> {
        match self {
            Filter::All => Ok("1".to_string()),
            Filter::Eq(field, value) => {
                let path = json_path(field)?;
                match value {
                    Value::Null => Ok(format!("json_extract(doc, '{path}') IS NULL")),
                    Value::Bool(b) => {
                        params.push(SqlValue::Integer(i64::from(*b)));
                        Ok(format!("json_extract(doc, '{path}') = ?"))
                    }
                    Value::Number(n) => {
                        params.push(match n.as_i64() {
                            Some(i) => SqlValue::Integer(i),
                            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
                        });
                        Ok(format!("json_extract(doc, '{path}') = ?"))
                    }
                    Value::String(s) => {
                        params.push(SqlValue::Text(s.clone()));
                        Ok(format!("json_extract(doc, '{path}') = ?"))
                    }
                    Value::Array(_) | Value::Object(_) => {
                        params.push(SqlValue::Text(value.to_string()));
                        Ok(format!("json_extract(doc, '{path}') = json(?)"))
                    }
                }
            }
            Filter::In(ids) => {
                if ids.is_empty() {
                    return Ok("0".to_string());
                }
                let placeholders = vec!["?"; ids.len()].join(", ");
                params.extend(ids.iter().map(|id| SqlValue::Text(id.to_string())));
                Ok(format!("id IN ({placeholders})"))
            }
            Filter::And(filters) => {
                if filters.is_empty() {
                    return Ok("1".to_string());
                }
                let parts = filters
                    .iter()
                    .map(|f| f.to_sql(params).map(|sql| format!("({sql})")))
                    .collect::<StoreResult<Vec<_>>>()?;
                Ok(parts.join(" AND "))
            }
        }
    }
}

/// A field-level change applied atomically to a single document.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set(&'static str, Value),
    /// Append to an array field, creating it when absent.
    Push(&'static str, Value),
    /// Remove every element equal to the value from an array field.
    Pull(&'static str, Value),
}

impl UpdateOp {
    pub fn set(field: &'static str, value: impl Into<Value>) -> Self {
        UpdateOp::Set(field, value.into())
    }

    pub fn push(field: &'static str, value: impl Into<Value>) -> Self {
        UpdateOp::Push(field, value.into())
    }

    pub fn pull(field: &'static str, value: impl Into<Value>) -> Self {
        UpdateOp::Pull(field, value.into())
    }

    fn apply(&self, doc: &mut Value) -> StoreResult<()> {
        let obj = doc
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidUpdate("document is not an object".into()))?;

        match self {
            UpdateOp::Set(field, value) => {
                obj.insert((*field).to_string(), value.clone());
            }
            UpdateOp::Push(field, value) => {
                let entry = obj
                    .entry((*field).to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                match entry {
                    Value::Array(items) => items.push(value.clone()),
                    _ => {
                        return Err(StoreError::InvalidUpdate(format!(
                            "cannot push to non-array field {field}"
                        )))
                    }
                }
            }
            UpdateOp::Pull(field, value) => match obj.get_mut(*field) {
                Some(Value::Array(items)) => items.retain(|item| item != value),
                Some(_) => {
                    return Err(StoreError::InvalidUpdate(format!(
                        "cannot pull from non-array field {field}"
                    )))
                }
                None => {}
            },
        }
        Ok(())
    }
}

fn json_path(field: &str) -> StoreResult<String> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::InvalidUpdate(format!("invalid field name {field:?}")));
    }
    Ok(format!("$.{field}"))
}

fn map_write_error(collection: Collection, err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            StoreError::Duplicate(collection.table())
        }
        other => StoreError::Sql(other),
    }
}

/// Store trait - all persistence goes through here
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: DocId) -> StoreResult<Option<Value>>;

    async fn find(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Value>>;

    async fn insert(&self, collection: Collection, id: DocId, doc: Value) -> StoreResult<()>;

    /// Atomic read-modify-write of one document. Returns the updated
    /// document, or `None` when no document has this id.
    async fn update(
        &self,
        collection: Collection,
        id: DocId,
        ops: &[UpdateOp],
    ) -> StoreResult<Option<Value>>;

    async fn delete(&self, collection: Collection, id: DocId) -> StoreResult<bool>;

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> StoreResult<u64>;
}

/// SQLite implementation
pub struct SqliteDocumentStore {
    pool: DbPool,
}

impl SqliteDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: Collection, id: DocId) -> StoreResult<Option<Value>> {
        let conn = self.pool.get()?;

        let json: Option<String> = conn
            .query_row(
                &format!("SELECT doc FROM {} WHERE id = ?1", collection.table()),
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Value>> {
        let conn = self.pool.get()?;

        let mut params = Vec::new();
        let predicate = filter.to_sql(&mut params)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT doc FROM {} WHERE {} ORDER BY id",
            collection.table(),
            predicate
        ))?;

        let rows: Vec<String> = stmt
            .query_map(params_from_iter(params), |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }

    async fn insert(&self, collection: Collection, id: DocId, doc: Value) -> StoreResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            &format!("INSERT INTO {} (id, doc) VALUES (?1, ?2)", collection.table()),
            params![id.to_string(), doc.to_string()],
        )
        .map_err(|e| map_write_error(collection, e))?;

        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: DocId,
        ops: &[UpdateOp],
    ) -> StoreResult<Option<Value>> {
        let mut conn = self.pool.get()?;

        // Write lock up front so the read below cannot go stale
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<String> = tx
            .query_row(
                &format!("SELECT doc FROM {} WHERE id = ?1", collection.table()),
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(json) = current else {
            return Ok(None);
        };

        let mut doc: Value = serde_json::from_str(&json)?;
        for op in ops {
            op.apply(&mut doc)?;
        }

        tx.execute(
            &format!("UPDATE {} SET doc = ?1 WHERE id = ?2", collection.table()),
            params![doc.to_string(), id.to_string()],
        )
        .map_err(|e| map_write_error(collection, e))?;
        tx.commit()?;

        Ok(Some(doc))
    }

    async fn delete(&self, collection: Collection, id: DocId) -> StoreResult<bool> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", collection.table()),
            params![id.to_string()],
        )?;

        Ok(rows > 0)
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        let conn = self.pool.get()?;

        let mut params = Vec::new();
        let predicate = filter.to_sql(&mut params)?;
        let rows = conn.execute(
            &format!("DELETE FROM {} WHERE {}", collection.table(), predicate),
            params_from_iter(params),
        )?;

        Ok(rows as u64)
    }
}
