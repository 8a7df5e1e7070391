use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::store::Collection;

/// Store-assigned document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(uuid::Uuid);

impl DocId {
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }
}

impl Default for DocId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

impl From<DocId> for serde_json::Value {
    fn from(id: DocId) -> Self {
        serde_json::Value::String(id.to_string())
    }
}

/// A type stored as a JSON document in one collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn id(&self) -> DocId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastType {
    Actor,
    Director,
}

impl CastType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CastType::Actor => "Actor",
            CastType::Director => "Director",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: DocId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: String,
    pub email_verified: bool,
    pub role: Role,
    #[serde(default)]
    pub likes: Vec<DocId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cast {
    pub id: DocId,
    pub first_name: String,
    pub last_name: String,
    pub photo: String,
    #[serde(rename = "type")]
    pub cast_type: CastType,
    /// Mirror of the films listing this cast member; films are authoritative.
    #[serde(default)]
    pub films: Vec<DocId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub id: DocId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub user_id: DocId,
    pub rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: DocId,
    pub title: String,
    pub description: String,
    pub poster: String,
    pub actors: Vec<DocId>,
    pub director: DocId,
    pub genres: Vec<DocId>,
    #[serde(default)]
    pub comments: Vec<DocId>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub rating_average: f64,
    #[serde(default)]
    pub likes: Vec<DocId>,
}

impl Film {
    /// Arithmetic mean of all ratings, 0 when unrated.
    pub fn average_rating(ratings: &[Rating]) -> f64 {
        if ratings.is_empty() {
            return 0.0;
        }
        let sum: f64 = ratings.iter().map(|r| r.rating).sum();
        sum / ratings.len() as f64
    }

    pub fn rated_by(&self, user_id: DocId) -> bool {
        self.ratings.iter().any(|r| r.user_id == user_id)
    }

    pub fn liked_by(&self, user_id: DocId) -> bool {
        self.likes.contains(&user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: DocId,
    pub comment: String,
    pub film_id: DocId,
    pub owner: DocId,
}

impl Document for User {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> DocId {
        self.id
    }
}

impl Document for Cast {
    const COLLECTION: Collection = Collection::Casts;

    fn id(&self) -> DocId {
        self.id
    }
}

impl Document for Genre {
    const COLLECTION: Collection = Collection::Genres;

    fn id(&self) -> DocId {
        self.id
    }
}

impl Document for Film {
    const COLLECTION: Collection = Collection::Films;

    fn id(&self) -> DocId {
        self.id
    }
}

impl Document for Comment {
    const COLLECTION: Collection = Collection::Comments;

    fn id(&self) -> DocId {
        self.id
    }
}
