// Response shapes. Nothing here carries a password hash.
use serde::Serialize;

use crate::db::{Cast, Comment, DocId, Film, Genre, Rating, Role, User};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: DocId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub avatar: String,
    pub email_verified: bool,
    pub role: Role,
    pub likes: Vec<DocId>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            avatar: user.avatar,
            email_verified: user.email_verified,
            role: user.role,
            likes: user.likes,
        }
    }
}

/// The caller's own account, with liked films resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: DocId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub avatar: String,
    pub email_verified: bool,
    pub role: Role,
    pub likes: Vec<Film>,
}

impl ProfileView {
    pub fn new(user: User, likes: Vec<Film>) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            avatar: user.avatar,
            email_verified: user.email_verified,
            role: user.role,
            likes,
        }
    }
}

/// Public face of a comment author: no email, role, likes or password.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentOwner {
    pub id: DocId,
    pub first_name: String,
    pub last_name: String,
    pub avatar: String,
}

impl From<&User> for CommentOwner {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: DocId,
    pub comment: String,
    pub film_id: DocId,
    pub owner: Option<CommentOwner>,
}

impl CommentView {
    pub fn new(comment: Comment, owner: Option<CommentOwner>) -> Self {
        Self {
            id: comment.id,
            comment: comment.comment,
            film_id: comment.film_id,
            owner,
        }
    }
}

/// A film with every reference replaced by the referenced document.
/// References that no longer resolve are dropped (`director` becomes null).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilmView {
    pub id: DocId,
    pub title: String,
    pub description: String,
    pub poster: String,
    pub actors: Vec<Cast>,
    pub director: Option<Cast>,
    pub genres: Vec<Genre>,
    pub comments: Vec<CommentView>,
    pub ratings: Vec<Rating>,
    pub rating_average: f64,
    pub likes: Vec<DocId>,
}
