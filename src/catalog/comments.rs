use std::collections::HashMap;
use std::sync::Arc;

use crate::db::{Comment, DocId, DocumentStore, Filter, Film, Repo, UpdateOp, User};
use crate::error::{AppError, AppResult};
use crate::policy::{self, Actor};
use crate::views::{CommentOwner, CommentView};

/// Comments on films. A comment's film and owner never change after creation.
#[derive(Clone)]
pub struct CommentService {
    comments: Repo<Comment>,
    films: Repo<Film>,
    users: Repo<User>,
}

impl CommentService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            comments: Repo::new(Arc::clone(&store)),
            films: Repo::new(Arc::clone(&store)),
            users: Repo::new(store),
        }
    }

    pub async fn list(&self, film_id: DocId) -> AppResult<Vec<CommentView>> {
        self.require_film(film_id).await?;
        comment_views(&self.comments, &self.users, film_id).await
    }

    pub async fn create(&self, film_id: DocId, author: &Actor, text: String) -> AppResult<Comment> {
        self.require_film(film_id).await?;

        let comment = Comment {
            id: DocId::new(),
            comment: text,
            film_id,
            owner: author.id,
        };
        self.comments.insert(&comment).await?;

        let film = self
            .films
            .update(film_id, &[UpdateOp::push("comments", comment.id)])
            .await?;
        if film.is_none() {
            tracing::warn!(
                comment_id = %comment.id,
                film_id = %film_id,
                "Film vanished before comment could be linked"
            );
        }

        tracing::debug!(comment_id = %comment.id, film_id = %film_id, "Comment created");
        Ok(comment)
    }

    /// Owner only; admins get no override here.
    pub async fn update(
        &self,
        film_id: DocId,
        comment_id: DocId,
        actor: &Actor,
        text: String,
    ) -> AppResult<Comment> {
        let comment = self.load(film_id, comment_id).await?;
        policy::edit_comment(actor, &comment).enforce("unauthorized action")?;

        self.comments
            .update(comment_id, &[UpdateOp::set("comment", text)])
            .await?
            .ok_or_else(|| AppError::not_found("comment"))
    }

    /// Owner or admin. Unlinks from the film first, then removes the comment.
    pub async fn delete(&self, film_id: DocId, comment_id: DocId, actor: &Actor) -> AppResult<()> {
        let comment = self.load(film_id, comment_id).await?;
        policy::delete_comment(actor, &comment).enforce("unauthorized action")?;

        self.films
            .update(film_id, &[UpdateOp::pull("comments", comment_id)])
            .await?;
        self.comments.delete(comment_id).await?;

        tracing::info!(comment_id = %comment_id, removed_by = %actor.id, "Comment removed");
        Ok(())
    }

    async fn require_film(&self, film_id: DocId) -> AppResult<()> {
        match self.films.get(film_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found("film")),
        }
    }

    // A comment addressed through the wrong film does not exist as far as
    // the caller is concerned
    async fn load(&self, film_id: DocId, comment_id: DocId) -> AppResult<Comment> {
        self.require_film(film_id).await?;

        self.comments
            .get(comment_id)
            .await?
            .filter(|c| c.film_id == film_id)
            .ok_or_else(|| AppError::not_found("comment"))
    }
}

/// A film's comments with each author's public fields attached.
pub(crate) async fn comment_views(
    comments: &Repo<Comment>,
    users: &Repo<User>,
    film_id: DocId,
) -> AppResult<Vec<CommentView>> {
    let comments = comments.find(Filter::eq("filmId", film_id)).await?;

    let mut owner_ids: Vec<DocId> = comments.iter().map(|c| c.owner).collect();
    owner_ids.sort();
    owner_ids.dedup();

    let owners: HashMap<DocId, CommentOwner> = users
        .find_ids(&owner_ids)
        .await?
        .iter()
        .map(|u| (u.id, CommentOwner::from(u)))
        .collect();

    Ok(comments
        .into_iter()
        .map(|c| {
            let owner = owners.get(&c.owner).cloned();
            CommentView::new(c, owner)
        })
        .collect())
}
