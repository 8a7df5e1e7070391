use std::sync::Arc;

use futures::future::try_join_all;

use crate::catalog::casts::{ids_value, CastDirectory};
use crate::catalog::comments::comment_views;
use crate::catalog::genres::GenreDirectory;
use crate::catalog::in_order;
use crate::catalog::locks::AggregateLocks;
use crate::db::{
    Cast, Comment, DocId, DocumentStore, Filter, Film, Genre, Rating, Repo, StoreError, UpdateOp,
    User,
};
use crate::error::{AppError, AppResult};
use crate::policy::{self, Actor};
use crate::validation::{FilmPatch, NewFilm};
use crate::views::FilmView;

/// Films and everything they authoritatively own: ratings, likes and the
/// comment list. Keeps the cast and user mirrors in step with sequential
/// writes; ratings and likes are serialized per film.
#[derive(Clone)]
pub struct FilmService {
    films: Repo<Film>,
    users: Repo<User>,
    comments: Repo<Comment>,
    cast_docs: Repo<Cast>,
    genre_docs: Repo<Genre>,
    casts: CastDirectory,
    genres: GenreDirectory,
    locks: AggregateLocks,
}

impl FilmService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        casts: CastDirectory,
        genres: GenreDirectory,
        locks: AggregateLocks,
    ) -> Self {
        Self {
            films: Repo::new(Arc::clone(&store)),
            users: Repo::new(Arc::clone(&store)),
            comments: Repo::new(Arc::clone(&store)),
            cast_docs: Repo::new(Arc::clone(&store)),
            genre_docs: Repo::new(store),
            casts,
            genres,
            locks,
        }
    }

    pub async fn list(&self) -> AppResult<Vec<FilmView>> {
        let films = self.films.find(Filter::All).await?;
        try_join_all(films.into_iter().map(|film| self.render(film))).await
    }

    pub async fn get(&self, id: DocId) -> AppResult<FilmView> {
        let film = self
            .films
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("film"))?;
        self.render(film).await
    }

    /// Validates every reference before the first write. After the film is
    /// stored, each cast member gets the film appended to its mirror; a
    /// failure there leaves the film in place.
    pub async fn create(&self, actor: &Actor, input: NewFilm) -> AppResult<Film> {
        policy::manage_catalog(actor).enforce("unauthorized action")?;

        self.casts.validate_actors(&input.actors).await?;
        self.casts.validate_director(input.director).await?;
        self.genres.validate_genres(&input.genres).await?;

        let film = Film {
            id: DocId::new(),
            title: input.title,
            description: input.description,
            poster: input.poster,
            actors: input.actors,
            director: input.director,
            genres: input.genres,
            comments: Vec::new(),
            ratings: Vec::new(),
            rating_average: 0.0,
            likes: Vec::new(),
        };
        self.films.insert(&film).await?;
        tracing::info!(film_id = %film.id, title = %film.title, "Film created");

        let linked = film
            .actors
            .iter()
            .chain(std::iter::once(&film.director))
            .map(|cast_id| self.casts.add_film(*cast_id, film.id));
        match try_join_all(linked).await {
            Ok(found) if found.iter().all(|f| *f) => {}
            Ok(_) => {
                tracing::warn!(film_id = %film.id, "Cast member removed before its film list was updated");
            }
            Err(e) => {
                tracing::warn!(film_id = %film.id, "Cast film lists not fully updated: {}", e);
                return Err(e);
            }
        }

        Ok(film)
    }

    /// Partial update. Cast mirrors are not touched when actors or the
    /// director change.
    pub async fn update(&self, actor: &Actor, id: DocId, patch: FilmPatch) -> AppResult<Film> {
        policy::manage_catalog(actor).enforce("unauthorized action")?;

        if self.films.get(id).await?.is_none() {
            return Err(AppError::not_found("film"));
        }

        let mut ops = Vec::new();
        if let Some(actors) = &patch.actors {
            self.casts.validate_actors(actors).await?;
            ops.push(UpdateOp::set("actors", ids_value(actors)));
        }
        if let Some(director) = patch.director {
            self.casts.validate_director(director).await?;
            ops.push(UpdateOp::set("director", director));
        }
        if let Some(genres) = &patch.genres {
            self.genres.validate_genres(genres).await?;
            ops.push(UpdateOp::set("genres", ids_value(genres)));
        }
        if let Some(title) = patch.title {
            ops.push(UpdateOp::set("title", title));
        }
        if let Some(description) = patch.description {
            ops.push(UpdateOp::set("description", description));
        }
        if let Some(poster) = patch.poster {
            ops.push(UpdateOp::set("poster", poster));
        }

        self.films
            .update(id, &ops)
            .await?
            .ok_or_else(|| AppError::not_found("film"))
    }

    /// Deletes the film's comments, then the film. Cast and user mirrors keep
    /// their stale references.
    pub async fn delete(&self, actor: &Actor, id: DocId) -> AppResult<()> {
        policy::manage_catalog(actor).enforce("unauthorized action")?;

        if self.films.get(id).await?.is_none() {
            return Err(AppError::not_found("film"));
        }

        let removed = self.comments.delete_many(Filter::eq("filmId", id)).await?;
        self.films.delete(id).await?;

        tracing::info!(film_id = %id, comments = removed, "Film deleted");
        Ok(())
    }

    /// One rating per user per film; the average is recomputed from the
    /// stored list after the append.
    pub async fn add_rating(&self, film_id: DocId, user_id: DocId, value: f64) -> AppResult<Film> {
        let _guard = self.locks.lock(film_id).await;

        let film = self
            .films
            .get(film_id)
            .await?
            .ok_or_else(|| AppError::not_found("film"))?;
        if film.rated_by(user_id) {
            return Err(AppError::Conflict("user already rated this film".into()));
        }

        let rating = Rating {
            user_id,
            rating: value,
        };
        let entry = serde_json::to_value(&rating).map_err(StoreError::from)?;
        let film = self
            .films
            .update(film_id, &[UpdateOp::push("ratings", entry)])
            .await?
            .ok_or_else(|| AppError::not_found("film"))?;

        let average = Film::average_rating(&film.ratings);
        self.films
            .update(film_id, &[UpdateOp::set("ratingAverage", average)])
            .await?
            .ok_or_else(|| AppError::not_found("film"))
    }

    /// Likes the film if the user has not, unlikes it otherwise. The film is
    /// written first, then the user's mirror.
    pub async fn toggle_like(&self, film_id: DocId, user_id: DocId) -> AppResult<Film> {
        let _guard = self.locks.lock(film_id).await;

        let film = self
            .films
            .get(film_id)
            .await?
            .ok_or_else(|| AppError::not_found("film"))?;

        let liked = film.liked_by(user_id);
        let (film_op, user_op) = if liked {
            (UpdateOp::pull("likes", user_id), UpdateOp::pull("likes", film_id))
        } else {
            (UpdateOp::push("likes", user_id), UpdateOp::push("likes", film_id))
        };

        let film = self
            .films
            .update(film_id, &[film_op])
            .await?
            .ok_or_else(|| AppError::not_found("film"))?;

        if let Err(e) = self.users.update(user_id, &[user_op]).await {
            tracing::warn!(
                film_id = %film_id,
                user_id = %user_id,
                "Like recorded on film but not on user: {}",
                e
            );
            return Err(e.into());
        }

        tracing::debug!(film_id = %film_id, user_id = %user_id, liked = !liked, "Like toggled");
        Ok(film)
    }

    async fn render(&self, film: Film) -> AppResult<FilmView> {
        let actors = self.cast_docs.find_ids(&film.actors).await?;
        let director = self.cast_docs.get(film.director).await?;
        let genres = self.genre_docs.find_ids(&film.genres).await?;
        let comments = comment_views(&self.comments, &self.users, film.id).await?;

        Ok(FilmView {
            id: film.id,
            title: film.title,
            description: film.description,
            poster: film.poster,
            actors: in_order(&film.actors, actors, |c| c.id),
            director,
            genres: in_order(&film.genres, genres, |g| g.id),
            comments,
            ratings: film.ratings,
            rating_average: film.rating_average,
            likes: film.likes,
        })
    }
}
