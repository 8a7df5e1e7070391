//! Request body shapes and their validation. Each `*Request` is what arrives
//! over the wire; `validate` turns it into the typed input a service accepts,
//! or into a `Validation` error listing every violation found.

use serde::Deserialize;

use crate::db::{CastType, DocId};
use crate::error::{AppError, AppResult};

const BCRYPT_MAX_BYTES: usize = 72;

#[derive(Debug, Default)]
struct Violations(Vec<String>);

impl Violations {
    fn required<'a, T>(&mut self, field: &str, value: &'a Option<T>) -> Option<&'a T> {
        if value.is_none() {
            self.0.push(format!("{field} is required"));
        }
        value.as_ref()
    }

    fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.0
                .push(format!("{field} must be at least {min} characters long"));
        } else if len > max {
            self.0
                .push(format!("{field} must be at most {max} characters long"));
        }
    }

    /// bcrypt ignores everything past 72 bytes, so longer passwords are
    /// refused rather than silently truncated.
    fn password(&mut self, field: &str, value: &str) {
        self.length(field, value, 6, 100);
        if value.len() > BCRYPT_MAX_BYTES {
            self.0
                .push(format!("{field} must be at most {BCRYPT_MAX_BYTES} bytes long"));
        }
    }

    fn email(&mut self, field: &str, value: &str) {
        if !is_email(value) {
            self.0.push(format!("{field} must be a valid email"));
        }
    }

    fn uri(&mut self, field: &str, value: &str, min: usize, max: usize) {
        self.length(field, value, min, max);
        if url::Url::parse(value).is_err() {
            self.0.push(format!("{field} must be a valid uri"));
        }
    }

    fn id(&mut self, field: &str, value: &str) -> Option<DocId> {
        match value.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                self.0.push(format!("{field} must be a valid id"));
                None
            }
        }
    }

    fn ids(&mut self, field: &str, values: &[String], min: usize) -> Vec<DocId> {
        if values.len() < min {
            self.0
                .push(format!("{field} must contain at least {min} items"));
        }
        values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| self.id(&format!("{field}[{i}]"), v))
            .collect()
    }

    fn cast_type(&mut self, field: &str, value: &str) -> Option<CastType> {
        match value {
            "Actor" => Some(CastType::Actor),
            "Director" => Some(CastType::Director),
            _ => {
                self.0
                    .push(format!("{field} must be one of [Actor, Director]"));
                None
            }
        }
    }

    fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> AppResult<T> {
        if !self.0.is_empty() {
            return Err(AppError::Validation(self.0));
        }
        build().ok_or_else(|| AppError::Internal("validated input incomplete".into()))
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}

/// Parses an identifier taken from a request path.
pub fn path_id(name: &str, value: &str) -> AppResult<DocId> {
    value
        .parse()
        .map_err(|_| AppError::invalid(format!("the path {name} is not a valid object id")))
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignupRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub avatar: String,
}

impl SignupRequest {
    pub fn validate(self) -> AppResult<SignupInput> {
        let mut v = Violations::default();
        if let Some(s) = v.required("firstName", &self.first_name) {
            v.length("firstName", s, 2, 100);
        }
        if let Some(s) = v.required("lastName", &self.last_name) {
            v.length("lastName", s, 2, 100);
        }
        if let Some(s) = v.required("email", &self.email) {
            v.email("email", s);
        }
        if let Some(s) = v.required("password", &self.password) {
            v.password("password", s);
        }
        if let Some(s) = v.required("avatar", &self.avatar) {
            v.uri("avatar", s, 6, 1000);
        }
        v.finish(|| {
            Some(SignupInput {
                first_name: self.first_name?,
                last_name: self.last_name?,
                email: self.email?,
                password: self.password?,
                avatar: self.avatar?,
            })
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> AppResult<LoginInput> {
        let mut v = Violations::default();
        if let Some(s) = v.required("email", &self.email) {
            v.email("email", s);
        }
        if let Some(s) = v.required("password", &self.password) {
            v.password("password", s);
        }
        v.finish(|| {
            Some(LoginInput {
                email: self.email?,
                password: self.password?,
            })
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

impl ForgotPasswordRequest {
    pub fn validate(self) -> AppResult<String> {
        let mut v = Violations::default();
        if let Some(s) = v.required("email", &self.email) {
            v.email("email", s);
        }
        v.finish(|| self.email)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
}

impl ResetPasswordRequest {
    pub fn validate(self) -> AppResult<String> {
        let mut v = Violations::default();
        if let Some(s) = v.required("password", &self.password) {
            v.password("password", s);
        }
        v.finish(|| self.password)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileRequest {
    pub fn validate(self) -> AppResult<ProfilePatch> {
        let mut v = Violations::default();
        if let Some(s) = &self.first_name {
            v.length("firstName", s, 2, 100);
        }
        if let Some(s) = &self.last_name {
            v.length("lastName", s, 2, 100);
        }
        if let Some(s) = &self.password {
            v.password("password", s);
        }
        if let Some(s) = &self.avatar {
            v.uri("avatar", s, 6, 1000);
        }
        v.finish(|| {
            Some(ProfilePatch {
                first_name: self.first_name,
                last_name: self.last_name,
                password: self.password,
                avatar: self.avatar,
            })
        })
    }
}

// -- Casts --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CastRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo: Option<String>,
    #[serde(rename = "type")]
    pub cast_type: Option<String>,
    pub films: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct NewCast {
    pub first_name: String,
    pub last_name: String,
    pub photo: String,
    pub cast_type: CastType,
    pub films: Vec<DocId>,
}

#[derive(Debug, Clone, Default)]
pub struct CastPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo: Option<String>,
    pub cast_type: Option<CastType>,
    pub films: Option<Vec<DocId>>,
}

impl CastRequest {
    pub fn validate_new(self) -> AppResult<NewCast> {
        let mut v = Violations::default();
        if let Some(s) = v.required("firstName", &self.first_name) {
            v.length("firstName", s, 2, 100);
        }
        if let Some(s) = v.required("lastName", &self.last_name) {
            v.length("lastName", s, 2, 100);
        }
        if let Some(s) = v.required("photo", &self.photo) {
            v.uri("photo", s, 5, 1000);
        }
        let cast_type = v
            .required("type", &self.cast_type)
            .and_then(|s| v.cast_type("type", s));
        let films = v.ids("films", self.films.as_deref().unwrap_or_default(), 0);
        v.finish(|| {
            Some(NewCast {
                first_name: self.first_name?,
                last_name: self.last_name?,
                photo: self.photo?,
                cast_type: cast_type?,
                films,
            })
        })
    }

    pub fn validate_patch(self) -> AppResult<CastPatch> {
        let mut v = Violations::default();
        if let Some(s) = &self.first_name {
            v.length("firstName", s, 2, 100);
        }
        if let Some(s) = &self.last_name {
            v.length("lastName", s, 2, 100);
        }
        if let Some(s) = &self.photo {
            v.uri("photo", s, 5, 1000);
        }
        let cast_type = self.cast_type.as_deref().and_then(|s| v.cast_type("type", s));
        let films = self.films.as_deref().map(|ids| v.ids("films", ids, 0));
        v.finish(|| {
            Some(CastPatch {
                first_name: self.first_name,
                last_name: self.last_name,
                photo: self.photo,
                cast_type,
                films,
            })
        })
    }
}

// -- Genres --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenreRequest {
    pub name: Option<String>,
}

impl GenreRequest {
    pub fn validate(self) -> AppResult<String> {
        let mut v = Violations::default();
        if let Some(s) = v.required("name", &self.name) {
            v.length("name", s, 3, 1000);
        }
        v.finish(|| self.name)
    }
}

// -- Films --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilmRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub poster: Option<String>,
    pub actors: Option<Vec<String>>,
    pub director: Option<String>,
    pub genres: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct NewFilm {
    pub title: String,
    pub description: String,
    pub poster: String,
    pub actors: Vec<DocId>,
    pub director: DocId,
    pub genres: Vec<DocId>,
}

#[derive(Debug, Clone, Default)]
pub struct FilmPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub poster: Option<String>,
    pub actors: Option<Vec<DocId>>,
    pub director: Option<DocId>,
    pub genres: Option<Vec<DocId>>,
}

impl FilmRequest {
    fn check_text(&self, v: &mut Violations) {
        if let Some(s) = &self.title {
            v.length("title", s, 1, 200);
        }
        if let Some(s) = &self.description {
            v.length("description", s, 5, 1000);
        }
        if let Some(s) = &self.poster {
            v.uri("poster", s, 5, 1000);
        }
    }

    pub fn validate_new(self) -> AppResult<NewFilm> {
        let mut v = Violations::default();
        v.required("title", &self.title);
        v.required("description", &self.description);
        v.required("poster", &self.poster);
        self.check_text(&mut v);
        let actors = v
            .required("actors", &self.actors)
            .map(|ids| v.ids("actors", ids, 1));
        let director = v
            .required("director", &self.director)
            .and_then(|id| v.id("director", id));
        let genres = v
            .required("genres", &self.genres)
            .map(|ids| v.ids("genres", ids, 1));
        v.finish(|| {
            Some(NewFilm {
                title: self.title?,
                description: self.description?,
                poster: self.poster?,
                actors: actors?,
                director: director?,
                genres: genres?,
            })
        })
    }

    pub fn validate_patch(self) -> AppResult<FilmPatch> {
        let mut v = Violations::default();
        self.check_text(&mut v);
        let actors = self.actors.as_deref().map(|ids| v.ids("actors", ids, 1));
        let director = self.director.as_deref().and_then(|id| v.id("director", id));
        let genres = self.genres.as_deref().map(|ids| v.ids("genres", ids, 1));
        v.finish(|| {
            Some(FilmPatch {
                title: self.title,
                description: self.description,
                poster: self.poster,
                actors,
                director,
                genres,
            })
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatingRequest {
    pub rating: Option<f64>,
}

impl RatingRequest {
    pub fn validate(self) -> AppResult<f64> {
        let mut v = Violations::default();
        if let Some(r) = v.required("rating", &self.rating) {
            if !(0.0..=5.0).contains(r) {
                v.0.push("rating must be between 0 and 5".to_string());
            }
        }
        v.finish(|| self.rating)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentRequest {
    pub comment: Option<String>,
}

impl CommentRequest {
    pub fn validate(self) -> AppResult<String> {
        let mut v = Violations::default();
        if let Some(s) = v.required("comment", &self.comment) {
            v.length("comment", s, 3, 1000);
        }
        v.finish(|| self.comment)
    }
}
