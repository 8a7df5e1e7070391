use std::sync::Arc;

use crate::auth::identity::IdentityService;
use crate::auth::mailer::Mailer;
use crate::auth::password::PasswordHasher;
use crate::auth::tokens::TokenSigner;
use crate::catalog::{AggregateLocks, CastDirectory, CommentService, FilmService, GenreDirectory};
use crate::config::Config;
use crate::db::DocumentStore;

/// Everything a request handler needs, built once at startup and never
/// mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub identity: IdentityService,
    pub casts: CastDirectory,
    pub genres: GenreDirectory,
    pub films: FilmService,
    pub comments: CommentService,
}

impl AppState {
    /// Wires the services over `store`. The signing secret is passed in
    /// resolved; `config.auth.jwt_secret` is not consulted here.
    pub fn new(
        config: &Config,
        secret: &[u8],
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let signer = TokenSigner::new(secret, config.auth.token_days);
        let hasher = PasswordHasher::new(config.auth.bcrypt_cost);

        let identity = IdentityService::new(
            Arc::clone(&store),
            signer,
            hasher,
            mailer,
            config.mail.link_base.clone(),
        );
        let casts = CastDirectory::new(Arc::clone(&store));
        let genres = GenreDirectory::new(Arc::clone(&store));
        let films = FilmService::new(
            Arc::clone(&store),
            casts.clone(),
            genres.clone(),
            AggregateLocks::new(),
        );
        let comments = CommentService::new(store);

        Self {
            identity,
            casts,
            genres,
            films,
            comments,
        }
    }
}
