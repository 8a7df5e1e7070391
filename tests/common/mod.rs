#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use reelbase::auth::{Email, MailError, Mailer};
use reelbase::config::Config;
use reelbase::db::{self, DocId, SqliteDocumentStore};
use reelbase::policy::Actor;
use reelbase::state::AppState;
use reelbase::validation::{LoginInput, SignupInput};

pub const SECRET: &[u8] = b"integration-test-secret";
pub const PASSWORD: &str = "secret1";

/// Keeps every outgoing email; can be switched to fail delivery.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }

    /// Token at the end of the most recent link mailed to `to`.
    pub fn last_token_for(&self, to: &str) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|e| e.to == to)
            .and_then(|e| e.link.rsplit('/').next().map(str::to_string))
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Delivery("smtp unreachable".into()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pool = db::create_pool(&dir.path().join("test.db")).unwrap();
        db::run_migrations(&pool).unwrap();

        let mut config = Config::default();
        config.auth.bcrypt_cost = 4;
        config.mail.link_base = "http://client.test".into();

        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(
            &config,
            SECRET,
            Arc::new(SqliteDocumentStore::new(pool)),
            mailer.clone(),
        );

        Self {
            state,
            mailer,
            _dir: dir,
        }
    }

    pub fn router(&self) -> axum::Router {
        reelbase::routes::app(self.state.clone())
    }

    /// Registers an unverified user and returns their id.
    pub async fn register(&self, email: &str) -> DocId {
        self.state
            .identity
            .register(signup(email))
            .await
            .unwrap()
            .id
    }

    /// Registers, verifies and logs in a user. Returns the actor and a
    /// session token.
    pub async fn verified_user(&self, email: &str) -> (Actor, String) {
        self.register(email).await;
        let token = self.mailer.last_token_for(email).unwrap();
        self.state.identity.verify_email(&token).await.unwrap();

        let session = self.state.identity.login(login(email)).await.unwrap();
        let actor = self.state.identity.authorize(Some(&session)).await.unwrap();
        (actor, session)
    }

    pub async fn admin(&self, email: &str) -> (Actor, String) {
        self.state.identity.ensure_admin(signup(email)).await.unwrap();

        let session = self.state.identity.admin_login(login(email)).await.unwrap();
        let actor = self.state.identity.authorize(Some(&session)).await.unwrap();
        (actor, session)
    }
}

pub fn signup(email: &str) -> SignupInput {
    SignupInput {
        first_name: "Ann".into(),
        last_name: "Bell".into(),
        email: email.into(),
        password: PASSWORD.into(),
        avatar: "http://avatar.test/a.png".into(),
    }
}

pub fn login(email: &str) -> LoginInput {
    LoginInput {
        email: email.into(),
        password: PASSWORD.into(),
    }
}
