use std::sync::Arc;

use crate::auth::mailer::{password_reset_email, verification_email, Mailer};
use crate::auth::password::PasswordHasher;
use crate::auth::tokens::{TokenPurpose, TokenSigner};
use crate::db::{Comment, DocId, DocumentStore, Filter, Film, Repo, Role, StoreError, UpdateOp, User};
use crate::error::{AppError, AppResult};
use crate::policy::{self, Actor};
use crate::validation::{LoginInput, ProfilePatch, SignupInput};
use crate::views::{ProfileView, UserView};

/// Accounts, credentials and the signed tokens that stand for them.
#[derive(Clone)]
pub struct IdentityService {
    users: Repo<User>,
    comments: Repo<Comment>,
    films: Repo<Film>,
    signer: TokenSigner,
    hasher: PasswordHasher,
    mailer: Arc<dyn Mailer>,
    link_base: String,
}

impl IdentityService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        signer: TokenSigner,
        hasher: PasswordHasher,
        mailer: Arc<dyn Mailer>,
        link_base: impl Into<String>,
    ) -> Self {
        Self {
            users: Repo::new(Arc::clone(&store)),
            comments: Repo::new(Arc::clone(&store)),
            films: Repo::new(store),
            signer,
            hasher,
            mailer,
            link_base: link_base.into(),
        }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Mails a verification link, then stores the new unverified user. A
    /// failed delivery stores nothing, so the same email can sign up again.
    pub async fn register(&self, input: SignupInput) -> AppResult<UserView> {
        let user = self.new_user(input, Role::User, false).await?;

        let token = self.signer.issue(user.id, TokenPurpose::EmailVerification)?;
        let email = verification_email(&user.email, &self.link_base, &token);
        self.mailer.send(email).await?;

        self.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user.into())
    }

    pub async fn verify_email(&self, token: &str) -> AppResult<()> {
        let user_id = self.verify_link_token(token, TokenPurpose::EmailVerification)?;

        self.users
            .update(user_id, &[UpdateOp::set("emailVerified", true)])
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;

        tracing::info!(user_id = %user_id, "Email verified");
        Ok(())
    }

    /// Returns a session token for a verified user.
    pub async fn login(&self, input: LoginInput) -> AppResult<String> {
        let user = self.check_credentials(&input).await?;

        if !user.email_verified {
            return Err(AppError::Forbidden(
                "user not verified, please check your email".into(),
            ));
        }

        Ok(self.signer.issue(user.id, TokenPurpose::Session)?)
    }

    /// Like `login`, for admins only. Email verification is not required here.
    pub async fn admin_login(&self, input: LoginInput) -> AppResult<String> {
        let user = self.check_credentials(&input).await?;

        if user.role != Role::Admin {
            return Err(AppError::Forbidden("you are not admin".into()));
        }

        Ok(self.signer.issue(user.id, TokenPurpose::Session)?)
    }

    /// Mails a reset link. Earlier reset links stay valid until they expire.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let user = self
            .users
            .find_one(Filter::eq("email", email))
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;

        let token = self.signer.issue(user.id, TokenPurpose::PasswordReset)?;
        self.mailer
            .send(password_reset_email(&user.email, &self.link_base, &token))
            .await?;

        Ok(())
    }

    // TODO: record used reset tokens so a link cannot be replayed within its lifetime
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()> {
        let user_id = self.verify_link_token(token, TokenPurpose::PasswordReset)?;

        if self.users.get(user_id).await?.is_none() {
            return Err(AppError::not_found("user"));
        }

        let hash = self.hasher.hash(new_password).await?;
        self.users
            .update(user_id, &[UpdateOp::set("passwordHash", hash)])
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;

        tracing::info!(user_id = %user_id, "Password reset");
        Ok(())
    }

    /// Resolves a session token (raw or `Bearer`-prefixed) to its user.
    pub async fn authorize(&self, token: Option<&str>) -> AppResult<Actor> {
        let token = token
            .map(|t| t.strip_prefix("Bearer ").unwrap_or(t).trim())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthenticated("token is missing".into()))?;

        let user_id = self
            .signer
            .verify(token, TokenPurpose::Session)
            .map_err(|e| {
                tracing::debug!("Rejected session token: {}", e);
                AppError::Unauthenticated("invalid token".into())
            })?;

        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;

        Ok(Actor::from(&user))
    }

    pub async fn require_role(&self, user_id: DocId, role: Role) -> AppResult<()> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;

        if user.role != role {
            return Err(AppError::Forbidden("unauthorized action".into()));
        }
        Ok(())
    }

    pub async fn profile(&self, user_id: DocId) -> AppResult<ProfileView> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;
        let likes = self.films.find_ids(&user.likes).await?;

        Ok(ProfileView::new(user, likes))
    }

    pub async fn update_profile(&self, user_id: DocId, patch: ProfilePatch) -> AppResult<UserView> {
        let mut ops = Vec::new();
        if let Some(first_name) = patch.first_name {
            ops.push(UpdateOp::set("firstName", first_name));
        }
        if let Some(last_name) = patch.last_name {
            ops.push(UpdateOp::set("lastName", last_name));
        }
        if let Some(avatar) = patch.avatar {
            ops.push(UpdateOp::set("avatar", avatar));
        }
        if let Some(password) = patch.password {
            ops.push(UpdateOp::set("passwordHash", self.hasher.hash(&password).await?));
        }

        let user = self
            .users
            .update(user_id, &ops)
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;

        Ok(user.into())
    }

    pub async fn add_admin(&self, actor: &Actor, input: SignupInput) -> AppResult<UserView> {
        policy::administer_users(actor).enforce("unauthorized action")?;

        let admin = self.new_user(input, Role::Admin, false).await?;
        self.insert_user(&admin).await?;
        tracing::info!(user_id = %admin.id, created_by = %actor.id, "Admin added");
        Ok(admin.into())
    }

    pub async fn list_users(&self, actor: &Actor) -> AppResult<Vec<UserView>> {
        policy::administer_users(actor).enforce("unauthorized action")?;

        let users = self.users.find(Filter::All).await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    /// Deletes a user, then their comments, then their likes. Each step is a
    /// separate write; a failure part way leaves the earlier steps in place.
    pub async fn delete_user(&self, actor: &Actor, user_id: DocId) -> AppResult<()> {
        let target = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;
        policy::delete_user(actor, &target).enforce("unauthorized action")?;

        self.users.delete(user_id).await?;

        let comments = self.comments.find(Filter::eq("owner", user_id)).await?;
        for comment in &comments {
            self.films
                .update(comment.film_id, &[UpdateOp::pull("comments", comment.id)])
                .await?;
            self.comments.delete(comment.id).await?;
        }

        for film_id in &target.likes {
            self.films
                .update(*film_id, &[UpdateOp::pull("likes", user_id)])
                .await?;
        }

        tracing::info!(
            user_id = %user_id,
            comments = comments.len(),
            "User deleted"
        );
        Ok(())
    }

    /// Creates a verified admin unless an account with this email exists.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, input: SignupInput) -> AppResult<bool> {
        if self
            .users
            .find_one(Filter::eq("email", input.email.as_str()))
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let admin = self.new_user(input, Role::Admin, true).await?;
        self.insert_user(&admin).await?;
        tracing::info!(user_id = %admin.id, "Seeded admin account");
        Ok(true)
    }

    async fn new_user(&self, input: SignupInput, role: Role, verified: bool) -> AppResult<User> {
        let registered = self
            .users
            .find_one(Filter::eq("email", input.email.as_str()))
            .await?;
        if registered.is_some() {
            return Err(AppError::Conflict("user already registered".into()));
        }

        Ok(User {
            id: DocId::new(),
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            password_hash: self.hasher.hash(&input.password).await?,
            avatar: input.avatar,
            email_verified: verified,
            role,
            likes: Vec::new(),
        })
    }

    async fn insert_user(&self, user: &User) -> AppResult<()> {
        // The unique email index catches a concurrent registration that
        // slipped past the lookup in `new_user`
        match self.users.insert(user).await {
            Ok(()) => Ok(()),
            Err(StoreError::Duplicate(_)) => {
                Err(AppError::Conflict("user already registered".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn check_credentials(&self, input: &LoginInput) -> AppResult<User> {
        let user = self
            .users
            .find_one(Filter::eq("email", input.email.as_str()))
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;

        if !self
            .hasher
            .verify(&input.password, &user.password_hash)
            .await?
        {
            return Err(AppError::InvalidCredential);
        }
        Ok(user)
    }

    fn verify_link_token(&self, token: &str, purpose: TokenPurpose) -> AppResult<DocId> {
        self.signer.verify(token, purpose).map_err(|e| {
            tracing::debug!("Rejected {:?} token: {}", purpose, e);
            AppError::Unauthorized("unauthorized action".into())
        })
    }
}
