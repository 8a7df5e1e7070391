mod common;

use common::{login, signup, TestApp};
use reelbase::auth::TokenPurpose;
use reelbase::db::{DocId, Role};
use reelbase::error::AppError;
use reelbase::validation::{LoginInput, ProfilePatch};

#[tokio::test]
async fn register_verify_login_scenario() {
    let app = TestApp::new();
    let identity = &app.state.identity;

    let user_id = app.register("a@x.com").await;
    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].link.starts_with("http://client.test/email_verified/"));

    let err = identity.login(login("a@x.com")).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");

    let token = app.mailer.last_token_for("a@x.com").unwrap();
    identity.verify_email(&token).await.unwrap();
    // Idempotent
    identity.verify_email(&token).await.unwrap();

    let session = identity.login(login("a@x.com")).await.unwrap();
    let decoded = identity
        .signer()
        .verify(&session, TokenPurpose::Session)
        .unwrap();
    assert_eq!(decoded, user_id);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = TestApp::new();
    app.register("dup@x.com").await;

    let err = app
        .state
        .identity
        .register(signup("dup@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn login_failures_in_order() {
    let app = TestApp::new();
    let identity = &app.state.identity;

    let err = identity.login(login("ghost@x.com")).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    app.register("b@x.com").await;
    let wrong = LoginInput {
        email: "b@x.com".into(),
        password: "wrong-password".into(),
    };
    let err = identity.login(wrong).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidCredential));
}

#[tokio::test]
async fn verification_rejects_reset_tokens() {
    let app = TestApp::new();
    let identity = &app.state.identity;
    let user_id = app.register("c@x.com").await;

    let reset = identity
        .signer()
        .issue(user_id, TokenPurpose::PasswordReset)
        .unwrap();
    let err = identity.verify_email(&reset).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let err = identity.verify_email("not-a-token").await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn verification_of_deleted_user_is_not_found() {
    let app = TestApp::new();
    let token = app
        .state
        .identity
        .signer()
        .issue(DocId::new(), TokenPurpose::EmailVerification)
        .unwrap();

    let err = app.state.identity.verify_email(&token).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn admin_login_skips_verification_but_requires_role() {
    let app = TestApp::new();
    let identity = &app.state.identity;

    // add_admin creates an unverified admin
    let (root, _) = app.admin("root@x.com").await;
    identity
        .add_admin(&root, signup("second@x.com"))
        .await
        .unwrap();
    assert!(identity.admin_login(login("second@x.com")).await.is_ok());
    assert!(matches!(
        identity.login(login("second@x.com")).await,
        Err(AppError::Forbidden(_))
    ));

    app.verified_user("plain@x.com").await;
    let err = identity.admin_login(login("plain@x.com")).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(ref m) if m == "you are not admin"));
}

#[tokio::test]
async fn password_reset_flow() {
    let app = TestApp::new();
    let identity = &app.state.identity;
    app.verified_user("d@x.com").await;

    identity.request_password_reset("d@x.com").await.unwrap();
    let token = app.mailer.last_token_for("d@x.com").unwrap();
    assert!(app
        .mailer
        .sent()
        .last()
        .unwrap()
        .link
        .contains("/reset-password/"));

    identity.reset_password(&token, "brand-new").await.unwrap();

    assert!(matches!(
        identity.login(login("d@x.com")).await,
        Err(AppError::InvalidCredential)
    ));
    let fresh = LoginInput {
        email: "d@x.com".into(),
        password: "brand-new".into(),
    };
    assert!(identity.login(fresh).await.is_ok());

    // Reset links are not single-use
    assert!(identity.reset_password(&token, "third-one").await.is_ok());

    assert!(matches!(
        identity.request_password_reset("nobody@x.com").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn reset_rejects_verification_tokens() {
    let app = TestApp::new();
    app.register("e@x.com").await;
    let verification = app.mailer.last_token_for("e@x.com").unwrap();

    let err = app
        .state
        .identity
        .reset_password(&verification, "whatever")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn authorize_accepts_only_session_tokens() {
    let app = TestApp::new();
    let identity = &app.state.identity;
    let (actor, session) = app.verified_user("f@x.com").await;

    let bearer = format!("Bearer {session}");
    assert_eq!(identity.authorize(Some(&bearer)).await.unwrap(), actor);

    assert!(matches!(
        identity.authorize(None).await,
        Err(AppError::Unauthenticated(_))
    ));

    let verification = identity
        .signer()
        .issue(actor.id, TokenPurpose::EmailVerification)
        .unwrap();
    assert!(matches!(
        identity.authorize(Some(&verification)).await,
        Err(AppError::Unauthenticated(_))
    ));

    let orphan = identity
        .signer()
        .issue(DocId::new(), TokenPurpose::Session)
        .unwrap();
    assert!(matches!(
        identity.authorize(Some(&orphan)).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn require_role_checks_stored_role() {
    let app = TestApp::new();
    let (admin, _) = app.admin("g@x.com").await;
    let (user, _) = app.verified_user("h@x.com").await;
    let identity = &app.state.identity;

    assert!(identity.require_role(admin.id, Role::Admin).await.is_ok());
    assert!(matches!(
        identity.require_role(user.id, Role::Admin).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        identity.require_role(DocId::new(), Role::User).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn failed_verification_mail_leaves_email_free_for_retry() {
    let app = TestApp::new();
    let identity = &app.state.identity;
    app.mailer.set_failing(true);

    let err = identity.register(signup("i@x.com")).await.unwrap_err();
    assert!(matches!(err, AppError::Mail(_)), "got {err:?}");
    assert!(matches!(
        identity.login(login("i@x.com")).await,
        Err(AppError::NotFound(_))
    ));

    app.mailer.set_failing(false);
    identity.register(signup("i@x.com")).await.unwrap();
    assert_eq!(app.mailer.sent().len(), 1);

    let token = app.mailer.last_token_for("i@x.com").unwrap();
    identity.verify_email(&token).await.unwrap();
    assert!(identity.login(login("i@x.com")).await.is_ok());
}

#[tokio::test]
async fn profile_update_and_view() {
    let app = TestApp::new();
    let identity = &app.state.identity;
    let (actor, _) = app.verified_user("j@x.com").await;

    let patch = ProfilePatch {
        first_name: Some("Joan".into()),
        password: Some("changed1".into()),
        ..Default::default()
    };
    let updated = identity.update_profile(actor.id, patch).await.unwrap();
    assert_eq!(updated.first_name, "Joan");
    assert_eq!(updated.last_name, "Bell");

    let profile = identity.profile(actor.id).await.unwrap();
    assert_eq!(profile.first_name, "Joan");
    assert!(profile.likes.is_empty());

    let fresh = LoginInput {
        email: "j@x.com".into(),
        password: "changed1".into(),
    };
    assert!(identity.login(fresh).await.is_ok());
}

#[tokio::test]
async fn only_admins_list_users_and_admins_are_not_deletable() {
    let app = TestApp::new();
    let identity = &app.state.identity;
    let (admin, _) = app.admin("k@x.com").await;
    let (user, _) = app.verified_user("l@x.com").await;

    assert!(matches!(
        identity.list_users(&user).await,
        Err(AppError::Forbidden(_))
    ));
    assert_eq!(identity.list_users(&admin).await.unwrap().len(), 2);

    assert!(matches!(
        identity.delete_user(&admin, admin.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        identity.delete_user(&admin, DocId::new()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn ensure_admin_is_idempotent() {
    let app = TestApp::new();
    let identity = &app.state.identity;

    assert!(identity.ensure_admin(signup("m@x.com")).await.unwrap());
    assert!(!identity.ensure_admin(signup("m@x.com")).await.unwrap());
    // Seeded admins are verified, so regular login works too
    assert!(identity.login(login("m@x.com")).await.is_ok());
}
