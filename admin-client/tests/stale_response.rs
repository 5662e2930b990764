mod support;

use std::sync::Arc;

use admin_client::storage::{SessionStorage, TOKEN_KEY};
use admin_client::{
    AdminApp, ClientConfig, IdentityProvider, LoginResponse, MemoryStorage, VerificationOutcome,
};
use anyhow::Result;
use common_auth::{AuthError, Role};
use common_http_errors::ApiError;
use reqwest::StatusCode;
use support::{credential, principal, user_json, GatedProvider};

fn app_with(provider: Arc<GatedProvider>, storage: MemoryStorage) -> Result<AdminApp> {
    let provider: Arc<dyn IdentityProvider> = provider;
    AdminApp::with_provider(
        ClientConfig::in_memory("http://127.0.0.1:9/api"),
        Arc::new(storage),
        provider,
    )
}

#[tokio::test]
async fn late_verification_does_not_overwrite_fresh_sign_in() -> Result<()> {
    let provider = GatedProvider::with_me(Ok(user_json("old", "member")));
    let storage = MemoryStorage::new();
    storage.set(TOKEN_KEY, "old-token")?;
    let app = app_with(provider.clone(), storage.clone())?;

    let verifying = tokio::spawn({
        let app = app.clone();
        async move { app.start().await }
    });
    provider.entered.notified().await;

    app.session
        .set_session(credential("fresh-token"), principal("o1", Role::Owner))?;
    provider.release.notify_one();

    let outcome = verifying.await?;
    assert!(matches!(outcome, VerificationOutcome::Discarded));
    let session = app.session.session();
    assert_eq!(session.credential.as_ref().map(|c| c.as_str()), Some("fresh-token"));
    assert_eq!(session.principal.map(|p| p.role), Some(Role::Owner));
    assert_eq!(storage.get(TOKEN_KEY)?.as_deref(), Some("fresh-token"));
    Ok(())
}

#[tokio::test]
async fn late_verification_failure_does_not_clear_new_session() -> Result<()> {
    let provider = GatedProvider::with_me(Err(ApiError::Rejected {
        status: StatusCode::UNAUTHORIZED,
        message: "Token expired".into(),
    }));
    let storage = MemoryStorage::new();
    storage.set(TOKEN_KEY, "old-token")?;
    let app = app_with(provider.clone(), storage.clone())?;

    let verifying = tokio::spawn({
        let app = app.clone();
        async move { app.start().await }
    });
    provider.entered.notified().await;

    app.session
        .set_session(credential("fresh-token"), principal("t1", Role::Trainer))?;
    provider.release.notify_one();

    assert!(matches!(verifying.await?, VerificationOutcome::Discarded));
    assert!(app.session.is_authenticated());
    assert_eq!(storage.get(TOKEN_KEY)?.as_deref(), Some("fresh-token"));
    assert_eq!(app.metrics.identity_checks("invalid"), 0);
    Ok(())
}

#[tokio::test]
async fn sign_in_completing_after_sign_out_is_superseded() -> Result<()> {
    let provider = GatedProvider::with_login(Ok(LoginResponse {
        token: Some("late-token".into()),
        user: Some(user_json("o1", "owner")),
    }));
    let storage = MemoryStorage::new();
    let app = app_with(provider.clone(), storage.clone())?;

    let signing_in = tokio::spawn({
        let app = app.clone();
        async move { app.authenticator().sign_in("o1@gym.test", "hunter22").await }
    });
    provider.entered.notified().await;

    app.sign_out()?;
    provider.release.notify_one();

    let result = signing_in.await?;
    assert!(matches!(result, Err(AuthError::Superseded)));
    assert!(!app.session.is_authenticated());
    assert!(!storage.contains(TOKEN_KEY));
    assert_eq!(app.metrics.login_attempts("superseded"), 1);
    Ok(())
}
