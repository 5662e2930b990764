mod support;

use admin_client::storage::{SessionStorage, TOKEN_KEY};
use admin_client::{GuardDecision, MemoryStorage};
use anyhow::{Context, Result};
use httpmock::prelude::*;
use serde_json::json;
use support::{memory_app, seeded_app, user_json};

#[tokio::test]
async fn navigator_follows_sign_in_and_sign_out() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/login");
            then.status(200)
                .json_body(json!({ "token": "tok-m", "user": user_json("m1", "member") }));
        })
        .await;

    let (app, _) = memory_app(&server.url("/api"))?;
    let mut navigator = app.navigator("/users");

    let first = navigator.current();
    assert_eq!(first.decision, GuardDecision::RedirectToSignIn);
    assert_eq!(first.location, "/signin");
    assert_eq!(navigator.requested(), "/users");

    app.authenticator().sign_in("m1@gym.test", "hunter22").await?;
    let after_sign_in = navigator.session_changed().await.context("store dropped")?;
    assert_eq!(after_sign_in.decision, GuardDecision::RedirectToUnauthorized);
    assert_eq!(after_sign_in.location, "/unauthorized");

    let home = navigator.navigate("/home");
    assert_eq!(home.decision, GuardDecision::Render);
    assert_eq!(home.location, "/home");

    app.sign_out()?;
    let after_sign_out = navigator.session_changed().await.context("store dropped")?;
    assert_eq!(after_sign_out.decision, GuardDecision::RedirectToSignIn);
    Ok(())
}

#[tokio::test]
async fn routes_stay_suspended_until_verification_finishes() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/auth/me");
            then.status(200).json_body(user_json("o1", "owner"));
        })
        .await;

    let storage = MemoryStorage::new();
    storage.set(TOKEN_KEY, "tok-o")?;
    let app = seeded_app(&server.url("/api"), storage)?;
    let mut navigator = app.navigator("/Users/");

    assert_eq!(navigator.current().decision, GuardDecision::Loading);

    app.start().await;
    let resolved = navigator.session_changed().await.context("store dropped")?;
    assert_eq!(resolved.decision, GuardDecision::Render);
    assert_eq!(resolved.location, "/Users/");
    Ok(())
}

#[tokio::test]
async fn public_and_unknown_paths() -> Result<()> {
    let (app, _) = memory_app("http://127.0.0.1:9/api")?;
    let guard = app.guard();
    let snapshot = app.session.snapshot();

    assert_eq!(guard.evaluate(&snapshot, "/signin"), GuardDecision::Render);
    assert_eq!(guard.evaluate(&snapshot, "/register?step=2"), GuardDecision::Render);
    assert_eq!(guard.evaluate(&snapshot, "/no/such/page"), GuardDecision::NotFound);
    Ok(())
}
