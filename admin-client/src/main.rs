use std::env;

use admin_client::{load_client_config, AdminApp, VerificationOutcome};
use anyhow::{bail, Context, Result};
use common_security::HOME_PATH;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: admin-client <status | signin <email> <password> | signout | open <path>>";

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_client_config().context("Failed to load admin-client config")?;
    let filter = EnvFilter::try_new(&config.log_filter)
        .with_context(|| format!("Invalid GYM_LOG filter '{}'", config.log_filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let app = AdminApp::new(config)?;
    if let VerificationOutcome::Invalidated(err) = app.start().await {
        warn!(error = %err, "stored session was rejected");
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["status"] | [] => print_status(&app),
        ["signin", email, password] => {
            let principal = app
                .authenticator()
                .sign_in(email, password)
                .await
                .map_err(|err| anyhow::anyhow!(err.user_message()))?;
            println!("signed in as {} ({})", principal.email, principal.role);
            let landing = app.navigator(HOME_PATH).current();
            println!("landing: {}", landing.location);
        }
        ["signout"] => {
            app.sign_out().context("Failed to clear session")?;
            println!("signed out");
        }
        ["open", path] => {
            let navigation = app.navigator(*path).current();
            println!("{} -> {} ({})", navigation.requested, navigation.location, navigation.decision.as_str());
        }
        _ => bail!(USAGE),
    }
    Ok(())
}

fn print_status(app: &AdminApp) {
    let snapshot = app.session.snapshot();
    match snapshot.principal() {
        Some(principal) if snapshot.is_authenticated() => {
            println!("signed in as {} ({})", principal.email, principal.role);
            if let Some(tenant) = principal.tenant_id() {
                println!("tenant: {tenant}");
            }
            for route in app.routes.accessible_for(principal) {
                println!("  {}", route.path);
            }
        }
        _ => println!("signed out"),
    }
    println!("backend: {}", app.config.api_base_url);
}
