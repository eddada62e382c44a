pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use anyhow::Context;

use crate::core::{config::Settings, security, state::AppState, telemetry};
use crate::db::types::CallerRole;
use crate::services::attempts::AttemptEngine;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let engine = AttemptEngine::postgres(db_pool.clone(), &settings);
    let state = AppState::new(settings, db_pool, engine);

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        grace_period_seconds = state.settings().quiz().grace_period_seconds,
        expired_attempts = state.settings().quiz().expired_attempts.as_str(),
        "Quiz attempts API listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await?;

    tracing::info!("Quiz attempts API stopped");
    Ok(())
}

/// Mints a bearer token for `user_id` acting as `role` (`learner`, `instructor`
/// or `admin`), signed with the configured secret.
pub fn issue_token(user_id: &str, role: &str, ttl_minutes: Option<i64>) -> anyhow::Result<String> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    let role: CallerRole = serde_json::from_value(serde_json::Value::String(role.to_string()))
        .with_context(|| format!("unknown role '{role}'; expected learner, instructor or admin"))?;

    let token = security::create_access_token(
        user_id,
        role,
        &settings,
        ttl_minutes.map(time::Duration::minutes),
    )?;
    Ok(token)
}
