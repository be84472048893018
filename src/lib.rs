pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod store;

#[cfg(test)]
mod test_support;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::services::question_bank_import;
use crate::store::postgres::PgExamStore;
use crate::store::SeedOutcome;

async fn bootstrap() -> anyhow::Result<(Settings, PgExamStore)> {
    dotenvy::dotenv().ok();

    let settings = Settings::load().context("invalid configuration")?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await.context("failed to connect to database")?;
    db::run_migrations(&db_pool).await.context("failed to run migrations")?;

    Ok((settings, PgExamStore::new(db_pool)))
}

pub async fn run() -> anyhow::Result<()> {
    let (settings, store) = bootstrap().await?;
    let state = AppState::new(settings, Arc::new(store));

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr())
        .await
        .with_context(|| format!("failed to bind {}", state.settings().server_addr()))?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "PTE Core API listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await?;

    Ok(())
}

/// Loads the configured question bank unless the store already has one.
pub async fn run_seed(path: Option<String>) -> anyhow::Result<()> {
    let (settings, store) = bootstrap().await?;
    let path = path.unwrap_or_else(|| settings.exam().question_bank_path.clone());

    let summary = question_bank_import::import_bank(&store, Path::new(&path))
        .await
        .with_context(|| format!("failed to import question bank from {path}"))?;

    match summary.outcome {
        SeedOutcome::Seeded => tracing::info!(
            categories = summary.categories,
            question_types = summary.question_types,
            blueprints = summary.blueprints,
            questions = summary.questions,
            "Seed complete"
        ),
        SeedOutcome::AlreadySeeded => {
            tracing::info!(status = "skipped", reason = "already_seeded", "Seed skipped")
        }
    }

    Ok(())
}
