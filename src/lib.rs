pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod grading;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod store;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, state::AppState, telemetry};

pub async fn run_worker() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    crate::core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let state = AppState::new(settings, db_pool);

    tracing::info!(
        environment = %state.settings().runtime().environment.as_str(),
        sweep_interval_seconds = state.settings().sweeper().sweep_interval_seconds,
        sweep_batch_size = state.settings().sweeper().sweep_batch_size,
        "quizdeck worker starting"
    );

    tasks::scheduler::run(state).await
}
