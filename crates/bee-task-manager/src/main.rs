use bee_common::config::{BackendKind, BeeConfig};
use bee_task_manager::backend::{LsfBackend, SimpleBackend, SlurmBackend, WorkloadBackend};
use bee_task_manager::http::{self, AppState};
use bee_task_manager::tick::Tm;
use bee_task_manager::{TmState, WfmClient};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config = BeeConfig::load(config_path.as_deref())?;

    let _telemetry = bee_common::telemetry::init("tm", &config.workdir)?;
    tracing::info!(listen_addr = %config.tm.listen_addr, backend = ?config.tm.backend, "starting bee-tm");

    let backend: Arc<dyn WorkloadBackend> = match config.tm.backend {
        BackendKind::Slurm => Arc::new(SlurmBackend),
        BackendKind::Lsf => Arc::new(LsfBackend),
        BackendKind::Simple => Arc::new(SimpleBackend::new()),
    };

    let tm = Arc::new(Tm {
        state: Arc::new(TmState::new(config.tm.max_poll_failures)),
        backend,
        backend_kind: config.tm.backend,
        wfm: WfmClient::new(config.tm.wfm_addr.clone()),
    });

    let tick_tm = tm.clone();
    let interval = Duration::from_secs(config.tm.tick_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            tick_tm.check_tasks().await;
        }
    });

    let app = http::router(AppState { tm });
    let listener = tokio::net::TcpListener::bind(&config.tm.listen_addr).await?;
    tracing::info!(addr = %config.tm.listen_addr, "bee-tm listening");
    axum::serve(listener, app).await?;
    Ok(())
}
