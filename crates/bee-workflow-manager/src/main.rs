use bee_common::config::BeeConfig;
use bee_graph_store::GraphStore;
use bee_scheduler::{Capacity, Resource};
use bee_workflow_manager::http::{self, AppState};
use bee_workflow_manager::{TmClient, Wfm};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config = BeeConfig::load(config_path.as_deref())?;

    let _telemetry = bee_common::telemetry::init("wfm", &config.workdir)?;
    tracing::info!(listen_addr = %config.wfm.listen_addr, tm_addr = %config.wfm.tm_addr, "starting bee-wfm");

    let graph = Arc::new(GraphStore::new());
    let tm = TmClient::new(config.wfm.tm_addr.clone());
    // A single local resource inventory sized for development; production
    // deployments size this from the cluster's actual partition layout,
    // which is outside this crate's scope.
    let resources = vec![Resource {
        id: "local".to_string(),
        capacity: Capacity {
            nodes: 8,
            cores_per_node: 16,
            mem_per_node_mb: 65536,
            accelerators: 0,
        },
    }];
    let wfm = Arc::new(Wfm::new(graph, tm, config.clone(), resources));

    let app = http::router(AppState { wfm });
    let listener = tokio::net::TcpListener::bind(&config.wfm.listen_addr).await?;
    tracing::info!(addr = %config.wfm.listen_addr, "bee-wfm listening");
    axum::serve(listener, app).await?;
    Ok(())
}
