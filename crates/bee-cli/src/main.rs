//! Operator CLI: launches the long-lived services and wraps the common
//! one-off calls against their HTTP surfaces, the way `db-cli` gives an
//! operator `db-cli <validate|seed|cleanup>` without reimplementing the
//! service itself.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bee_common::config::{BackendKind, BeeConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bee-cli")]
#[command(about = "Operator tooling for the BEE orchestration core")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Workflow Manager service.
    ServeWfm {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Start the Task Manager service.
    ServeTm {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print a workflow's current status and task states.
    Status {
        /// Workflow id.
        wf_id: uuid::Uuid,
        /// WFM base URL.
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        wfm_addr: String,
    },
    /// Submit a workflow archive to the WFM.
    Submit {
        /// Path to the `workflow_archive` tarball.
        archive: PathBuf,
        #[arg(long)]
        wf_name: String,
        #[arg(long)]
        main_cwl: String,
        /// WFM base URL.
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        wfm_addr: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::ServeWfm { config } => serve_wfm(config).await,
        Commands::ServeTm { config } => serve_tm(config).await,
        Commands::Status { wf_id, wfm_addr } => status(wf_id, &wfm_addr).await,
        Commands::Submit {
            archive,
            wf_name,
            main_cwl,
            wfm_addr,
        } => submit(&archive, &wf_name, &main_cwl, &wfm_addr).await,
    }
}

async fn serve_wfm(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = BeeConfig::load(config_path.as_deref())?;
    let _telemetry = bee_common::telemetry::init("wfm", &config.workdir)?;
    tracing::info!(listen_addr = %config.wfm.listen_addr, "starting bee-wfm via bee-cli");

    let graph = Arc::new(bee_graph_store::GraphStore::new());
    let tm = bee_workflow_manager::TmClient::new(config.wfm.tm_addr.clone());
    let resources = vec![bee_scheduler::Resource {
        id: "local".to_string(),
        capacity: bee_scheduler::Capacity {
            nodes: 8,
            cores_per_node: 16,
            mem_per_node_mb: 65536,
            accelerators: 0,
        },
    }];
    let wfm = Arc::new(bee_workflow_manager::Wfm::new(graph, tm, config.clone(), resources));

    let app = bee_workflow_manager::http::router(bee_workflow_manager::http::AppState { wfm });
    let listener = tokio::net::TcpListener::bind(&config.wfm.listen_addr).await?;
    tracing::info!(addr = %config.wfm.listen_addr, "bee-wfm listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn serve_tm(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = BeeConfig::load(config_path.as_deref())?;
    let _telemetry = bee_common::telemetry::init("tm", &config.workdir)?;
    tracing::info!(listen_addr = %config.tm.listen_addr, backend = ?config.tm.backend, "starting bee-tm via bee-cli");

    let backend: Arc<dyn bee_task_manager::WorkloadBackend> = match config.tm.backend {
        BackendKind::Slurm => Arc::new(bee_task_manager::SlurmBackend),
        BackendKind::Lsf => Arc::new(bee_task_manager::LsfBackend),
        BackendKind::Simple => Arc::new(bee_task_manager::SimpleBackend::new()),
    };

    let tm = Arc::new(bee_task_manager::Tm {
        state: Arc::new(bee_task_manager::TmState::new(config.tm.max_poll_failures)),
        backend,
        backend_kind: config.tm.backend,
        wfm: bee_task_manager::WfmClient::new(config.tm.wfm_addr.clone()),
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

    let app = bee_task_manager::http::router(bee_task_manager::http::AppState { tm });
    let listener = tokio::net::TcpListener::bind(&config.tm.listen_addr).await?;
    tracing::info!(addr = %config.tm.listen_addr, "bee-tm listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn status(wf_id: uuid::Uuid, wfm_addr: &str) -> anyhow::Result<()> {
    let url = format!("{}/workflows/{}", wfm_addr.trim_end_matches('/'), wf_id);
    let resp = reqwest::get(&url).await?;
    if !resp.status().is_success() {
        anyhow::bail!("wfm returned {}", resp.status());
    }
    let body: serde_json::Value = resp.json().await?;
    println!(
        "workflow {} ({}): {}",
        body["name"].as_str().unwrap_or("?"),
        body["wf_id"],
        body["status"].as_str().unwrap_or("?")
    );
    if let Some(tasks) = body["tasks"].as_array() {
        for t in tasks {
            println!(
                "  {:<20} {:<10} {}",
                t["name"].as_str().unwrap_or("?"),
                t["state"].as_str().unwrap_or("?"),
                t["task_id"]
            );
        }
    }
    Ok(())
}

async fn submit(archive: &std::path::Path, wf_name: &str, main_cwl: &str, wfm_addr: &str) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(archive).await?;
    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(archive.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
    let form = reqwest::multipart::Form::new().part("workflow_archive", part);

    let url = format!("{}/workflows", wfm_addr.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let resp = client.post(&url).multipart(form).send().await?;
    let status = resp.status();
    let body: serde_json::Value = resp.json().await?;
    if !status.is_success() {
        anyhow::bail!("submit failed ({}): {}", status, body);
    }
    println!("submitted {} ({}) as workflow {}", wf_name, main_cwl, body["wf_id"]);
    Ok(())
}
