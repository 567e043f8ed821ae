//! Dashboard server command: `issue-triage serve`.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use issue_triage::config::{ConfigOverrides, TriageConfig};
use issue_triage::triage::api::AppState;
use issue_triage::triage::assets::AssetSource;
use issue_triage::triage::runner::{ActionRunner, GhCli};
use issue_triage::triage::server::{ServerConfig, TriageServer, shutdown_signal};
use issue_triage::triage::store::TriageStore;

pub async fn cmd_serve(
    triage_dir: &Path,
    overrides: ConfigOverrides,
    open: bool,
    dev: bool,
) -> Result<()> {
    let triage_dir = super::resolve_triage_dir(triage_dir)?;
    let mut config = TriageConfig::load(&triage_dir)?;
    config.apply_overrides(overrides);
    let repo = config.resolve_repo()?;

    let runner: Arc<dyn ActionRunner> =
        Arc::new(GhCli::new(config.gh_bin.clone(), config.command_timeout()));
    let state = Arc::new(AppState::new(
        TriageStore::new(&triage_dir),
        runner,
        repo.clone(),
        AssetSource::from_dir(config.static_dir.clone()),
    ));

    let server_config = ServerConfig {
        host: config.host.clone(),
        port: config.port,
        dev_mode: dev,
    };
    let server = TriageServer::bind(&server_config, state).await?;
    let addr = server.local_addr()?;
    let url = format!("http://127.0.0.1:{}", addr.port());

    println!("Issue triage UI: {}", url);
    println!("Repo: {}", repo);
    println!("Data: {}", triage_dir.display());
    tracing::info!(%addr, repo = %repo, "triage server listening");

    // No browser inside dev containers
    if open && !dev {
        tokio::spawn(async move {
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        });
    }

    let handle = server.shutdown_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        println!("\nShutting down...");
        handle.shutdown();
    });

    server.serve().await
}
