use clap::Parser;
use tracing::info;

use stager::config::{CliArgs, build_config};
use stager::dispatch::AppState;
use stager::{app, shutdown, templates};
use stager_core::Manager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stager_utils::telemetry::setup_telemetry("stager=info,stager_core=info,tower_http=info");

    let args = CliArgs::parse();
    let config = build_config(&args)?;

    info!(
        listen = %config.listen,
        domain_suffix = %config.domain_suffix,
        base_port = config.base_port,
        max_instances = config.max_instances,
        "starting stager"
    );

    let templates = templates::templates(config.resource_dir.as_deref());
    let (manager, notify_rx) = Manager::new(config.clone());

    tokio::spawn(stager_core::supervisor::run(manager.clone(), notify_rx));

    let state = AppState {
        manager: manager.clone(),
        templates,
    };
    let router = app(state, config.resource_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    info!(addr = %config.listen, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown::signal())
        .await?;

    Ok(())
}
