//! `relay-hub` binary: settings, telemetry, relay server and worker supervisor.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use relay_server::{load_settings, RelayServer, RelaySettings, ShutdownCoordinator};
use relay_telemetry::{init_telemetry, parse_level, TelemetryConfig};
use relay_worker::{SupervisorExit, WorkerSupervisor};
use tracing::{error, info, warn};

/// Real-time relay between a robot, a camera, browser UIs and an inference worker.
#[derive(Debug, Parser)]
#[command(name = "relay-hub", version)]
struct Cli {
    /// Interface to bind.
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (overrides `PORT`).
    #[arg(long, short)]
    port: Option<u16>,
    /// Directory with the browser UI bundle.
    #[arg(long)]
    static_dir: Option<PathBuf>,
    /// Do not launch the inference worker.
    #[arg(long)]
    no_worker: bool,
    /// Interpreter for the inference worker (overrides `PYTHON_PATH`).
    #[arg(long)]
    python_path: Option<String>,
    /// Inference worker script (overrides `AI_SCRIPT_PATH`).
    #[arg(long)]
    script: Option<PathBuf>,
    /// Default log level when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn apply(&self, settings: &mut RelaySettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(dir) = &self.static_dir {
            settings.server.static_dir = Some(dir.clone());
        }
        if self.no_worker {
            settings.worker.enabled = false;
        }
        if let Some(program) = &self.python_path {
            settings.worker.program.clone_from(program);
        }
        if let Some(script) = &self.script {
            settings.worker.script = Some(script.clone());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let telemetry = TelemetryConfig {
        log_level: parse_level(&cli.log_level).unwrap_or(tracing::Level::INFO),
        json: cli.log_json,
        ..TelemetryConfig::default()
    };
    init_telemetry(&telemetry).context("failed to initialise logging")?;

    let mut settings = load_settings();
    cli.apply(&mut settings);
    info!(
        host = %settings.server.host,
        port = settings.server.port,
        worker = settings.worker.enabled,
        "starting relay hub"
    );

    let metrics = match relay_server::metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "metrics disabled");
            None
        }
    };

    let coordinator = ShutdownCoordinator::new();
    let server = match RelayServer::bind(&settings.server, metrics, coordinator.token()).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failed to start relay server");
            if let Some(hint) = e.hint() {
                error!("{hint}");
            }
            std::process::exit(1);
        }
    };
    info!(addr = %server.local_addr(), "relay hub ready");

    let mut tasks = Vec::new();
    if settings.worker.enabled {
        let supervisor = WorkerSupervisor::new(settings.worker.clone());
        let token = coordinator.token();
        let handle = tokio::spawn(async move {
            match supervisor.run(token).await {
                SupervisorExit::CleanExit => info!("inference worker finished"),
                SupervisorExit::LaunchFailed(e) => warn!(error = %e, "inference worker unavailable"),
                SupervisorExit::Cancelled => {}
            }
        });
        tasks.push(("worker-supervisor", handle));
    }

    let signal_coordinator = coordinator.clone();
    let _signal = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => error!(error = %e, "failed to listen for ctrl-c, shutting down"),
        }
        signal_coordinator.shutdown();
    });

    let served = server.serve().await;
    let _abandoned = coordinator.drain(tasks, None).await;
    served.context("relay server failed")?;
    info!("relay hub stopped");
    Ok(())
}
