use crate::connectivity::HttpProbe;
use crate::runtime::DockerCli;
use crate::state::CycleStatus;
use crate::switch::ShellSwitchExecutor;
use std::env;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber;

mod config;
mod connectivity;
mod controller;
mod env_file;
mod image_reference;
mod resolver;
mod runtime;
mod state;
mod switch;
mod webserver;

#[cfg(target_env = "musl")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    info!("Starting docker-autorollout {}", env!("CARGO_PKG_VERSION"));

    let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Arc::new(config::load_config(&config_path)?);

    let runtime = Arc::new(DockerCli::new());
    let switcher = Arc::new(ShellSwitchExecutor::new(config.switch.command.clone()));
    let probe = Arc::new(HttpProbe::new(config.connectivity.clone())?);

    // One-shot mode for external schedulers (systemd timer, cron): run a
    // single cycle, exit non-zero on fatal failure.
    if env::args().any(|arg| arg == "--once") {
        let outcome =
            controller::run_cycle(&config, runtime.as_ref(), switcher.as_ref(), probe.as_ref())
                .await?;
        info!("Update cycle finished with outcome {:?}", outcome);
        return Ok(());
    }

    let status = CycleStatus::default();

    let cron_schedule = env::var("CRON_SCHEDULE").unwrap_or_else(|_| "0 */5 * * * *".to_string());
    info!("Executing job scheduler at cron schedule {}", cron_schedule);
    let mut scheduler = JobScheduler::new().await?;

    let job_config = config.clone();
    let job_runtime = runtime.clone();
    let job_switcher = switcher.clone();
    let job_probe = probe.clone();
    let job_status = status.clone();
    let job = Job::new_async(cron_schedule, move |_uuid, _l| {
        let config = job_config.clone();
        let runtime = job_runtime.clone();
        let switcher = job_switcher.clone();
        let probe = job_probe.clone();
        let status = job_status.clone();
        Box::pin(async move {
            match controller::run_cycle(
                &config,
                runtime.as_ref(),
                switcher.as_ref(),
                probe.as_ref(),
            )
            .await
            {
                Ok(outcome) => {
                    info!("Update cycle finished with outcome {:?}", outcome);
                    status.record(outcome).await;
                }
                Err(e) => error!("Error running update cycle: {:?}", e),
            }
        })
    })?;
    scheduler.add(job).await?;
    scheduler.start().await?;

    let shutdown = CancellationToken::new();
    let shutdown_trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            shutdown_trigger.cancel();
        }
    });

    let app = webserver::create_app(status);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], config.webserver.port));
    info!("Starting webserver on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    scheduler.shutdown().await?;
    info!("Shutdown complete");

    Ok(())
}
