use crate::config::Config;
use crate::connectivity::ConnectivityProbe;
use crate::env_file;
use crate::image_reference::ImageReference;
use crate::resolver::{self, UpdateDecision};
use crate::runtime::RuntimeClient;
use crate::switch::SwitchExecutor;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info, warn};

/// Terminal state of one polling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleOutcome {
    SkippedNoNetwork,
    PullFailed,
    NoUpdate,
    SwitchTriggered,
}

/// Runs one complete update-check-and-switch cycle: connectivity probe, pull,
/// digest comparison and, on mismatch, env file update plus switch executor
/// invocation. Repetition is the scheduler's concern, not ours.
///
/// Network and pull failures end the cycle cleanly with their outcome. Env
/// file write and switch invocation failures are fatal and propagate, the
/// host's health after a failed cutover is an operational question.
pub async fn run_cycle<R, S, P>(
    config: &Config,
    runtime: &R,
    switcher: &S,
    probe: &P,
) -> Result<CycleOutcome>
where
    R: RuntimeClient,
    S: SwitchExecutor,
    P: ConnectivityProbe,
{
    let image =
        ImageReference::parse(&config.image).context("Invalid image reference in config")?;

    if !probe.is_reachable().await {
        warn!("No network connectivity, skipping update check");
        return Ok(CycleOutcome::SkippedNoNetwork);
    }

    info!("Pulling latest content for image {}", image);
    if let Err(e) = runtime.pull(&image).await {
        // Not retried within the cycle, the next scheduled run tries again
        error!("Failed to pull image {}: {:#}", image, e);
        return Ok(CycleOutcome::PullFailed);
    }

    let remote_digest = resolver::resolve_remote_digest(runtime, &image).await;
    let active_digest =
        resolver::resolve_active_digest(runtime, &config.container_name_prefix).await;

    match resolver::decide(remote_digest.as_ref(), active_digest.as_ref()) {
        UpdateDecision::NoUpdate => {
            info!(
                "Active instance already runs digest {}, nothing to do",
                remote_digest.as_ref().map(|d| d.as_str()).unwrap_or("?")
            );
            return Ok(CycleOutcome::NoUpdate);
        }
        UpdateDecision::UpdateAvailable => {
            info!(
                "Digest changed from {} to {}, triggering switchover to {}",
                active_digest.as_ref().map(|d| d.as_str()).unwrap_or("?"),
                remote_digest.as_ref().map(|d| d.as_str()).unwrap_or("?"),
                image
            );
        }
        UpdateDecision::Indeterminate => {
            warn!(
                "Could not resolve digests on both sides (remote: {:?}, active: {:?}), forcing switchover to {}",
                remote_digest, active_digest, image
            );
        }
    }

    // The switch executor learns the new reference only from the env file, so
    // the file must be fully rewritten before the invocation.
    env_file::replace_key(&config.env_file.path, &config.env_file.key, &image.to_string())
        .context("Failed to record new image reference in env file")?;

    switcher
        .switch()
        .await
        .context("Switch executor invocation failed")?;

    info!("Successfully triggered switchover to {}", image);
    Ok(CycleOutcome::SwitchTriggered)
}
