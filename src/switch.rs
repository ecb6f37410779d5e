use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::info;

/// Boundary to the external process that performs the actual cutover (start
/// new container, stop old, update routing). The executor re-reads the env
/// file to learn the new image reference, the env file MUST therefore be fully
/// written before `switch` is called.
pub trait SwitchExecutor {
    async fn switch(&self) -> Result<()>;
}

pub struct ShellSwitchExecutor {
    command: String,
}

impl ShellSwitchExecutor {
    pub fn new(command: String) -> Self {
        ShellSwitchExecutor { command }
    }
}

impl SwitchExecutor for ShellSwitchExecutor {
    async fn switch(&self) -> Result<()> {
        info!("Invoking switch executor: {}", self.command);
        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .status()
            .await
            .with_context(|| format!("Failed to spawn switch executor: {}", self.command))?;

        if !status.success() {
            anyhow::bail!("Switch executor {} exited with {}", self.command, status);
        }
        Ok(())
    }
}
