use anyhow::{Context, Result};
use serde::Deserialize;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

use crate::image_reference::ImageReference;

/// Narrow view of the container runtime, substitutable by a fake in tests.
/// All operations are read-only except `pull`, which only mutates the local
/// image store.
pub trait RuntimeClient {
    async fn pull(&self, image: &ImageReference) -> Result<()>;
    /// Digest of a locally stored image, `None` when the image carries no
    /// repository digest metadata.
    async fn inspect_image(&self, image: &str) -> Result<Option<String>>;
    /// Names of running containers matching the prefix, newest first.
    async fn list_instances(&self, name_prefix: &str) -> Result<Vec<String>>;
    /// Immutable image ID (`sha256:...`) backing a running container. The
    /// reference the container was created from is useless here: after a pull
    /// the tag already points at the new content, only the ID still names
    /// what is actually running.
    async fn inspect_instance(&self, name: &str) -> Result<String>;
}

/// Runtime client that shells out to the `docker` CLI.
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new() -> Self {
        DockerCli {
            binary: "docker".to_string(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        debug!("Running {} {}", self.binary, args.join(" "));
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .with_context(|| format!("Failed to spawn {}", self.binary))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} {} exited with {}: {}",
                self.binary,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output)
    }
}

impl RuntimeClient for DockerCli {
    async fn pull(&self, image: &ImageReference) -> Result<()> {
        let reference = image.to_string();
        self.run(&["pull", &reference]).await?;
        Ok(())
    }

    async fn inspect_image(&self, image: &str) -> Result<Option<String>> {
        let output = self.run(&["image", "inspect", image]).await?;
        parse_image_digest(&output.stdout)
    }

    async fn list_instances(&self, name_prefix: &str) -> Result<Vec<String>> {
        // `docker ps` lists running containers newest-created first; the name
        // filter matches substrings, so re-check the prefix on our side.
        let filter = format!("name={}", name_prefix);
        let output = self
            .run(&["ps", "--filter", &filter, "--format", "{{.Names}}"])
            .await?;
        let names = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|name| name.starts_with(name_prefix))
            .map(str::to_string)
            .collect();
        Ok(names)
    }

    async fn inspect_instance(&self, name: &str) -> Result<String> {
        let output = self.run(&["container", "inspect", name]).await?;
        parse_container_image_id(&output.stdout)
    }
}

#[derive(Deserialize)]
struct ImageInspect {
    #[serde(rename = "RepoDigests", default)]
    repo_digests: Vec<String>,
}

#[derive(Deserialize)]
struct ContainerInspect {
    /// Top-level `Image` is the content-addressed ID, unlike `Config.Image`
    /// which is the mutable reference the container was created from.
    #[serde(rename = "Image")]
    image_id: String,
}

/// Extracts the `sha256:...` digest from `docker image inspect` JSON output.
/// Freshly built images that were never pushed or pulled have an empty
/// RepoDigests list; that is absence, not an error.
fn parse_image_digest(json: &[u8]) -> Result<Option<String>> {
    let inspects: Vec<ImageInspect> =
        serde_json::from_slice(json).context("Failed to parse docker image inspect output")?;
    let digest = inspects
        .first()
        .and_then(|inspect| inspect.repo_digests.first())
        .and_then(|repo_digest| repo_digest.split_once('@'))
        .map(|(_, digest)| digest.to_string());
    Ok(digest)
}

fn parse_container_image_id(json: &[u8]) -> Result<String> {
    let inspects: Vec<ContainerInspect> =
        serde_json::from_slice(json).context("Failed to parse docker container inspect output")?;
    inspects
        .into_iter()
        .next()
        .map(|inspect| inspect.image_id)
        .context("docker container inspect returned an empty result")
}
