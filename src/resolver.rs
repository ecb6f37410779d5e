use crate::image_reference::ImageReference;
use crate::runtime::RuntimeClient;
use std::fmt;
use tracing::{info, warn};

/// Content-addressed identifier of an image. Equality means byte-identical
/// image content; tags and timestamps carry no weight here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest(String);

impl Digest {
    pub fn new(value: impl Into<String>) -> Self {
        Digest(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDecision {
    NoUpdate,
    UpdateAvailable,
    /// At least one side could not be resolved. Equality of unknowns cannot
    /// be proven, so the controller treats this like an available update.
    Indeterminate,
}

pub fn decide(remote: Option<&Digest>, active: Option<&Digest>) -> UpdateDecision {
    match (remote, active) {
        (Some(remote), Some(active)) if remote == active => UpdateDecision::NoUpdate,
        (Some(_), Some(_)) => UpdateDecision::UpdateAvailable,
        _ => UpdateDecision::Indeterminate,
    }
}

/// Digest of the freshly pulled image. Absence (no digest metadata, inspect
/// failure) is logged and is a valid outcome, never fatal.
pub async fn resolve_remote_digest<R: RuntimeClient>(
    runtime: &R,
    image: &ImageReference,
) -> Option<Digest> {
    match runtime.inspect_image(&image.to_string()).await {
        Ok(Some(digest)) => Some(Digest::new(digest)),
        Ok(None) => {
            warn!("Image {} carries no digest metadata", image);
            None
        }
        Err(e) => {
            warn!("Failed to inspect image {}: {:#}", image, e);
            None
        }
    }
}

/// Digest of the image backing the newest running container matching the
/// name prefix, resolved through the container's immutable image ID so that
/// a tag moved by the pull in this very cycle cannot alias the answer.
/// Rediscovered from scratch every cycle; absence at any step means "first
/// deployment" or "unknown baseline".
pub async fn resolve_active_digest<R: RuntimeClient>(
    runtime: &R,
    name_prefix: &str,
) -> Option<Digest> {
    let instances = match runtime.list_instances(name_prefix).await {
        Ok(instances) => instances,
        Err(e) => {
            warn!("Failed to list running instances: {:#}", e);
            return None;
        }
    };

    let name = match instances.first() {
        Some(name) => name,
        None => {
            info!(
                "No running instance matches prefix {}, treating as first deployment",
                name_prefix
            );
            return None;
        }
    };
    if instances.len() > 1 {
        // Can happen mid-switch when old and new containers overlap briefly
        warn!(
            "{} running instances match prefix {}, treating newest ({}) as authoritative",
            instances.len(),
            name_prefix,
            name
        );
    }

    let image_id = match runtime.inspect_instance(name).await {
        Ok(image_id) => image_id,
        Err(e) => {
            warn!("Failed to inspect instance {}: {:#}", name, e);
            return None;
        }
    };

    match runtime.inspect_image(&image_id).await {
        Ok(Some(digest)) => Some(Digest::new(digest)),
        Ok(None) => {
            warn!(
                "Image {} of active instance {} carries no digest metadata",
                image_id, name
            );
            None
        }
        Err(e) => {
            warn!(
                "Failed to inspect image {} of instance {}: {:#}",
                image_id, name, e
            );
            None
        }
    }
}
