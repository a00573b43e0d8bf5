//! Copies load-test resources from the resource store into a workspace

use std::path::{Path, PathBuf};

use super::{ResourceStore, ServiceScope};
use crate::common::{Error, Result};

/// Top-level namespace of load-test resources in the store
pub const RESOURCE_PREFIX: &str = "gatling";

/// Download every resource under the `gatling/` namespace into `workspace`
///
/// Files are written at their path relative to the namespace, so
/// `/gatling/user-files/simulations/Basic.scala` lands at
/// `<workspace>/user-files/simulations/Basic.scala`. Returns the number of
/// files written.
pub async fn sync_resources(
    store: &dyn ResourceStore,
    scope: &ServiceScope,
    workspace: &Path,
) -> Result<usize> {
    let uris = store.list_resources(scope).await?;

    let mut copied = 0;
    for uri in &uris {
        let Some(relative) = namespaced_path(uri)? else {
            continue;
        };

        tracing::info!("Found file: {}", uri);
        let content = store
            .get_resource(scope, uri)
            .await?
            .ok_or_else(|| Error::resource_store(uri, "listed resource not found"))?;

        let target = workspace.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::file_write(parent, e))?;
        }
        std::fs::write(&target, &content).map_err(|e| Error::file_write(&target, e))?;
        copied += 1;
    }

    tracing::debug!(listed = uris.len(), copied, "Resource sync complete");
    Ok(copied)
}

/// Path of `uri` relative to the load-test namespace
///
/// `Ok(None)` means the resource lives outside the namespace.
fn namespaced_path(uri: &str) -> Result<Option<PathBuf>> {
    let mut segments = uri.split('/').filter(|s| !s.is_empty());
    if segments.next() != Some(RESOURCE_PREFIX) {
        return Ok(None);
    }

    let rest: Vec<&str> = segments.collect();
    if rest.is_empty() {
        return Ok(None);
    }
    if rest.iter().any(|s| *s == ".." || *s == ".") {
        return Err(Error::InvalidResourcePath(uri.to_string()));
    }

    Ok(Some(rest.iter().collect()))
}
