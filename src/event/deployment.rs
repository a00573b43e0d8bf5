//! Resolution of the URL of the service under test

use url::Url;

use super::types::TriggerRequest;
use crate::common::{Error, Result};

/// Pick the URL the load test should target
///
/// The first local deployment URI wins, then the first public one. Only the
/// first entry of each list is considered.
pub fn resolve_service_url(request: &TriggerRequest) -> Result<Url> {
    let candidate = first_non_empty(&request.deployment_uris_local)
        .or_else(|| first_non_empty(&request.deployment_uris_public))
        .ok_or(Error::NoDeploymentUri)?;

    Url::parse(candidate).map_err(|source| Error::InvalidDeploymentUri {
        uri: candidate.to_string(),
        source,
    })
}

fn first_non_empty(uris: &[String]) -> Option<&str> {
    uris.first().map(String::as_str).filter(|uri| !uri.is_empty())
}
