use restform_core::CatalogEntry;

use crate::config::ProviderConfig;
use crate::error::EngineError;

/// Base URL for `entry`, first match wins:
/// per-resource `base_url` override, `x-restform-base-url` binding,
/// regional host template, provider `base_url`, document server.
pub fn base_url(
    entry: &CatalogEntry,
    config: &ProviderConfig,
    document_default: Option<&str>,
) -> Result<String, EngineError> {
    let overrides = config.resource(entry.name());
    if let Some(url) = overrides.and_then(|o| o.base_url.as_ref()) {
        return Ok(url.clone());
    }
    if let Some(url) = &entry.binding.base_url {
        return Ok(url.clone());
    }

    if let Some(host) = &entry.binding.host_template {
        let regions = &entry.binding.regions;
        let region = overrides
            .and_then(|o| o.region.as_deref())
            .or(config.region.as_deref())
            .or(regions.first().map(String::as_str))
            .ok_or_else(|| {
                EngineError::config(format!(
                    "resource '{}' is regional; configure a region",
                    entry.name()
                ))
            })?;
        if !regions.is_empty() && !regions.iter().any(|r| r == region) {
            return Err(EngineError::config(format!(
                "region '{region}' is not available for '{}' (allowed: {})",
                entry.name(),
                regions.join(", ")
            )));
        }
        return Ok(host.replace("${region}", region).replace("{region}", region));
    }

    config
        .base_url
        .clone()
        .or_else(|| document_default.map(str::to_string))
        .ok_or_else(|| {
            EngineError::config(format!(
                "no base URL for '{}': the document declares no server and none is configured",
                entry.name()
            ))
        })
}
