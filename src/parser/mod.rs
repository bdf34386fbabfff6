use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::processor::EntryRegistry;

/// Parse a registry JSON document into an `EntryRegistry`.
///
/// The file is expected to be a single object mapping each keyword to its
/// entry declaration, e.g.
///
/// ```json
/// { "web":  { "kind": "map", "allow_block": true },
///   "host": { "kind": "scalar", "require_parent": ["web"] } }
/// ```
///
/// Keywords are reported by name when their declaration is malformed.
pub fn load_registry_from_json(json: &str) -> Result<EntryRegistry> {
    // Grab the entire file as a dynamic value first.
    let root: Value = serde_json::from_str(json).context("registry is not valid JSON")?;

    let keywords = root
        .as_object()
        .ok_or_else(|| anyhow!("registry must be a JSON object of keyword declarations"))?;

    tracing::debug!(keywords = keywords.len(), "registry loaded");

    let mut registry = EntryRegistry::new();
    for (keyword, declaration) in keywords {
        let spec = serde_json::from_value(declaration.clone())
            .with_context(|| format!("invalid declaration for keyword `{keyword}`"))?;
        registry.insert(keyword.as_str(), spec);
    }

    Ok(registry)
}
