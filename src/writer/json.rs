//! Emit the configuration document as JSON.

use crate::model::Document;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

pub fn render(document: &Document, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(document)
    } else {
        serde_json::to_string(document)
    };
    text.context("serialising configuration document")
}

/// Writes to `out` when given, otherwise to stdout.
pub fn emit(document: &Document, out: Option<&Path>, pretty: bool) -> Result<()> {
    let mut text = render(document, pretty)?;
    text.push('\n');

    match out {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Writing {}", path.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .context("Writing to stdout")?;
        }
    }
    Ok(())
}
