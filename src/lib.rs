pub mod cli;
pub mod error;
pub mod model;
pub mod parser;
pub mod processor;
pub mod writer;

pub use error::ConfigurationError;
pub use model::{Document, Value};
pub use processor::{EntryRegistry, EntrySpec, interpret};

use anyhow::Context;
use clap::Parser;

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // 1. ── Load ───────────────────────────────────────────────────────
    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("Reading {}", args.script.display()))?;
    let json = std::fs::read_to_string(&args.registry)
        .with_context(|| format!("Reading {}", args.registry.display()))?;
    let registry = parser::load_registry_from_json(&json)
        .with_context(|| format!("Parsing registry {}", args.registry.display()))?;

    // 2. ── Interpret ──────────────────────────────────────────────────
    let document = processor::interpret(&script, &registry)
        .with_context(|| format!("Interpreting {}", args.script.display()))?;

    // 3. ── Write output ───────────────────────────────────────────────
    writer::json::emit(&document, args.output.as_deref(), !args.compact)
        .with_context(|| "Writing configuration document")?;

    Ok(())
}
