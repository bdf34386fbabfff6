use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Configuration script to interpret
    pub script: PathBuf,
    /// Keyword registry (.json)
    pub registry: PathBuf,
    /// Output file for the document; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Emit single-line JSON
    #[arg(long)]
    pub compact: bool,
}
