//! Writes the service's OpenAPI document, for client generation and review.

use anyhow::Context;
use clap::Parser;
use cowriter_interaction::router::write_openapi;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "openapi", about = "Write the interaction service OpenAPI document")]
struct Args {
    /// Destination of the JSON document.
    #[arg(short, long, default_value = "openapi.json")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    write_openapi(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("OpenAPI document written to {}", args.output.display());
    Ok(())
}
