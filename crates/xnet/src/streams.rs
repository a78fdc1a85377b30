use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use xnet_cfb::CompoundFile;

#[derive(Args, Debug)]
pub struct StreamsArgs {
    /// Compound-document schematic (.SchDoc)
    pub file: PathBuf,
}

pub fn execute(args: StreamsArgs) -> Result<()> {
    let container = CompoundFile::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    for name in container.stream_names() {
        println!("{name}");
    }
    Ok(())
}
