use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use log::debug;

#[derive(Args, Debug)]
pub struct NetlistArgs {
    /// Design file (.SchDoc, .PrjPcb, .dsn or .cpm)
    pub design: PathBuf,

    /// Write the JSON to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON
    #[arg(long)]
    pub pretty: bool,
}

pub fn execute(args: NetlistArgs) -> Result<()> {
    debug!("decoding {}", args.design.display());
    let netlist = xnet_eda::parse_design(&args.design)
        .with_context(|| format!("Failed to decode {}", args.design.display()))?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&netlist)?
    } else {
        serde_json::to_string(&netlist)?
    };

    match &args.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
