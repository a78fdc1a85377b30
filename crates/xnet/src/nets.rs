use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

#[derive(Args, Debug)]
pub struct NetsArgs {
    /// Design file (.SchDoc, .PrjPcb, .dsn or .cpm)
    pub design: PathBuf,

    /// Only show nets whose name contains this substring (case-insensitive)
    #[arg(short, long)]
    pub filter: Option<String>,
}

pub fn execute(args: NetsArgs) -> Result<()> {
    let netlist = xnet_eda::parse_design(&args.design)
        .with_context(|| format!("Failed to decode {}", args.design.display()))?;

    let needle = args.filter.as_deref().map(str::to_lowercase);
    let mut names: Vec<&String> = netlist
        .nets
        .keys()
        .filter(|name| match &needle {
            Some(needle) => name.to_lowercase().contains(needle),
            None => true,
        })
        .collect();
    names.sort_by(|a, b| natord::compare(a.as_str(), b.as_str()));

    for name in names {
        let pin_count: usize = netlist.nets[name].values().map(Vec::len).sum();
        println!("{name}\t{pin_count}");
    }
    Ok(())
}
