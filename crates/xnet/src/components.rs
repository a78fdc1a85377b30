use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

#[derive(Args, Debug)]
pub struct ComponentsArgs {
    /// Design file (.SchDoc, .PrjPcb, .dsn or .cpm)
    pub design: PathBuf,

    /// Only show components whose refdes starts with this prefix
    /// (case-insensitive)
    #[arg(short, long)]
    pub prefix: Option<String>,
}

pub fn execute(args: ComponentsArgs) -> Result<()> {
    let netlist = xnet_eda::parse_design(&args.design)
        .with_context(|| format!("Failed to decode {}", args.design.display()))?;

    let prefix = args.prefix.as_deref().map(str::to_uppercase);
    let mut refdes: Vec<&String> = netlist
        .components
        .keys()
        .filter(|r| match &prefix {
            Some(prefix) => r.starts_with(prefix.as_str()),
            None => true,
        })
        .collect();
    refdes.sort_by(|a, b| natord::compare(a.as_str(), b.as_str()));

    for r in refdes {
        let component = &netlist.components[r];
        let mpn = component.mpn.as_deref().unwrap_or("-");
        let value = component.value.as_deref().unwrap_or("-");
        let description = component.description.as_deref().unwrap_or("");
        println!("{r}\t{mpn}\t{value}\t{description}");
    }
    Ok(())
}
