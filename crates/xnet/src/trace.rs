use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use xnet_sch::{trace_from_net, trace_from_pin, TraceOptions};

#[derive(Args, Debug)]
pub struct TraceArgs {
    /// Design file (.SchDoc, .PrjPcb, .dsn or .cpm)
    pub design: PathBuf,

    /// Net name to trace from
    #[arg(long, required_unless_present = "pin", conflicts_with = "pin")]
    pub net: Option<String>,

    /// Pin to trace from, as REFDES.PIN (e.g. U1.7)
    #[arg(long)]
    pub pin: Option<String>,

    /// Refdes prefix to exclude from the result (repeatable)
    #[arg(long = "skip", value_name = "PREFIX")]
    pub skip: Vec<String>,

    /// Report do-not-stuff components instead of filtering them
    #[arg(long)]
    pub include_dns: bool,

    /// Pretty-print the JSON
    #[arg(long)]
    pub pretty: bool,
}

pub fn execute(args: TraceArgs) -> Result<()> {
    let netlist = xnet_eda::parse_design(&args.design)
        .with_context(|| format!("Failed to decode {}", args.design.display()))?;

    let opts = TraceOptions {
        skip_types: args.skip.clone(),
        include_dns: args.include_dns,
    };
    let outcome = match (&args.net, &args.pin) {
        (Some(net), None) => trace_from_net(&netlist, net, &opts),
        (None, Some(pin)) => trace_from_pin(&netlist, pin, &opts),
        _ => unreachable!("clap enforces exactly one starting point"),
    };

    match outcome {
        Ok(result) => {
            let json = if args.pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{json}");
            Ok(())
        }
        Err(err) => {
            // Query errors are part of the output contract, not crashes.
            println!("{}", json!({ "error": err.to_string() }));
            std::process::exit(1);
        }
    }
}
