use clap::{Parser, Subcommand};
use env_logger::Env;

mod components;
mod netlist;
mod nets;
mod streams;
mod trace;

#[derive(Parser)]
#[command(name = "xnet")]
#[command(about = "Connectivity queries over Altium and Cadence schematics", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true, hide = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a design into the universal netlist JSON
    #[command(alias = "n")]
    Netlist(netlist::NetlistArgs),

    /// List a design's nets with their pin counts
    Nets(nets::NetsArgs),

    /// List a design's components with their part data
    Components(components::ComponentsArgs),

    /// Trace the XNET reachable from a net or a pin
    #[command(alias = "t")]
    Trace(trace::TraceArgs),

    /// List the streams inside a compound-document schematic
    Streams(streams::StreamsArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger with default level depending on --debug (overridden by RUST_LOG)
    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("error")
    };
    env_logger::Builder::from_env(env).init();

    match cli.command {
        Commands::Netlist(args) => netlist::execute(args),
        Commands::Nets(args) => nets::execute(args),
        Commands::Components(args) => components::execute(args),
        Commands::Trace(args) => trace::execute(args),
        Commands::Streams(args) => streams::execute(args),
    }
}
