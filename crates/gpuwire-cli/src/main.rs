use clap::{Parser, Subcommand};
use tracing::info;

use gpuwire_core::config::{default_config_path, WireConfig};
use gpuwire_protocol::commands::ReturnCommand;
use gpuwire_protocol::wire;

#[derive(Parser)]
#[command(name = "gpuwire")]
#[command(about = "gpuwire - inspect the GPU wire server's return stream")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every return command in a captured outgoing stream
    Decode {
        /// File holding the raw frames, as written by the transport
        file: String,

        /// Emit one JSON object per command instead of debug output
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        /// Configuration file path (defaults to the platform search path)
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    gpuwire_common::logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decode { file, json } => {
            let bytes = std::fs::read(&file)?;
            let commands = wire::decode_stream(&bytes)?;
            info!("decoded {} return command(s) from {}", commands.len(), file);

            for (i, cmd) in commands.iter().enumerate() {
                if json {
                    println!("{}", serde_json::to_string(cmd)?);
                } else {
                    println!("{:>5}  {}", i, describe(cmd));
                }
            }
        }

        Commands::Config { config } => {
            let path = config.unwrap_or_else(default_config_path);
            let config = WireConfig::load_or_default(&path);
            info!("effective configuration from {}", path);
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn describe(cmd: &ReturnCommand) -> String {
    match cmd.request_serial() {
        Some(serial) => format!("{} {}  {:?}", cmd.name(), serial, cmd),
        None => format!("{}  {:?}", cmd.name(), cmd),
    }
}
