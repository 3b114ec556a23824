#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "prioc")]
#[command(about = "Priority object siting over a hexagonal grid")]
pub struct CliConfig {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "prioc.toml")]
    pub config: PathBuf,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Log as JSON lines instead of the compact format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Cleaned and scored hexes for an object type
    Hexes {
        #[arg(long)]
        object_type: String,
        #[arg(long, default_value_t = 1)]
        territory_id: i64,
    },
    /// Contiguous hex clusters for an object type
    Clusters {
        #[arg(long)]
        object_type: String,
        #[arg(long, default_value_t = 1)]
        territory_id: i64,
    },
    /// Score a territory polygon (GeoJSON file, EPSG:4326) for every object type
    Territory {
        #[arg(long)]
        geometry: PathBuf,
        #[arg(long, default_value_t = 1)]
        territory_id: i64,
    },
    /// Re-check reference documents and the hex grid on the file server
    Refresh {
        /// Keep checking every N seconds
        #[arg(long)]
        interval: Option<u64>,
    },
}
