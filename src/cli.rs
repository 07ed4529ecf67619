use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::filter::FilterSelection;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Build irrigation project dashboards from spreadsheets and CSV files",
    long_about = None
)]
pub struct Cli {
    /// Dashboard configuration YAML (defaults to the built-in presets)
    #[arg(long, global = true, env = "IRRIGATION_DASHBOARD_CONFIG")]
    pub config: Option<PathBuf>,
    /// Directory that relative source paths resolve against
    #[arg(long = "data-dir", global = true, env = "IRRIGATION_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the configured dashboards
    Datasets,
    /// Print the effective configuration as YAML
    Config(ConfigArgs),
    /// Write the full render bundle for one dashboard as JSON
    Dashboard(DashboardArgs),
    /// Print summary statistics for one dashboard
    Stats(StatsArgs),
    /// Print the map points for one dashboard
    Map(MapArgs),
    /// Preview cleaned rows in a formatted table
    Preview(PreviewArgs),
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Write the YAML to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Keep rows whose dam type contains this text (case-insensitive, `all` disables)
    #[arg(long = "dam-type")]
    pub dam_type: Option<String>,
    /// Dam length range: 0-1000, 1000-2000, 2000+ or all
    #[arg(long = "dam-length")]
    pub dam_length: Option<String>,
}

impl FilterArgs {
    pub fn selection(&self) -> FilterSelection {
        FilterSelection {
            dam_type: self.dam_type.clone(),
            dam_length: self.dam_length.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct DashboardArgs {
    /// Dataset id (see `datasets`)
    pub dataset: String,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Write JSON to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Pretty-print the JSON
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Dataset id (see `datasets`)
    pub dataset: String,
    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Debug, Args)]
pub struct MapArgs {
    /// Dataset id (see `datasets`)
    pub dataset: String,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// List rows left off the map, with the reason, instead of the points
    #[arg(long)]
    pub excluded: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Dataset id (see `datasets`)
    pub dataset: String,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}
