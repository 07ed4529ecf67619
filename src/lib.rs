pub mod clean;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod filter;
pub mod frequency;
pub mod geo;
pub mod io_utils;
pub mod loader;
pub mod stats;
pub mod status;
pub mod table;

use std::{
    env, fs,
    io::{self, Write},
    path::Path,
    sync::OnceLock,
};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands},
    config::DashboardConfig,
    dashboard::MapOutput,
    geo::{PointOutcome, map_points},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("irrigation_dashboard", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    match cli.command {
        Commands::Datasets => handle_datasets(&config),
        Commands::Config(args) => handle_config(&config, &args),
        Commands::Dashboard(args) => handle_dashboard(&config, &args),
        Commands::Stats(args) => handle_stats(&config, &args),
        Commands::Map(args) => handle_map(&config, &args),
        Commands::Preview(args) => handle_preview(&config, &args),
    }
}

fn load_config(cli: &Cli) -> Result<DashboardConfig> {
    let mut config = DashboardConfig::load_or_builtin(cli.config.as_deref())
        .with_context(|| match &cli.config {
            Some(path) => format!("Loading dashboard config from {path:?}"),
            None => "Loading built-in dashboard config".to_string(),
        })?;
    if let Some(dir) = &cli.data_dir {
        debug!("Resolving source files against {dir:?}");
        config.data_dir = Some(dir.clone());
    }
    Ok(config)
}

fn handle_datasets(config: &DashboardConfig) -> Result<()> {
    let headers = vec![
        "id".to_string(),
        "title".to_string(),
        "source".to_string(),
        "filters".to_string(),
    ];
    let rows = config
        .datasets
        .iter()
        .map(|dataset| {
            vec![
                dataset.id.clone(),
                dataset.title.clone(),
                config.source_path(dataset).display().to_string(),
                if dataset.filters.is_some() { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

fn handle_config(config: &DashboardConfig, args: &cli::ConfigArgs) -> Result<()> {
    let yaml = config.to_yaml_string()?;
    write_output(args.output.as_deref(), &yaml)?;
    if let Some(path) = &args.output {
        info!(
            "Configuration for {} dataset(s) written to {path:?}",
            config.datasets.len()
        );
    }
    Ok(())
}

fn handle_dashboard(config: &DashboardConfig, args: &cli::DashboardArgs) -> Result<()> {
    let dataset = config.dataset(&args.dataset)?;
    info!("Building dashboard '{}'", dataset.id);
    let view = dashboard::build_view(config, dataset, &args.filters.selection())?;
    if let Some(message) = &view.error {
        warn!("Dashboard '{}' rendered in error state: {message}", dataset.id);
    }
    let json = if args.pretty {
        serde_json::to_string_pretty(&view)
    } else {
        serde_json::to_string(&view)
    }
    .context("Serializing dashboard view")?;
    write_output(args.output.as_deref(), &json)?;
    if let Some(path) = &args.output {
        info!(
            "Dashboard '{}' with {} project(s) written to {path:?}",
            dataset.id,
            view.projects.len()
        );
    }
    Ok(())
}

fn handle_stats(config: &DashboardConfig, args: &cli::StatsArgs) -> Result<()> {
    let dataset = config.dataset(&args.dataset)?;
    let view = dashboard::build_view(config, dataset, &args.filters.selection())?;
    if let Some(message) = view.error {
        return Err(anyhow!(message));
    }
    if let MapOutput::Placeholder { message } = &view.map {
        warn!("{}: {message}", dataset.id);
    }
    let headers = vec!["metric".to_string(), "value".to_string()];
    table::print_table(&headers, &view.stats.render_rows());
    info!(
        "Computed statistics for {} project(s) in '{}'",
        view.stats.total_projects, dataset.id
    );
    Ok(())
}

fn handle_map(config: &DashboardConfig, args: &cli::MapArgs) -> Result<()> {
    let dataset = config.dataset(&args.dataset)?;
    let conditions = args.filters.selection().parse()?;
    let prepared = dashboard::prepare(config, dataset, conditions)
        .with_context(|| format!("Preparing dataset '{}'", dataset.id))?;
    let outcomes = dashboard::point_outcomes(dataset, &prepared);

    if args.excluded {
        let headers = vec!["row".to_string(), "reason".to_string()];
        let rows = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                PointOutcome::Excluded { id, reason } => Some(vec![id.to_string(), reason.to_string()]),
                PointOutcome::Included(_) => None,
            })
            .collect::<Vec<_>>();
        table::print_table(&headers, &rows);
        info!("{} row(s) excluded from the map", rows.len());
        return Ok(());
    }

    let headers = ["row", "latitude", "longitude", "status", "color", "name"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let points = map_points(&outcomes);
    let rows = points
        .iter()
        .map(|point| {
            vec![
                point.id.to_string(),
                point.point.latitude.to_string(),
                point.point.longitude.to_string(),
                point.status.to_string(),
                point.color.clone(),
                point.name.clone(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    info!(
        "{} of {} row(s) placed on the map",
        points.len(),
        outcomes.len()
    );
    Ok(())
}

fn handle_preview(config: &DashboardConfig, args: &cli::PreviewArgs) -> Result<()> {
    let dataset = config.dataset(&args.dataset)?;
    let prepared = dashboard::prepare(config, dataset, Vec::new())
        .with_context(|| format!("Preparing dataset '{}'", dataset.id))?;
    let cleaned = &prepared.table;
    let rows = cleaned
        .records
        .iter()
        .take(args.rows)
        .map(|record| record.cells.iter().map(|cell| cell.as_display()).collect())
        .collect::<Vec<Vec<String>>>();
    table::print_table(&cleaned.columns, &rows);
    info!(
        "Displayed {} of {} row(s) from '{}'",
        rows.len(),
        cleaned.len(),
        dataset.id
    );
    Ok(())
}

fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, format!("{contents}\n"))
                .with_context(|| format!("Writing output to {path:?}"))
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{contents}").context("Writing to stdout")
        }
    }
}
