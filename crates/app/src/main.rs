mod cli;
mod error;
mod manifest;

use std::path::Path;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;

use services::logging::init_tracing;
use services::{AppConfig, AppContext, Clock, Report};
use translate_core::model::WorkUnitId;

use crate::cli::{Cli, Command, Format};
use crate::error::AppError;

fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:"
        || trimmed.starts_with("sqlite://")
        || trimmed.starts_with("sqlite:file:")
    {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Storage creates the database file but not its directory.
fn ensure_db_dir(db_url: &str) -> Result<(), AppError> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        // In-memory and `sqlite:file:` URLs need no directory on disk.
        return if db_url.starts_with("sqlite:") {
            Ok(())
        } else {
            Err(AppError::InvalidDbUrl {
                raw: db_url.to_string(),
            })
        };
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(AppError::InvalidDbUrl {
            raw: db_url.to_string(),
        });
    }

    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(AppError::io(parent))
        }
        _ => Ok(()),
    }
}

fn print_report(report: &Report, format: Format) -> Result<(), AppError> {
    match format {
        Format::Text => print!("{}", report.render_text()),
        Format::Html => println!("{}", report.render_html()),
        Format::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

fn write_output(out: Option<&Path>, contents: &str) -> Result<(), AppError> {
    match out {
        Some(path) => std::fs::write(path, contents).map_err(AppError::io(path)),
        None => {
            print!("{contents}");
            Ok(())
        }
    }
}

fn write_manifest(
    config: &AppConfig,
    inputs: &Path,
    done_files: &Path,
    out: Option<&Path>,
) -> Result<(), AppError> {
    let names = manifest::list_file_names(inputs)?;
    let done = manifest::read_done_files(done_files)?;
    let generated = manifest::build_manifest(
        names,
        &manifest::manifest_prefix(inputs),
        &done,
        Clock::default_clock().now(),
    );
    if generated.files.is_empty() {
        tracing::warn!(dir = %inputs.display(), "no unfinished CSV files found");
    }

    let target = out.unwrap_or(config.manifest_path.as_path());
    let json = generated.to_json_pretty()?;
    std::fs::write(target, format!("{json}\n")).map_err(AppError::io(target))?;
    println!(
        "Manifest written to {} with {} file(s).",
        target.display(),
        generated.files.len()
    );
    Ok(())
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_url = db;
    }
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = Some(endpoint);
    }
    if let Some(manifest) = cli.manifest {
        config.manifest_path = manifest;
    }
    config.db_url = normalize_sqlite_url(config.db_url);

    // Manifest generation only touches the filesystem.
    if let Command::Manifest {
        inputs,
        done_files,
        out,
    } = &cli.command
    {
        return write_manifest(&config, inputs, done_files, out.as_deref());
    }

    ensure_db_dir(&config.db_url)?;
    let ctx = AppContext::new_sqlite(config, Clock::default_clock()).await?;

    match cli.command {
        Command::Select { seed } => {
            let catalog = ctx.load_catalog()?;
            let unit = match seed {
                Some(seed) => {
                    let mut rng = StdRng::seed_from_u64(seed);
                    ctx.selector().select_unit_with(&catalog, &mut rng).await?
                }
                None => ctx.selector().select_unit(&catalog).await?,
            };
            println!("{unit}");
        }
        Command::Record {
            unit,
            total,
            completed,
        } => {
            let unit = WorkUnitId::new(unit)?;
            let record = ctx.progress().record_progress(&unit, total, completed).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Progress { format } => {
            let summary = ctx.progress().summary().await?;
            print_report(&Report::from_local(&summary, ctx.clock().now()), format)?;
        }
        Command::Clear => {
            ctx.progress().clear().await?;
            println!("Local progress cleared.");
        }
        Command::Stats {
            refresh,
            catalog,
            format,
        } => {
            let mut dashboard = ctx.dashboard()?;
            if catalog {
                dashboard = dashboard.with_catalog(ctx.load_catalog()?);
            }
            let view = dashboard.refresh(refresh).await;
            if let Some(err) = &view.error {
                eprintln!("warning: remote stats unavailable, showing last known numbers: {err}");
            }
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&view)?),
                other => print_report(&Report::from_stats(&view.stats, ctx.clock().now()), other)?,
            }
        }
        Command::Report { format } => {
            let report = ctx.aggregator()?.render_report().await?;
            print_report(&report, format)?;
        }
        Command::DoneFiles { threshold, out } => {
            let done = ctx.aggregator()?.units_with_at_least(threshold).await?;
            let mut listing = String::new();
            for unit in &done {
                listing.push_str(unit.unit.file_name());
                listing.push('\n');
            }
            write_output(out.as_deref(), &listing)?;
            tracing::info!(units = done.len(), threshold, "listed done files");
        }
        Command::Manifest { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing("info");
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
