use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use music_file_tag_renamer as lib;
use lib::config::Config;
use lib::models::{ConflictPolicy, RenamePlan};
use lib::worker::BatchRequest;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber;
use tracing_subscriber::{fmt, EnvFilter};
use tracing_subscriber::prelude::*;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing::subscriber as tracing_subscriber_global;

#[derive(Parser)]
#[command(name = "music-file-tag-renamer", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the configured root music folder
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Override the configured rename template
    #[arg(long)]
    template: Option<String>,

    /// Override the configured conflict policy (overwrite|skip|suffix)
    #[arg(long)]
    policy: Option<ConflictPolicy>,

    /// Override the configured maximum filename length (characters)
    #[arg(long, value_name = "CHARS")]
    max_length: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List audio files discovered under the root folder
    Scan,
    /// Show the metadata extracted from each discovered file
    Tags {
        /// Emit machine-readable JSON instead of per-file lines
        #[arg(long)]
        json: bool,
    },
    /// Compute renames without touching the filesystem
    Preview {
        /// Write the emitted progress messages to a plain-text file
        #[arg(long, value_name = "FILE")]
        export_log: Option<PathBuf>,
    },
    /// Apply renames (a dry_run config still simulates)
    Rename {
        /// Write the emitted progress messages to a plain-text file
        #[arg(long, value_name = "FILE")]
        export_log: Option<PathBuf>,
    },
    /// Validate config file and exit
    ConfigValidate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Resolve config path: explicit --config overrides; otherwise prefer the
    // per-user config directory and fall back to the repository example
    // config for local/dev usage.
    let resolved_config_path: PathBuf = match &cli.config {
        Some(p) => p.clone(),
        None => {
            let user_path = dirs::config_dir()
                .map(|d| d.join("music-file-tag-renamer").join("config.toml"));
            match user_path {
                Some(p) if p.exists() => p,
                _ => PathBuf::from("config/example-config.toml"),
            }
        }
    };

    let mut cfg = Config::from_path(&resolved_config_path)
        .with_context(|| format!("loading config from {}", resolved_config_path.display()))?;
    if let Some(root) = &cli.root {
        cfg.root_folder = root.clone();
    }
    if let Some(template) = &cli.template {
        cfg.template = template.clone();
    }
    if let Some(policy) = cli.policy {
        cfg.conflict_policy = policy;
    }
    if let Some(cap) = cli.max_length {
        cfg.max_filename_length = Some(cap);
    }

    // Initialize log->tracing bridge and structured logging.
    // Logs go to both stdout and a daily-rotated file in cfg.log_dir.
    let _ = LogTracer::init();
    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(&cfg.log_dir, "tag-renamer.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer().with_writer(non_blocking);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer);

    // Install as global default tracing subscriber without triggering
    // tracing-subscriber's internal log bridge (we already call LogTracer).
    tracing_subscriber_global::set_global_default(subscriber)
        .expect("failed to set global tracing subscriber");

    match cli.command {
        Commands::Scan => {
            cfg.validate()?;
            let files = lib::scan::scan_directory(&cfg.root_folder, &cfg.file_extensions);
            println!(
                "Found {} audio file(s) under {}:",
                files.len(),
                cfg.root_folder.display()
            );
            for f in &files {
                println!("- {}", f.display());
            }
        }
        Commands::Tags { json } => {
            cfg.validate()?;
            let files = lib::scan::scan_directory(&cfg.root_folder, &cfg.file_extensions);
            if json {
                let records: Vec<serde_json::Value> = files
                    .iter()
                    .map(|f| {
                        let metadata = lib::tags::extract(f);
                        serde_json::json!({
                            "path": f.display().to_string(),
                            "metadata": metadata,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                println!("Tags for {} file(s):", files.len());
                for f in &files {
                    let m = lib::tags::extract(f);
                    println!(
                        "- {} | title: {} | artist: {} | album: {} | track: {} | year: {} | genre: {}",
                        f.display(),
                        m.title,
                        m.artist,
                        m.album,
                        m.track,
                        m.year,
                        m.genre
                    );
                }
            }
        }
        Commands::Preview { export_log } => {
            run_batch(&cfg, true, export_log.as_deref()).await?;
        }
        Commands::Rename { export_log } => {
            run_batch(&cfg, false, export_log.as_deref()).await?;
        }
        Commands::ConfigValidate => {
            match Config::from_path(resolved_config_path.as_path()).and_then(|c| c.validate()) {
                Ok(_) => println!("OK"),
                Err(e) => {
                    eprintln!("Config validation failed: {}", e);
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}

/// Scan the root, run the batch on the background worker, stream progress to
/// the terminal, and honor Ctrl-C as a cooperative cancellation request.
async fn run_batch(cfg: &Config, force_dry_run: bool, export_log: Option<&Path>) -> Result<()> {
    cfg.validate()?;
    let files = lib::scan::scan_directory(&cfg.root_folder, &cfg.file_extensions);
    if files.is_empty() {
        println!(
            "No matching audio files found under {}",
            cfg.root_folder.display()
        );
        return Ok(());
    }

    let mut request = BatchRequest::from_config(cfg, files);
    if force_dry_run {
        request.dry_run = true;
    }
    let mode = if request.dry_run { "preview" } else { "rename" };
    println!("Starting {} of {} file(s)...", mode, request.files.len());

    let mut batch = lib::worker::spawn_batch(request);
    let mut report: Vec<String> = Vec::new();

    loop {
        tokio::select! {
            event = batch.events.recv() => match event {
                Some(ev) => {
                    let line = format!("[{}/{}] {}: {}", ev.index, ev.total, ev.display_name, ev.status);
                    println!("{}", line);
                    report.push(stamped(&line));
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Cancellation requested; finishing the current file...");
                batch.cancel.request();
            }
        }
    }

    // The event channel closes when the worker returns; give the join a
    // bounded grace period so shutdown never hangs past a file boundary.
    let plan: RenamePlan = match tokio::time::timeout(Duration::from_secs(5), batch.handle).await {
        Ok(joined) => joined.with_context(|| "joining batch worker".to_string())?,
        Err(_) => anyhow::bail!("batch worker did not stop within 5s"),
    };

    let summary = format!(
        "{} complete. succeeded: {}, failed: {}",
        mode, plan.succeeded, plan.failed
    );
    println!("{}", summary);
    report.push(stamped(&summary));

    if let Some(path) = export_log {
        std::fs::write(path, report.join("\n") + "\n")
            .with_context(|| format!("writing log export to {}", path.display()))?;
        println!("Log written to {}", path.display());
    }

    Ok(())
}

fn stamped(line: &str) -> String {
    format!("[{}] {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"), line)
}
