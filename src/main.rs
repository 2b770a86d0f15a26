mod cli;

use anyhow::{bail, Context};
use chrono::Local;
use clap::Parser;
use clip_sync::config::AppConfig;
use clip_sync::logging;
use clip_sync::model::{Course, SemesterKind};
use clip_sync::remote::{HttpDownloader, ManifestRemote, RemoteIndex, RetryPolicy};
use clip_sync::sync::status::{handle_status, StatusMessage, StatusSender};
use clip_sync::sync::{courses_for_year, RunReport, SyncEngine, SyncStats};
use clip_sync::utils::prompt_confirm;
use cli::{BatchArgs, Cli, Commands, SingleArgs};
use colored::*;
use dotenv::dotenv;
use indicatif::HumanBytes;
use std::fs;
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use tracing::{debug, error, info};

fn main() {
    dotenv().ok();

    let args = Cli::parse();

    let mut config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading configuration: {}", err);
            std::process::exit(2);
        }
    };
    if let Some(path) = &args.path {
        config.root_path = path.clone();
    }
    if let Some(manifest) = &args.manifest {
        config.manifest = Some(manifest.clone());
    }

    let _guard = logging::init_logger(args.debug, config.log_file.as_deref());

    let result = match args.command {
        Some(Commands::PrintConfig) => print_config(&config),
        Some(Commands::Single(single)) => run_single(&config, single),
        Some(Commands::Batch(batch)) => run_batch(&config, batch),
        None => run_batch(&config, BatchArgs::default()),
    };

    if let Err(err) = result {
        error!("{:#}", err);
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}

fn print_config(config: &AppConfig) -> anyhow::Result<()> {
    let toml = config.to_toml().context("Could not serialize configuration")?;
    println!("{}", toml);
    Ok(())
}

fn run_batch(config: &AppConfig, args: BatchArgs) -> anyhow::Result<()> {
    let remote = open_remote(config)?;
    let (year, courses) = courses_for_year(remote.as_ref(), args.year)?;
    println!(
        "Syncing {} courses of {} into {}",
        courses.len().to_string().bold(),
        year,
        config.root_path.display()
    );
    sync(config, remote, courses)
}

fn run_single(config: &AppConfig, args: SingleArgs) -> anyhow::Result<()> {
    let remote = open_remote(config)?;
    let kind = if args.trimester {
        SemesterKind::Trimester
    } else {
        SemesterKind::Semester
    };
    let course = remote.find_course(args.id, args.year, args.semester, kind)?;
    info!("Syncing {}", course);
    sync(config, remote, vec![course])
}

fn open_remote(config: &AppConfig) -> anyhow::Result<Arc<dyn RemoteIndex>> {
    let Some(source) = config.manifest.as_deref() else {
        bail!("No manifest configured, use --manifest or set `manifest` in Config.toml");
    };
    let remote = ManifestRemote::load(source, config.request_timeout())
        .with_context(|| format!("Could not read manifest '{}'", source))?;
    Ok(Arc::new(remote))
}

fn ensure_root(root: &Path) -> anyhow::Result<()> {
    if root.is_dir() {
        return Ok(());
    }
    if root.exists() {
        bail!("'{}' is not a directory", root.display());
    }
    let prompt = format!("'{}' does not exist. Create it?", root.display());
    if !prompt_confirm(&prompt, Some(true))? {
        bail!("Root directory '{}' does not exist", root.display());
    }
    fs::create_dir_all(root).with_context(|| format!("Could not create '{}'", root.display()))?;
    Ok(())
}

fn sync(config: &AppConfig, remote: Arc<dyn RemoteIndex>, courses: Vec<Course>) -> anyhow::Result<()> {
    ensure_root(&config.root_path)?;
    let run_start_time = Local::now();

    let retry = RetryPolicy {
        attempts: config.download_retries.max(1),
        backoff: config.retry_backoff(),
    };
    let downloader = Arc::new(HttpDownloader::new(config.request_timeout(), retry)?);

    let (tx, rx) = mpsc::channel::<StatusMessage>();
    let status_thread = thread::spawn(move || handle_status(rx));

    // the receiver ends once the last clone of this closure is dropped
    let tx = Mutex::new(tx);
    let tx_status: StatusSender = Arc::new(move |msg: StatusMessage| {
        if let Ok(tx) = tx.lock() {
            let _ = tx.send(msg);
        }
    });

    let report = {
        let engine = SyncEngine::new(
            remote,
            downloader,
            config.root_path.clone(),
            config.scan_threads,
            config.download_threads,
            tx_status,
        )?;
        engine.run(courses)
    };

    if status_thread.join().is_err() {
        debug!("Status thread panicked");
    }

    print_summary(&report);

    let stats = SyncStats::from_report(&report, run_start_time);
    stats.print();
    if let Some(csv) = &config.stats_csv {
        stats
            .write_csv(csv)
            .with_context(|| format!("Could not write stats to '{}'", csv.display()))?;
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    let folders = report.downloaded_folders();
    if folders.is_empty() {
        println!("{}", "Everything is up to date".green());
    } else {
        println!("Updated folders:");
        for folder in &folders {
            println!("  {}", folder.display());
        }
        let secs = report.timer.get_elapsed().as_secs_f64();
        if secs > 0.0 {
            println!(
                "Downloaded {} at {}/s",
                HumanBytes(report.downloaded_size()),
                HumanBytes((report.downloaded_size() as f64 / secs) as u64)
            );
        }
    }

    for course in &report.courses {
        if let Some(reason) = &course.skip_reason {
            println!("{} {}: {}", "Skipped".yellow(), course.course, reason);
        }
        for failure in &course.failures {
            println!("{} {}: {}", "Failed".red(), failure.item, failure.cause);
        }
    }
    for failure in &report.commit.failed {
        println!(
            "{} cache record for {}: {}",
            "Failed".red(),
            failure.folder.display(),
            failure.cause
        );
    }
}
