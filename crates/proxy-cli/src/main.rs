//! Proxy cache command line tool.

mod cli;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use proxy_cache::{is_full_range, ProxyDirs, ProxyManager, VideoProxyOptions};
use proxy_document::{filter_document, RewriteOutcome};
use proxy_jobs::{local_queue, ExecutorConfig, ProcessJobRunner};
use proxy_media::probe_media;
use proxy_models::{keys, Clip, ClipIdentity, ProxySettings, ProxyState, StoredHashIdentity};

use crate::cli::{Cli, Command};

fn init_tracing() {
    // Colored output for terminals, JSON for log collectors
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let mut settings = ProxySettings::from_env();
    if let Some(project) = cli.project {
        settings = settings.with_project_folder(project);
    }
    if let Some(folder) = cli.proxy_folder {
        settings = settings.with_proxy_folder(folder);
    }

    match cli.command {
        Command::Locate { hash, kind } => {
            let record = ProxyDirs::from_settings(&settings).locate(&ClipIdentity::new(hash), kind);
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Generate {
            resource,
            hash,
            image,
            scan_mode,
            aspect,
            no_probe,
        } => {
            let resource = resource
                .to_str()
                .context("Resource path is not valid UTF-8")?
                .to_string();
            let service = if image { "qimage" } else { "avformat" };
            let clip = Clip::with_resource(service, &resource);
            clip.set(keys::HASH, hash);

            let mut detected_scan = None;
            if !no_probe {
                match probe_media(&resource).await {
                    Ok(metadata) => {
                        metadata.apply_to(&clip);
                        detected_scan = Some(metadata.scan_mode());
                    }
                    Err(e) => warn!("Probe failed, rendering without metadata: {}", e),
                }
            }

            let config = ExecutorConfig::from_env();
            info!("Executor config: {:?}", config);
            let runner = ProcessJobRunner::new(&config);
            let (queue, executor) = local_queue(config, runner);
            let manager = ProxyManager::new(settings, StoredHashIdentity, queue);

            let record = manager
                .locate(&clip)
                .context("Clip has no identity or no matching proxy kind")?;
            match record.state {
                ProxyState::Ready => {
                    println!("{}", record.ready_path.display());
                    return Ok(());
                }
                ProxyState::Pending => {
                    bail!("A proxy is already pending at {}", record.pending_path.display());
                }
                ProxyState::Absent => {}
            }

            if image {
                manager.generate_image_proxy(&clip, false)?;
            } else {
                let options = VideoProxyOptions {
                    full_range: is_full_range(&clip),
                    scan_mode: scan_mode.or(detected_scan).unwrap_or_default(),
                    aspect_ratio: aspect,
                };
                manager.generate_video_proxy(&clip, &options, false)?;
            }
            // Closing the queue lets the executor finish once the job is done
            drop(manager);

            let reports = tokio::select! {
                reports = executor.run() => reports,
                _ = tokio::signal::ctrl_c() => {
                    bail!("Interrupted; the pending marker is left in place");
                }
            };

            println!("{}", serde_json::to_string_pretty(&reports)?);
            if let Some(failed) = reports.iter().find(|r| r.result.is_err()) {
                bail!("Proxy job {} failed", failed.job_id);
            }
        }
        Command::Rewrite { file, root } => match filter_document(&file, &root)? {
            RewriteOutcome::Rewritten(path) => println!("{}", path.display()),
            RewriteOutcome::Rejected(reason) => bail!("{} was not rewritten: {}", file.display(), reason),
        },
        Command::ClearPending { older_than } => {
            let older_than = older_than
                .map(Duration::from_secs)
                .unwrap_or_else(|| ExecutorConfig::from_env().job_timeout);
            let removed = ProxyDirs::from_settings(&settings).clear_pending(older_than)?;
            for path in &removed {
                println!("{}", path.display());
            }
            info!(removed = removed.len(), "Cleared pending markers");
        }
    }

    Ok(())
}
