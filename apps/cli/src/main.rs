mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vidup_api::{ApiClient, PlaylistClient, VideoUploader};
use vidup_library::scan_videos;
use vidup_publish::{
    FailurePolicy, PrivacyStatus, PublishEvent, PublishOrchestrator, PublishReport, VideoOutcome,
};

use config::Config;

/// Default log filter when `RUST_LOG` is unset. Library crates log under
/// their own targets, so each is listed.
const DEFAULT_LOG_FILTER: &str = "info,vidup=debug,vidup_resumable=debug,vidup_transfer=debug,\
vidup_library=debug,vidup_publish=debug,vidup_api=debug";

/// Upload every video under a folder that has a `<name>.txt` sidecar,
/// and add the uploads to one playlist.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Folder to scan recursively.
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Config file (defaults to ~/.config/vidup/config.json).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[arg(long, env = "VIDUP_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Playlist title to upload into.
    #[arg(long)]
    collection: Option<String>,

    /// public, private or unlisted.
    #[arg(long)]
    privacy: Option<PrivacyStatus>,

    /// Bytes per request, rounded down to 256 KiB. 0 sends whole files.
    #[arg(long)]
    chunk_size: Option<u64>,

    /// continue or abort after a failed upload.
    #[arg(long)]
    on_failure: Option<FailurePolicy>,

    /// List what would be uploaded and exit.
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(token) = &self.access_token {
            config.access_token = token.clone();
        }
        if let Some(title) = &self.collection {
            config.collection_title = title.clone();
        }
        if let Some(privacy) = self.privacy {
            config.privacy_status = privacy;
        }
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(policy) = self.on_failure {
            config.on_failure = policy;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);

    let videos = scan_videos(&args.root)?;
    info!(root = %args.root.display(), count = videos.len(), "scan complete");

    if args.dry_run {
        for video in &videos {
            println!("{}\t{}", video.video_path.display(), video.title());
        }
        return Ok(());
    }
    if videos.is_empty() {
        info!("nothing to upload");
        return Ok(());
    }
    if config.access_token.is_empty() {
        anyhow::bail!("no access token: set access_token in the config file or VIDUP_ACCESS_TOKEN");
    }

    let client = ApiClient::new(&config.access_token, config.client_options())?;
    let uploader = VideoUploader::new(client.clone(), config.chunk_size());
    let playlists = PlaylistClient::new(client);

    let mut orchestrator = PublishOrchestrator::new(config.publish_config(), config.retry_policy());
    let printer = orchestrator.take_events().map(|mut events| {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                print_event(&event);
            }
        })
    });

    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping after the current step");
            cancel.cancel();
        }
    });

    let report = orchestrator.publish(&videos, &uploader, &playlists).await?;
    // Closes the event channel so the printer drains and exits.
    drop(orchestrator);
    if let Some(printer) = printer {
        let _ = printer.await;
    }
    print_summary(&report);

    if report.failed() > 0 || report.skipped() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_event(event: &PublishEvent) {
    match event {
        PublishEvent::Started { video, title } => {
            println!("uploading {} ({title})", video.display());
        }
        PublishEvent::Progress {
            bytes_sent,
            total_bytes,
            ..
        } => println!("  {bytes_sent}/{total_bytes} bytes"),
        PublishEvent::Retrying {
            attempt,
            delay,
            error,
            ..
        } => println!(
            "  retry {attempt} in {:.1}s after: {error}",
            delay.as_secs_f64()
        ),
        PublishEvent::Uploaded { item_id, .. } => println!("  uploaded as {item_id}"),
        PublishEvent::Attached { collection_id, .. } => {
            println!("  added to playlist {collection_id}");
        }
        PublishEvent::AttachFailed { error, .. } => println!("  not added to playlist: {error}"),
        PublishEvent::Failed { error, .. } => println!("  failed: {error}"),
        PublishEvent::Skipped { video, reason } => {
            println!("skipped {}: {reason}", video.display());
        }
    }
}

fn print_summary(report: &PublishReport) {
    println!();
    println!(
        "{} uploaded, {} failed, {} skipped (playlist {})",
        report.uploaded(),
        report.failed(),
        report.skipped(),
        report.collection_id
    );
    for result in &report.results {
        if let VideoOutcome::Uploaded {
            attach_error: Some(error),
            item_id,
        } = &result.outcome
        {
            println!("  {item_id} ({}) not in playlist: {error}", result.title);
        }
    }
}
