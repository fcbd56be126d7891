//! Lectern CLI — drives the video pipeline against the course backend.
//!
//! Set LECTERN_API_URL (or API_URL) and LECTERN_ACCESS_TOKEN (or
//! ACCESS_TOKEN). Uses bearer-token auth for every backend call.

use anyhow::Context;
use clap::{Parser, Subcommand};
use lectern_api_client::ApiClient;
use lectern_cli::{init_tracing, report};
use lectern_core::models::LessonVideoRef;
use lectern_core::PipelineConfig;
use lectern_playback::engine::AdaptiveClient;
use lectern_playback::hls::HlsManifestClient;
use lectern_playback::SignedPlaybackResolver;
use lectern_upload::coordinator::{DirectPartSink, UploadCoordinator, Validation};
use lectern_upload::probe::FfprobeInspector;
use lectern_upload::resume::JsonFileSessionStore;
use lectern_upload::retry::{RetryPolicy, RetryingSink};
use lectern_upload::transport::HttpPartTransport;
use lectern_upload::watcher::{EncodeState, EncodeWatcher, InMemoryLessonStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "lectern", about = "Course video pipeline CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe a local video and report whether it can be uploaded
    Validate {
        /// Path to the video file
        file: std::path::PathBuf,
    },
    /// Upload a video through the chunked multipart flow
    Upload {
        /// Path to the video file
        file: std::path::PathBuf,
        /// Title recorded on the backend
        #[arg(long)]
        title: Option<String>,
        /// Resume an interrupted upload of the same file if possible
        #[arg(long)]
        resume: bool,
    },
    /// Poll a video's encode status until it is ready or failed
    Watch {
        /// Backend video id
        video_id: String,
    },
    /// Bounded wait used before publishing a course
    WaitReady {
        /// Backend video id
        video_id: String,
        /// Give up after this many seconds
        #[arg(long, default_value = "60")]
        timeout_secs: u64,
    },
    /// Fetch a signed playback credential
    Sign {
        /// Backend video id
        video_id: String,
    },
    /// Resolve playback and print the discovered quality ladder
    Ladder {
        /// Backend video id
        video_id: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn build_coordinator(
    client: &ApiClient,
    config: &PipelineConfig,
) -> anyhow::Result<UploadCoordinator> {
    let api = Arc::new(client.clone());
    let transport = Arc::new(HttpPartTransport::new()?);
    let direct = Arc::new(DirectPartSink::new(api.clone(), transport));
    let sink = Arc::new(RetryingSink::new(
        direct,
        RetryPolicy::new(config.part_retry_max_attempts, config.part_retry_base_delay),
    ));
    let inspector = Arc::new(FfprobeInspector::new(config.ffprobe_path.clone())?);
    let store = Arc::new(JsonFileSessionStore::new(config.session_dir.clone())?);

    Ok(UploadCoordinator::new(api, sink, inspector, config.clone())
        .with_session_store(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = PipelineConfig::from_env().context(
        "Failed to load pipeline config. Set LECTERN_API_URL (or API_URL)",
    )?;
    let client = ApiClient::from_env().context(
        "Failed to create API client. Set LECTERN_ACCESS_TOKEN (or ACCESS_TOKEN)",
    )?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => {
            let coordinator = build_coordinator(&client, &config)?;
            match coordinator.validate(&file).await {
                Validation::Accepted(info) => print_json(&serde_json::json!({
                    "accepted": true,
                    "duration_secs": info.duration.as_secs_f64(),
                    "mime_type": info.mime_type,
                    "file_size": info.file_size,
                }))?,
                Validation::Rejected(reason) => print_json(&serde_json::json!({
                    "accepted": false,
                    "reason": reason,
                }))?,
            }
        }
        Commands::Upload {
            file,
            title,
            resume,
        } => {
            let coordinator = build_coordinator(&client, &config)?;
            let title = title.unwrap_or_else(|| {
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "Untitled video".to_string())
            });

            let mut progress = coordinator.progress();
            let reporter = tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    tracing::info!(progress = *progress.borrow(), "Uploading");
                }
            });

            let result = if resume {
                coordinator.resume(&file, &title).await
            } else {
                coordinator.upload(&file, &title).await
            };
            drop(coordinator);
            let _ = reporter.await;

            let video_id = match result {
                Ok(video_id) => video_id,
                Err(err) => {
                    report(&err);
                    let stage = err
                        .stage()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "validate".to_string());
                    anyhow::bail!("Upload failed at the {stage} stage");
                }
            };
            print_json(&serde_json::json!({
                "video_id": video_id,
                "status": "processing",
            }))?;
        }
        Commands::Watch { video_id } => {
            let lessons = Arc::new(InMemoryLessonStore::new());
            let lesson_id = Uuid::new_v4();
            lessons.insert(lesson_id, LessonVideoRef::uploaded(video_id.clone()));

            let watcher = EncodeWatcher::new(
                Arc::new(client.clone()),
                lessons.clone(),
                config.poll_interval,
            );
            let mut ticket = watcher.watch(&video_id, lesson_id);

            match ticket.terminal().await {
                EncodeState::Ready(url) => print_json(&serde_json::json!({
                    "status": "ready",
                    "manifest_url": url,
                }))?,
                EncodeState::Failed => print_json(&serde_json::json!({
                    "status": "failed",
                }))?,
                EncodeState::Processing => print_json(&serde_json::json!({
                    "status": "processing",
                }))?,
            }
        }
        Commands::WaitReady {
            video_id,
            timeout_secs,
        } => {
            let lessons = Arc::new(InMemoryLessonStore::new());
            let watcher =
                EncodeWatcher::new(Arc::new(client.clone()), lessons, config.poll_interval);

            match watcher
                .wait_for_ready(&video_id, Duration::from_secs(timeout_secs))
                .await?
            {
                Some(url) => print_json(&serde_json::json!({
                    "ready": true,
                    "manifest_url": url,
                }))?,
                None => print_json(&serde_json::json!({
                    "ready": false,
                    "status": "processing",
                }))?,
            }
        }
        Commands::Sign { video_id } => {
            let resolver = SignedPlaybackResolver::new(Arc::new(client.clone()));
            let access = match resolver.resolve(&video_id).await {
                Ok(access) => access,
                Err(err) => {
                    report(&err);
                    anyhow::bail!("Playback authorization failed for {video_id}");
                }
            };
            print_json(&serde_json::json!({
                "url": access.url,
                "custom_headers": access.custom_headers,
                "expires_in_secs": access.expires_in.as_secs(),
            }))?;
        }
        Commands::Ladder { video_id } => {
            let resolver = SignedPlaybackResolver::new(Arc::new(client.clone()));
            let access = resolver.resolve(&video_id).await?;

            let mut hls = HlsManifestClient::new()?;
            match hls.load(&access.url, &access.custom_headers).await {
                Ok(ladder) => print_json(&ladder)?,
                Err(err) => {
                    report(&err);
                    print_json(&serde_json::json!({
                        "playable": false,
                        "open_url": access.url,
                    }))?;
                    anyhow::bail!("Unable to play video {video_id}");
                }
            }
        }
    }

    Ok(())
}
