//! Publish orchestrator.
//!
//! Uploads videos one after another, attaches each to the collection,
//! reports progress events, and supports cancellation.

use std::path::Path;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vidup_library::VideoEntry;
use vidup_resumable::{ResumableUploadDriver, RetryPolicy, UploadEvent, UploadOutcome};

use crate::collection::CollectionClient;
use crate::error::PublishError;
use crate::target::UploadTarget;
use crate::types::{
    FailurePolicy, PublishConfig, PublishEvent, PublishReport, VideoOutcome, VideoResult,
};

/// Publishes a batch of videos to one collection.
pub struct PublishOrchestrator {
    config: PublishConfig,
    retry: RetryPolicy,
    events_tx: mpsc::Sender<PublishEvent>,
    events_rx: Option<mpsc::Receiver<PublishEvent>>,
    cancel: CancellationToken,
}

impl PublishOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(config: PublishConfig, retry: RetryPolicy) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            config,
            retry,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<PublishEvent>> {
        self.events_rx.take()
    }

    /// Returns a cancellation token for this run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Publishes `videos` in order.
    ///
    /// The collection is resolved once, before any upload; failing to
    /// resolve it is the only error returned. Per-video failures are
    /// recorded in the report and handled according to
    /// [`PublishConfig::on_failure`].
    pub async fn publish(
        &self,
        videos: &[VideoEntry],
        target: &dyn UploadTarget,
        collections: &dyn CollectionClient,
    ) -> Result<PublishReport, PublishError> {
        if self.cancel.is_cancelled() {
            return Err(PublishError::Cancelled);
        }

        let spec = &self.config.collection;
        let collection_id = collections.find_or_create(spec).await?;
        info!(collection = %spec.title, collection_id = %collection_id, "using collection");

        let driver = ResumableUploadDriver::new(self.retry.clone()).with_cancel(self.cancel.clone());

        let mut results = Vec::with_capacity(videos.len());
        let mut halted: Option<String> = None;

        for video in videos {
            if halted.is_none() && self.cancel.is_cancelled() {
                halted = Some("cancelled".into());
            }
            if let Some(reason) = &halted {
                results.push(self.skip(video, reason));
                continue;
            }

            let result = self
                .publish_one(video, target, collections, &collection_id, &driver)
                .await;

            if let VideoOutcome::Failed { error } = &result.outcome
                && self.config.on_failure == FailurePolicy::Abort
            {
                warn!(video = %video.video_path.display(), "stopping after failed upload");
                halted = Some(format!(
                    "stopped after {} failed: {error}",
                    video.video_path.display()
                ));
            }
            results.push(result);
        }

        Ok(PublishReport {
            collection_id,
            results,
        })
    }

    async fn publish_one(
        &self,
        video: &VideoEntry,
        target: &dyn UploadTarget,
        collections: &dyn CollectionClient,
        collection_id: &str,
        driver: &ResumableUploadDriver,
    ) -> VideoResult {
        let path = video.video_path.as_path();
        let metadata = self.config.metadata_for(video);

        info!(
            video = %path.display(),
            title = %metadata.title,
            keywords = %video.sidecar.keywords,
            "processing video"
        );
        self.emit(PublishEvent::Started {
            video: path.to_path_buf(),
            title: metadata.title.clone(),
        });

        let request = match target.prepare(path, &metadata).await {
            Ok(request) => request,
            Err(e) => return self.failed(video, e.to_string()),
        };

        let (upload_tx, mut upload_rx) = mpsc::channel(64);
        let driver = driver.clone().with_events(upload_tx);
        // The driver owns the only sender, so the forwarder ends with the upload.
        let upload = async move {
            driver
                .run(request, |item_id| {
                    info!(video = %path.display(), item_id, "video was successfully uploaded");
                })
                .await
        };
        let forward = async {
            while let Some(event) = upload_rx.recv().await {
                self.forward(path, event);
            }
        };
        let (outcome, ()) = tokio::join!(upload, forward);

        let item_id = match outcome {
            UploadOutcome::Success(item_id) => item_id,
            UploadOutcome::Aborted(reason) => return self.failed(video, reason.to_string()),
        };
        self.emit(PublishEvent::Uploaded {
            video: path.to_path_buf(),
            item_id: item_id.clone(),
        });

        let attach_error = self.attach(path, collections, collection_id, &item_id).await;

        VideoResult {
            video: path.to_path_buf(),
            title: metadata.title,
            outcome: VideoOutcome::Uploaded {
                item_id,
                attach_error,
            },
        }
    }

    /// Adds the item to the collection. Not retried: a failure is logged
    /// and returned for the report.
    async fn attach(
        &self,
        path: &Path,
        collections: &dyn CollectionClient,
        collection_id: &str,
        item_id: &str,
    ) -> Option<String> {
        match collections.attach_item(collection_id, item_id).await {
            Ok(()) => {
                debug!(item_id, collection_id, "added to collection");
                self.emit(PublishEvent::Attached {
                    video: path.to_path_buf(),
                    item_id: item_id.to_string(),
                    collection_id: collection_id.to_string(),
                });
                None
            }
            Err(e) => {
                let error = e.to_string();
                warn!(item_id, collection_id, error = %error, "failed to add video to collection");
                self.emit(PublishEvent::AttachFailed {
                    video: path.to_path_buf(),
                    item_id: item_id.to_string(),
                    error: error.clone(),
                });
                Some(error)
            }
        }
    }

    /// Relays the driver's progress and retry notices as publish events.
    fn forward(&self, path: &Path, event: UploadEvent) {
        let event = match event {
            UploadEvent::ChunkAccepted(progress) => PublishEvent::Progress {
                video: path.to_path_buf(),
                bytes_sent: progress.bytes_sent,
                total_bytes: progress.total_bytes,
            },
            UploadEvent::RetryScheduled {
                attempt,
                delay,
                error,
            } => PublishEvent::Retrying {
                video: path.to_path_buf(),
                attempt,
                delay,
                error,
            },
            // Start, completion and abort are reported by the orchestrator itself.
            UploadEvent::Sending { .. } | UploadEvent::Completed { .. } | UploadEvent::Aborted { .. } => {
                return;
            }
        };
        self.emit(event);
    }

    fn failed(&self, video: &VideoEntry, error: String) -> VideoResult {
        error!(video = %video.video_path.display(), error = %error, "upload failed");
        self.emit(PublishEvent::Failed {
            video: video.video_path.clone(),
            error: error.clone(),
        });
        VideoResult {
            video: video.video_path.clone(),
            title: video.sidecar.title.clone(),
            outcome: VideoOutcome::Failed { error },
        }
    }

    fn skip(&self, video: &VideoEntry, reason: &str) -> VideoResult {
        debug!(video = %video.video_path.display(), reason, "skipping video");
        self.emit(PublishEvent::Skipped {
            video: video.video_path.clone(),
            reason: reason.to_string(),
        });
        VideoResult {
            video: video.video_path.clone(),
            title: video.sidecar.title.clone(),
            outcome: VideoOutcome::Skipped {
                reason: reason.to_string(),
            },
        }
    }

    fn emit(&self, event: PublishEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            debug!("dropping publish event: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CollectionSpec, VideoMetadata};
    use std::collections::{HashMap, VecDeque};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use vidup_library::parse_sidecar;
    use vidup_resumable::{ChunkError, ChunkFuture, ChunkStatus, Progress, TransferRequest};

    type Scripted = Result<ChunkStatus, ChunkError>;

    struct ScriptedRequest(VecDeque<Scripted>);

    impl TransferRequest for ScriptedRequest {
        fn send_next_chunk(&mut self) -> ChunkFuture<'_> {
            Box::pin(async move {
                self.0
                    .pop_front()
                    .unwrap_or_else(|| Err(ChunkError::Transport("script exhausted".into())))
            })
        }
    }

    /// Target that hands out a scripted request per video file name.
    struct MockTarget {
        scripts: Mutex<HashMap<String, Vec<Scripted>>>,
        prepared: Mutex<Vec<VideoMetadata>>,
    }

    impl MockTarget {
        fn new() -> Self {
            Self {
                scripts: Mutex::new(HashMap::new()),
                prepared: Mutex::new(Vec::new()),
            }
        }

        fn script(self, name: &str, script: Vec<Scripted>) -> Self {
            self.scripts.lock().unwrap().insert(name.into(), script);
            self
        }
    }

    impl UploadTarget for MockTarget {
        fn prepare<'a>(
            &'a self,
            video: &'a Path,
            metadata: &'a VideoMetadata,
        ) -> Pin<Box<dyn Future<Output = Result<Box<dyn TransferRequest>, PublishError>> + Send + 'a>>
        {
            Box::pin(async move {
                self.prepared.lock().unwrap().push(metadata.clone());
                let name = video.file_name().unwrap().to_string_lossy().into_owned();
                let Some(script) = self.scripts.lock().unwrap().remove(&name) else {
                    return Err(PublishError::Prepare(format!("no such file: {name}")));
                };
                Ok(Box::new(ScriptedRequest(script.into())) as Box<dyn TransferRequest>)
            })
        }
    }

    struct MockCollections {
        resolve: Result<String, String>,
        fail_attach: bool,
        lookups: Mutex<Vec<String>>,
        attached: Mutex<Vec<(String, String)>>,
    }

    impl MockCollections {
        fn ok(id: &str) -> Self {
            Self {
                resolve: Ok(id.into()),
                fail_attach: false,
                lookups: Mutex::new(Vec::new()),
                attached: Mutex::new(Vec::new()),
            }
        }
    }

    impl CollectionClient for MockCollections {
        fn find_or_create<'a>(
            &'a self,
            spec: &'a CollectionSpec,
        ) -> Pin<Box<dyn Future<Output = Result<String, PublishError>> + Send + 'a>> {
            Box::pin(async move {
                self.lookups.lock().unwrap().push(spec.title.clone());
                self.resolve.clone().map_err(PublishError::Collection)
            })
        }

        fn attach_item<'a>(
            &'a self,
            collection_id: &'a str,
            item_id: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + 'a>> {
            Box::pin(async move {
                if self.fail_attach {
                    return Err(PublishError::Collection("HTTP 403: forbidden".into()));
                }
                self.attached
                    .lock()
                    .unwrap()
                    .push((collection_id.to_string(), item_id.to_string()));
                Ok(())
            })
        }
    }

    fn entry(name: &str, sidecar: &str) -> VideoEntry {
        let video_path = Path::new("/videos").join(name);
        VideoEntry {
            sidecar_path: video_path.with_extension("txt"),
            video_path,
            thumbnail_path: None,
            sidecar: parse_sidecar(sidecar),
        }
    }

    fn done(id: &str) -> Scripted {
        Ok(ChunkStatus::Complete(serde_json::json!({ "id": id })))
    }

    fn http(status: u16) -> Scripted {
        Err(ChunkError::Http {
            status,
            body: String::new(),
        })
    }

    fn drain(mut rx: mpsc::Receiver<PublishEvent>) -> Vec<PublishEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_and_attaches_all() {
        let videos = vec![entry("a.mp4", "First # one, two"), entry("b.mov", "Second")];
        let target = MockTarget::new()
            .script("a.mp4", vec![http(503), done("vid-a")])
            .script(
                "b.mov",
                vec![
                    Ok(ChunkStatus::InProgress(Progress {
                        bytes_sent: 256,
                        total_bytes: 512,
                    })),
                    done("vid-b"),
                ],
            );
        let collections = MockCollections::ok("PL1");

        let mut orch = PublishOrchestrator::new(PublishConfig::default(), RetryPolicy::default());
        let rx = orch.take_events().unwrap();
        let report = orch.publish(&videos, &target, &collections).await.unwrap();

        assert_eq!(report.collection_id, "PL1");
        assert_eq!(report.uploaded(), 2);
        assert!(report.all_uploaded());
        assert_eq!(*collections.lookups.lock().unwrap(), vec!["cybertech".to_string()]);
        assert_eq!(
            *collections.attached.lock().unwrap(),
            vec![
                ("PL1".to_string(), "vid-a".to_string()),
                ("PL1".to_string(), "vid-b".to_string())
            ]
        );

        let prepared = target.prepared.lock().unwrap();
        assert_eq!(prepared[0].title, "First");
        assert_eq!(prepared[0].tags, vec!["one", "two"]);
        assert!(prepared[1].tags.is_empty());

        let events = drain(rx);
        let attached = events
            .iter()
            .filter(|e| matches!(e, PublishEvent::Attached { .. }))
            .count();
        assert_eq!(attached, 2);

        let retries: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                PublishEvent::Retrying {
                    video,
                    attempt,
                    error,
                    ..
                } => Some((video.clone(), *attempt, error.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(retries.len(), 1);
        assert_eq!(retries[0].0, Path::new("/videos/a.mp4"));
        assert_eq!(retries[0].1, 1);
        assert!(retries[0].2.contains("503"));

        assert!(events.contains(&PublishEvent::Progress {
            video: "/videos/b.mov".into(),
            bytes_sent: 256,
            total_bytes: 512,
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn collection_failure_uploads_nothing() {
        let videos = vec![entry("a.mp4", "A")];
        let target = MockTarget::new().script("a.mp4", vec![done("x")]);
        let mut collections = MockCollections::ok("unused");
        collections.resolve = Err("HTTP 401: unauthorized".into());

        let orch = PublishOrchestrator::new(PublishConfig::default(), RetryPolicy::default());
        let result = orch.publish(&videos, &target, &collections).await;

        assert!(matches!(result, Err(PublishError::Collection(_))));
        assert!(target.prepared.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn continue_after_fatal_error() {
        let videos = vec![entry("a.mp4", "A"), entry("b.mp4", "B")];
        let target = MockTarget::new()
            .script("a.mp4", vec![http(400)])
            .script("b.mp4", vec![done("vid-b")]);
        let collections = MockCollections::ok("PL");

        let orch = PublishOrchestrator::new(PublishConfig::default(), RetryPolicy::default());
        let report = orch.publish(&videos, &target, &collections).await.unwrap();

        assert_eq!(report.failed(), 1);
        assert_eq!(report.uploaded(), 1);
        let VideoOutcome::Failed { error } = &report.results[0].outcome else {
            panic!("expected failure");
        };
        assert!(error.contains("400"));
        assert_eq!(collections.attached.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_policy_skips_remaining() {
        let videos = vec![
            entry("a.mp4", "A"),
            entry("b.mp4", "B"),
            entry("c.mp4", "C"),
        ];
        let target = MockTarget::new()
            .script("a.mp4", vec![done("vid-a")])
            .script("b.mp4", vec![Ok(ChunkStatus::Complete(serde_json::json!({})))])
            .script("c.mp4", vec![done("vid-c")]);
        let collections = MockCollections::ok("PL");
        let config = PublishConfig {
            on_failure: FailurePolicy::Abort,
            ..PublishConfig::default()
        };

        let orch = PublishOrchestrator::new(config, RetryPolicy::default());
        let report = orch.publish(&videos, &target, &collections).await.unwrap();

        assert_eq!(report.uploaded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(matches!(
            &report.results[1].outcome,
            VideoOutcome::Failed { error } if error.starts_with("unexpected response")
        ));
        assert_eq!(target.prepared.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_reported() {
        let videos = vec![entry("a.mp4", "A")];
        let target = MockTarget::new().script("a.mp4", Vec::new());
        let collections = MockCollections::ok("PL");
        let retry = RetryPolicy {
            max_retries: 2,
            ..RetryPolicy::default()
        };

        let orch = PublishOrchestrator::new(PublishConfig::default(), retry);
        let report = orch.publish(&videos, &target, &collections).await.unwrap();

        let VideoOutcome::Failed { error } = &report.results[0].outcome else {
            panic!("expected failure");
        };
        assert!(error.starts_with("retries exhausted"));
        assert!(collections.attached.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn attach_failure_keeps_upload() {
        let videos = vec![entry("a.mp4", "A"), entry("b.mp4", "B")];
        let target = MockTarget::new()
            .script("a.mp4", vec![done("vid-a")])
            .script("b.mp4", vec![done("vid-b")]);
        let mut collections = MockCollections::ok("PL");
        collections.fail_attach = true;

        let mut orch = PublishOrchestrator::new(PublishConfig::default(), RetryPolicy::default());
        let rx = orch.take_events().unwrap();
        let report = orch.publish(&videos, &target, &collections).await.unwrap();

        assert_eq!(report.uploaded(), 2);
        for result in &report.results {
            assert!(matches!(
                &result.outcome,
                VideoOutcome::Uploaded { attach_error: Some(e), .. } if e.contains("403")
            ));
        }
        let failures = drain(rx)
            .into_iter()
            .filter(|e| matches!(e, PublishEvent::AttachFailed { .. }))
            .count();
        assert_eq!(failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn prepare_failure_is_per_video() {
        let videos = vec![entry("missing.mp4", "Missing"), entry("b.mp4", "B")];
        let target = MockTarget::new().script("b.mp4", vec![done("vid-b")]);
        let collections = MockCollections::ok("PL");

        let orch = PublishOrchestrator::new(PublishConfig::default(), RetryPolicy::default());
        let report = orch.publish(&videos, &target, &collections).await.unwrap();

        assert_eq!(report.failed(), 1);
        assert_eq!(report.uploaded(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start() {
        let videos = vec![entry("a.mp4", "A")];
        let target = MockTarget::new().script("a.mp4", vec![done("x")]);
        let collections = MockCollections::ok("PL");

        let orch = PublishOrchestrator::new(PublishConfig::default(), RetryPolicy::default());
        orch.cancel_token().cancel();
        let result = orch.publish(&videos, &target, &collections).await;

        assert!(matches!(result, Err(PublishError::Cancelled)));
        assert!(collections.lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn take_events_once() {
        let mut orch = PublishOrchestrator::new(PublishConfig::default(), RetryPolicy::default());
        assert!(orch.take_events().is_some());
        assert!(orch.take_events().is_none());
    }
}
