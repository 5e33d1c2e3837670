use super::messages::{BackendCommand, BackendEvent};
use crate::downloader::{
    DownloadJob, DownloadOrchestrator, DownloadOutcome, DownloadProgress, SaveDialog,
    TerminalSaveDialog,
};
use crate::extractor::{Extractor, YtDlpExtractor};
use crate::soundpad::{ensure_running, SoundpadClient, SoundpadServer};
use crate::utils::config::{Settings, SettingsStore};
use crate::utils::platform;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Wall-clock limit for one download job
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60 * 60);

const SOUNDPAD_RETRIES: u32 = 3;
const SOUNDPAD_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Everything the actor drives; built by [`BackendActor::new`] or by hand in tests
pub struct BackendComponents {
    pub extractor: Arc<dyn Extractor>,
    pub orchestrator: Arc<DownloadOrchestrator>,
    pub soundpad_server: Arc<SoundpadServer>,
    pub settings: SettingsStore,
    pub dialog: Arc<dyn SaveDialog>,
}

pub struct BackendActor {
    receiver: mpsc::Receiver<BackendCommand>,
    sender: mpsc::Sender<BackendEvent>,

    // Components
    extractor: Arc<dyn Extractor>,
    orchestrator: Arc<DownloadOrchestrator>,
    soundpad_server: Arc<SoundpadServer>,
    soundpad_client: SoundpadClient,
    store: SettingsStore,
    settings: Settings,
    dialog: Arc<dyn SaveDialog>,
    download_timeout: Duration,
}

impl BackendActor {
    /// Locate yt-dlp, ffmpeg and the Soundpad helper and load settings
    pub async fn new(
        store: SettingsStore,
        receiver: mpsc::Receiver<BackendCommand>,
        sender: mpsc::Sender<BackendEvent>,
    ) -> Result<Self> {
        let extractor = Arc::new(YtDlpExtractor::new()?);
        let orchestrator = Arc::new(
            DownloadOrchestrator::detect().context("Failed to initialize downloader")?,
        );

        let components = BackendComponents {
            extractor,
            orchestrator,
            soundpad_server: Arc::new(SoundpadServer::new(None)),
            settings: store,
            dialog: Arc::new(TerminalSaveDialog),
        };
        Self::with_components(components, receiver, sender)
    }

    pub fn with_components(
        components: BackendComponents,
        receiver: mpsc::Receiver<BackendCommand>,
        sender: mpsc::Sender<BackendEvent>,
    ) -> Result<Self> {
        let settings = components
            .settings
            .load()
            .context("Failed to load settings")?;
        let soundpad_client = SoundpadClient::new(settings.soundpad.port);

        Ok(Self {
            receiver,
            sender,
            extractor: components.extractor,
            orchestrator: components.orchestrator,
            soundpad_server: components.soundpad_server,
            soundpad_client,
            store: components.settings,
            settings,
            dialog: components.dialog,
            download_timeout: DOWNLOAD_TIMEOUT,
        })
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Point the Soundpad client somewhere other than the configured port
    pub fn with_soundpad_client(mut self, client: SoundpadClient) -> Self {
        self.soundpad_client = client;
        self
    }

    pub async fn run(mut self) {
        info!("BackendActor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                BackendCommand::FetchVideoInfo { url, request_id } => {
                    self.handle_video_info(url, request_id).await;
                }
                BackendCommand::StartDownload(job) => {
                    self.handle_start_download(job).await;
                }
                BackendCommand::AddToSoundpad { path } => {
                    let result = add_to_soundpad(
                        &self.soundpad_client,
                        &self.soundpad_server,
                        path.clone(),
                    )
                    .await;
                    self.emit(BackendEvent::SoundpadAdded { path, result }).await;
                }
                BackendCommand::SoundpadStatus => {
                    let running = self.soundpad_client.status().await.unwrap_or(false);
                    self.emit(BackendEvent::SoundpadStatus(running)).await;
                }
                BackendCommand::ValidatePath { path } => {
                    let valid = platform::validate_path(&path);
                    self.emit(BackendEvent::PathValidated { path, valid }).await;
                }
                BackendCommand::OpenPath { path } => {
                    let opened = platform::open_path(&path);
                    self.emit(BackendEvent::PathOpened { path, opened }).await;
                }
                BackendCommand::ListFiles { path } => {
                    let result = platform::list_files_in_path(&path).map_err(|e| e.to_string());
                    self.emit(BackendEvent::FilesListed { path, result }).await;
                }
                BackendCommand::UpdateSettings(settings) => {
                    self.handle_update_settings(settings).await;
                }
                BackendCommand::Shutdown => {
                    info!("BackendActor shutting down");
                    break;
                }
            }
        }

        if let Err(e) = self.soundpad_server.stop().await {
            warn!("Failed to stop Soundpad server: {}", e);
        }
    }

    async fn emit(&self, event: BackendEvent) {
        // The front end may already be gone during shutdown
        let _ = self.sender.send(event).await;
    }

    async fn handle_video_info(&self, url: String, request_id: u64) {
        let result = self
            .extractor
            .extract_info(&url)
            .await
            .map_err(|e| e.to_string());
        if let Err(e) = &result {
            warn!("Metadata lookup for {} failed: {}", url, e);
        }
        self.emit(BackendEvent::VideoInfo { request_id, result }).await;
    }

    async fn handle_start_download(&self, job: DownloadJob) {
        if job.source_url.trim().is_empty() {
            warn!("Rejected job {} without a URL", job.id);
            self.emit(BackendEvent::Error(format!(
                "Job {} has no URL to download",
                job.id
            )))
            .await;
            return;
        }
        let job_id = job.id;
        self.emit(BackendEvent::DownloadStarted { job_id }).await;

        let orchestrator = self.orchestrator.clone();
        let dialog = self.dialog.clone();
        let sender = self.sender.clone();
        let timeout = self.download_timeout;
        let forward_to_soundpad = self.settings.soundpad.enabled && job.container.is_audio();
        let soundpad_client = self.soundpad_client.clone();
        let soundpad_server = self.soundpad_server.clone();

        tokio::spawn(async move {
            let (progress_tx, mut progress_rx) = mpsc::channel::<DownloadProgress>(32);
            let progress_sender = sender.clone();
            let forwarder = tokio::spawn(async move {
                while let Some(progress) = progress_rx.recv().await {
                    let _ = progress_sender
                        .send(BackendEvent::DownloadProgress { job_id, progress })
                        .await;
                }
            });

            let run = orchestrator.run_with_progress(&job, dialog.as_ref(), Some(progress_tx));
            let outcome = match tokio::time::timeout(timeout, run).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!("Job {} timed out after {:?}", job_id, timeout);
                    DownloadOutcome::failed(format!(
                        "Download timed out after {} seconds",
                        timeout.as_secs()
                    ))
                }
            };
            // The sender was moved into the finished run, so this drains and ends
            let _ = forwarder.await;

            let completed_path = outcome.path().cloned();
            let _ = sender
                .send(BackendEvent::DownloadFinished { job_id, outcome })
                .await;

            if let Some(path) = completed_path.filter(|_| forward_to_soundpad) {
                let event =
                    match add_to_soundpad(&soundpad_client, &soundpad_server, path.clone()).await {
                        Ok(()) => BackendEvent::SoundpadAdded {
                            path,
                            result: Ok(()),
                        },
                        Err(e) => {
                            warn!("Soundpad forwarding failed: {}", e);
                            BackendEvent::SoundpadWarning(e)
                        }
                    };
                let _ = sender.send(event).await;
            }
        });
    }

    async fn handle_update_settings(&mut self, settings: Settings) {
        let result = self.store.save(&settings).map_err(|e| e.to_string());
        if result.is_ok() {
            if settings.soundpad.port != self.settings.soundpad.port {
                self.soundpad_client = SoundpadClient::new(settings.soundpad.port);
            }
            self.settings = settings;
        }
        self.emit(BackendEvent::SettingsSaved(result)).await;
    }
}

async fn add_to_soundpad(
    client: &SoundpadClient,
    server: &SoundpadServer,
    path: PathBuf,
) -> Result<(), String> {
    ensure_running(client, server, SOUNDPAD_RETRIES, SOUNDPAD_RETRY_DELAY)
        .await
        .map_err(|e| e.to_string())?;
    client.add_sound(&path).await.map_err(|e| e.to_string())
}
