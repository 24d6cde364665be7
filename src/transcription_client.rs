//! Upload, submit, and poll orchestration against the remote engine
//!
//! One `run` call drives a single job through the whole state machine:
//! validation, upload of the encoded bytes, transcript creation, then a
//! bounded poll loop. Failures are classified where they occur; the loop
//! never re-derives an error kind from message text.

use serde::Deserialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::EngineSettings;
use crate::error::DiarizationError;
use crate::segment_parser::{JobStatus, TranscriptJob, TranscriptPayload};
use crate::telemetry::{RequestEvent, TelemetrySender};
use crate::transport::{EngineResponse, EngineTransport, HttpTransport};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    upload_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<JobStatus>,
}

/// Drives diarization jobs against the remote engine
pub struct TranscriptionClient {
    settings: EngineSettings,
    transport: Arc<dyn EngineTransport>,
    telemetry: Option<TelemetrySender>,
    running: Arc<AtomicBool>,
}

impl TranscriptionClient {
    /// Creates a client with the production HTTP transport
    pub fn new(settings: EngineSettings) -> Result<Self, DiarizationError> {
        let timeout = Duration::from_secs(settings.request_timeout_secs);
        let transport = Arc::new(HttpTransport::new(timeout)?);
        Ok(Self::with_transport(settings, transport))
    }

    /// Creates a client over an explicit transport
    pub fn with_transport(settings: EngineSettings, transport: Arc<dyn EngineTransport>) -> Self {
        Self {
            settings,
            transport,
            telemetry: None,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Registers the telemetry sender; set once, read thereafter
    pub fn set_telemetry(&mut self, sender: TelemetrySender) {
        self.telemetry = Some(sender);
    }

    /// Shared flag polled between attempts; store `false` to cancel
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    fn base_url(&self) -> &str {
        self.settings.base_url.trim_end_matches('/')
    }

    fn emit(&self, event: RequestEvent) {
        // Observational only: a closed receiver never gates the request
        if let Some(tx) = &self.telemetry {
            let _ = tx.send(event);
        }
    }

    async fn request<F>(
        &self,
        method: &'static str,
        url: &str,
        call: F,
    ) -> Result<EngineResponse, DiarizationError>
    where
        F: Future<Output = Result<EngineResponse, DiarizationError>>,
    {
        self.emit(RequestEvent::issued(method, url));
        let started = Instant::now();
        match call.await {
            Ok(response) => {
                self.emit(RequestEvent::responded(
                    method,
                    url,
                    response.status,
                    started.elapsed().as_millis() as u64,
                    &response.body,
                ));
                Ok(response)
            }
            Err(e) => {
                self.emit(RequestEvent::failed(
                    method,
                    url,
                    started.elapsed().as_millis() as u64,
                    &e.to_string(),
                ));
                Err(e)
            }
        }
    }

    /// Runs one encoded payload through upload, submit, and poll
    ///
    /// # Arguments
    /// * `audio` - Verified encoded payload to diarize
    /// * `file_name_hint` - Display name carried into the logs
    ///
    /// # Returns
    /// The completed payload, or the first classified failure
    pub async fn run(
        &self,
        audio: &crate::wav_encoder::EncodedAudio,
        file_name_hint: &str,
    ) -> Result<TranscriptPayload, DiarizationError> {
        if self.settings.api_key.trim().is_empty() {
            return Err(DiarizationError::Configuration(
                "engine API key is not configured".to_string(),
            ));
        }
        if audio.is_empty() {
            return Err(DiarizationError::Validation(
                "encoded audio is empty".to_string(),
            ));
        }
        if audio.len() < self.settings.min_audio_bytes {
            return Err(DiarizationError::Validation(format!(
                "encoded audio is {} bytes, below the {}-byte minimum",
                audio.len(),
                self.settings.min_audio_bytes
            )));
        }

        log::info!(
            "Starting diarization of {} ({} bytes)",
            file_name_hint,
            audio.len()
        );

        let upload_url = self.upload(audio).await?;
        log::debug!("Uploaded audio, reference: {}", upload_url);

        let mut job = self.submit(&upload_url).await?;
        log::debug!("Created transcript job {}", job.id);

        self.poll(&mut job).await
    }

    async fn upload(
        &self,
        audio: &crate::wav_encoder::EncodedAudio,
    ) -> Result<String, DiarizationError> {
        let url = format!("{}/upload", self.base_url());
        let response = self
            .request(
                "POST",
                &url,
                self.transport
                    .post_binary(&url, &self.settings.api_key, audio.as_bytes().to_vec()),
            )
            .await?;

        if !response.is_success() {
            return Err(DiarizationError::Upload {
                status: response.status,
                message: response.body,
            });
        }

        let parsed: UploadResponse =
            serde_json::from_str(&response.body).map_err(|e| DiarizationError::Upload {
                status: response.status,
                message: format!("unparseable upload response: {}", e),
            })?;
        parsed.upload_url.ok_or(DiarizationError::Upload {
            status: response.status,
            message: "response missing upload_url".to_string(),
        })
    }

    async fn submit(&self, audio_url: &str) -> Result<TranscriptJob, DiarizationError> {
        let url = format!("{}/transcript", self.base_url());
        let body = serde_json::json!({
            "audio_url": audio_url,
            "speaker_labels": true,
            "language_detection": true,
        });
        let response = self
            .request(
                "POST",
                &url,
                self.transport.post_json(&url, &self.settings.api_key, body),
            )
            .await?;

        if !response.is_success() {
            return Err(DiarizationError::Submit {
                status: response.status,
                message: response.body,
            });
        }

        let parsed: SubmitResponse =
            serde_json::from_str(&response.body).map_err(|e| DiarizationError::Submit {
                status: response.status,
                message: format!("unparseable submit response: {}", e),
            })?;
        let id = parsed
            .id
            .filter(|id| !id.is_empty())
            .ok_or(DiarizationError::Submit {
                status: response.status,
                message: "response missing job id".to_string(),
            })?;

        Ok(TranscriptJob {
            id,
            status: parsed.status.unwrap_or(JobStatus::Queued),
        })
    }

    async fn poll(&self, job: &mut TranscriptJob) -> Result<TranscriptPayload, DiarizationError> {
        let url = format!("{}/transcript/{}", self.base_url(), job.id);
        let interval = Duration::from_secs(self.settings.poll_interval_secs);

        for attempt in 1..=self.settings.max_poll_attempts {
            if !self.running.load(Ordering::Relaxed) {
                return Err(DiarizationError::Cancelled);
            }

            // a transport failure here propagates immediately
            let response = self
                .request(
                    "GET",
                    &url,
                    self.transport.get(&url, &self.settings.api_key),
                )
                .await?;

            if !response.is_success() {
                return Err(DiarizationError::Provider(format!(
                    "poll returned status {}: {}",
                    response.status, response.body
                )));
            }

            let payload: TranscriptPayload =
                serde_json::from_str(&response.body).map_err(|e| {
                    DiarizationError::Provider(format!("unparseable poll response: {}", e))
                })?;
            job.status = payload.status;

            match payload.status {
                JobStatus::Completed => {
                    log::info!("Job {} completed after {} poll attempts", job.id, attempt);
                    return Ok(payload);
                }
                JobStatus::Error => {
                    return Err(DiarizationError::Provider(
                        payload
                            .error
                            .unwrap_or_else(|| "engine reported an error without details".to_string()),
                    ));
                }
                JobStatus::Queued | JobStatus::Processing | JobStatus::Unknown => {
                    log::debug!(
                        "Job {} still {:?} (attempt {}/{})",
                        job.id,
                        payload.status,
                        attempt,
                        self.settings.max_poll_attempts
                    );
                    if attempt < self.settings.max_poll_attempts {
                        tokio::time::sleep(interval).await;
                    }
                }
            }
        }

        Err(DiarizationError::Timeout {
            attempts: self.settings.max_poll_attempts,
        })
    }
}
