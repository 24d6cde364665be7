//! Main pipeline coordinator that integrates all components
//!
//! This is the surface the rendering layer talks to: capture control,
//! one-shot diarization runs, and aggregation. Each run owns its own
//! buffers and job; nothing is shared between invocations beyond the engine
//! configuration and the telemetry channel.

use chrono::Utc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::audio_capture::AudioCapture;
use crate::config::AppConfig;
use crate::error::DiarizationError;
use crate::segment_parser::{self, Segment};
use crate::speaker_stats::{self, SpeakerBreakdown};
use crate::telemetry::{self, TelemetryReceiver};
use crate::transcription_client::TranscriptionClient;
use crate::wav_encoder::{self, EncodedAudio};

/// Parsed diarization result handed to the rendering collaborator
#[derive(Debug, Clone)]
pub struct DiarizationOutcome {
    /// Segments ordered by start time
    pub segments: Vec<Segment>,
    pub total_duration_ms: f64,
}

pub struct TalkTimeAnalyzer {
    capture: AudioCapture,
    client: TranscriptionClient,
    session_id: Option<String>,
}

impl TalkTimeAnalyzer {
    /// Creates an analyzer from an explicit configuration
    pub fn new(config: AppConfig) -> Result<Self, DiarizationError> {
        let client = TranscriptionClient::new(config.engine.clone())?;
        Ok(Self {
            capture: AudioCapture::new(config.audio),
            client,
            session_id: None,
        })
    }

    /// Registers the telemetry observer and returns its receiving end
    ///
    /// Intended to be called once, before any job runs.
    pub fn telemetry_events(&mut self) -> TelemetryReceiver {
        let (tx, rx) = telemetry::channel();
        self.client.set_telemetry(tx);
        rx
    }

    /// Shared cancel handle for the poll loop; store `false` to cancel
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.client.running_flag()
    }

    /// Opens the capture stream for a new session
    pub fn start_capture(&mut self) -> Result<(), DiarizationError> {
        let session_id = format!("session_{}", Utc::now().timestamp_micros());
        log::info!("Starting capture session {}", session_id);
        self.session_id = Some(session_id);
        self.capture.start()
    }

    /// Whether a capture session is currently running
    pub fn is_capturing(&self) -> bool {
        self.capture.is_active()
    }

    /// Stops capture and encodes the buffered frames
    ///
    /// The device is released by the stop itself, so it is freed on the
    /// empty-recording path and on encoding failures alike.
    pub fn stop_capture(&mut self) -> Result<EncodedAudio, DiarizationError> {
        let buffer = self.capture.stop()?;
        if let Some(session_id) = self.session_id.take() {
            log::info!(
                "Capture session {} stopped with {:.2}s of audio",
                session_id,
                buffer.duration_secs()
            );
        }
        wav_encoder::encode(&buffer)
    }

    /// Runs one encoded payload through the engine and parses the result
    pub async fn run_diarization(
        &self,
        audio: &EncodedAudio,
        file_name_hint: &str,
    ) -> Result<DiarizationOutcome, DiarizationError> {
        let payload = self.client.run(audio, file_name_hint).await?;
        let parsed = segment_parser::parse(payload)?;
        Ok(DiarizationOutcome {
            segments: parsed.segments,
            total_duration_ms: parsed.total_duration_secs * 1000.0,
        })
    }

    /// Reduces segments into the per-speaker breakdown
    pub fn aggregate(&self, segments: &[Segment], total_duration_ms: f64) -> SpeakerBreakdown {
        speaker_stats::aggregate(segments, Some(total_duration_ms))
    }
}
