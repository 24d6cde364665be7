//! Common error types for the diarization pipeline

use std::error::Error;
use std::fmt;

/// Unified error type for capture, encoding, and engine operations
#[derive(Debug, Clone)]
pub enum DiarizationError {
    /// Input rejected before any network call (empty or too short)
    Validation(String),

    /// Missing or unusable engine configuration (no credential, bad URL)
    Configuration(String),

    /// Capture device unavailable or stream could not be opened
    Device(String),

    /// Capture stopped with zero buffered frames
    EmptyRecording,

    /// Produced container failed verification, or input audio is malformed
    Encoding(String),

    /// Upload request rejected by the engine
    Upload { status: u16, message: String },

    /// Transcript creation rejected by the engine
    Submit { status: u16, message: String },

    /// Engine reported a terminal job failure
    Provider(String),

    /// Network-level failure, tagged where it occurred
    Transport(String),

    /// Poll attempt budget exhausted before the job finished
    Timeout { attempts: u32 },

    /// Caller cleared the cancel flag while the job was still polling
    Cancelled,

    /// Job completed but contained neither utterances nor words
    NoSpeechDetected,
}

impl fmt::Display for DiarizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiarizationError::Validation(msg) => {
                write!(f, "Invalid audio input: {}", msg)
            }
            DiarizationError::Configuration(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            DiarizationError::Device(msg) => {
                write!(f, "Audio device error: {}", msg)
            }
            DiarizationError::EmptyRecording => {
                write!(f, "No audio was captured")
            }
            DiarizationError::Encoding(msg) => {
                write!(f, "Audio encoding error: {}", msg)
            }
            DiarizationError::Upload { status, message } => {
                write!(f, "Upload failed with status {}: {}", status, message)
            }
            DiarizationError::Submit { status, message } => {
                write!(f, "Transcript submit failed with status {}: {}", status, message)
            }
            DiarizationError::Provider(msg) => {
                write!(f, "Engine reported an error: {}", msg)
            }
            DiarizationError::Transport(msg) => {
                write!(f, "Network error: {}", msg)
            }
            DiarizationError::Timeout { attempts } => {
                write!(f, "Transcription timed out after {} poll attempts", attempts)
            }
            DiarizationError::Cancelled => {
                write!(f, "Transcription cancelled")
            }
            DiarizationError::NoSpeechDetected => {
                write!(f, "No speech detected in the recording")
            }
        }
    }
}

impl Error for DiarizationError {}

/// Convert reqwest errors at the transport boundary
impl From<reqwest::Error> for DiarizationError {
    fn from(err: reqwest::Error) -> Self {
        DiarizationError::Transport(err.to_string())
    }
}

/// Convert hound errors raised while writing or reading containers
impl From<hound::Error> for DiarizationError {
    fn from(err: hound::Error) -> Self {
        DiarizationError::Encoding(err.to_string())
    }
}
