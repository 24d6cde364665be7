pub mod analyzer;
pub mod audio_capture;
pub mod config;
pub mod error;
pub mod segment_parser;
pub mod speaker_stats;
pub mod telemetry;
pub mod transcription_client;
pub mod transport;
pub mod wav_encoder;

// Re-export key components for easier access
pub use analyzer::{DiarizationOutcome, TalkTimeAnalyzer};
pub use config::{read_app_config, AppConfig};
pub use error::DiarizationError;
pub use segment_parser::Segment;
pub use speaker_stats::{aggregate, SpeakerBreakdown, SpeakerStat};
pub use transcription_client::TranscriptionClient;
pub use wav_encoder::{AudioBuffer, EncodedAudio};
