//! Typed engine payloads and segment extraction
//!
//! The engine's JSON is deserialized once into typed structs and resolved
//! into a tagged variant before any segment is built; nothing downstream
//! probes optional fields ad hoc.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::DiarizationError;

/// Lifecycle states a transcript job moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
    /// Any status string this version does not know; treated as in flight
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// One submitted transcription request tracked through upload, submit, poll
#[derive(Debug, Clone)]
pub struct TranscriptJob {
    pub id: String,
    pub status: JobStatus,
}

/// Provider-returned contiguous speech span attributed to one speaker
///
/// Times are milliseconds, as delivered on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawUtterance {
    #[serde(default)]
    pub speaker: Option<String>,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
}

/// Single recognized word with an optional speaker tag
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawWord {
    #[serde(default)]
    pub speaker: Option<String>,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
}

/// Full poll response body
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptPayload {
    #[serde(default)]
    pub id: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub utterances: Option<Vec<RawUtterance>>,
    #[serde(default)]
    pub words: Option<Vec<RawWord>>,
    /// Declared recording length in seconds
    #[serde(default)]
    pub audio_duration: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// What a completed payload actually carries, resolved exactly once
#[derive(Debug)]
pub enum TranscriptContent {
    Utterances(Vec<RawUtterance>),
    Words(Vec<RawWord>),
    Empty,
}

pub fn resolve_content(payload: TranscriptPayload) -> TranscriptContent {
    match payload.utterances {
        Some(utterances) if !utterances.is_empty() => TranscriptContent::Utterances(utterances),
        _ => match payload.words {
            Some(words) if !words.is_empty() => TranscriptContent::Words(words),
            _ => TranscriptContent::Empty,
        },
    }
}

/// Canonical speech span in seconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub speaker_label: String,
    /// Start time in seconds; always ≤ `end`
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub text: String,
}

/// Parsed result of a completed job
#[derive(Debug, Clone)]
pub struct ParsedTranscript {
    /// Segments ordered by start time
    pub segments: Vec<Segment>,
    /// Seconds, from the declared duration or the last segment end
    pub total_duration_secs: f64,
}

/// Groups consecutive words sharing a speaker tag into synthetic utterances
///
/// A new group starts whenever the tag changes or no group is open; words
/// without a speaker tag are dropped; texts within a group join with single
/// spaces. Time units pass through untouched.
pub fn group_words_by_speaker(words: &[RawWord]) -> Vec<RawUtterance> {
    let mut grouped: Vec<RawUtterance> = Vec::new();
    for word in words {
        let Some(tag) = word.speaker.as_deref() else {
            continue;
        };
        match grouped.last_mut() {
            Some(current) if current.speaker.as_deref() == Some(tag) => {
                current.end = word.end;
                if !word.text.is_empty() {
                    if !current.text.is_empty() {
                        current.text.push(' ');
                    }
                    current.text.push_str(&word.text);
                }
            }
            _ => grouped.push(RawUtterance {
                speaker: Some(tag.to_string()),
                start: word.start,
                end: word.end,
                text: word.text.clone(),
            }),
        }
    }
    grouped
}

fn segment_from_utterance(utterance: &RawUtterance, declared_duration: Option<f64>) -> Segment {
    let mut start = (utterance.start / 1000.0).max(0.0);
    let mut end = (utterance.end / 1000.0).max(0.0);
    if let Some(duration) = declared_duration {
        start = start.min(duration);
        end = end.min(duration);
    }
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }
    Segment {
        speaker_label: format!("Speaker {}", utterance.speaker.as_deref().unwrap_or("?")),
        start,
        end,
        text: utterance.text.clone(),
    }
}

/// Converts a completed payload into the canonical ordered segment sequence
///
/// # Returns
/// Segments plus the resolved total duration, or `NoSpeechDetected` when the
/// payload carries neither utterances nor words
pub fn parse(payload: TranscriptPayload) -> Result<ParsedTranscript, DiarizationError> {
    let declared_duration = payload.audio_duration;

    let utterances = match resolve_content(payload) {
        TranscriptContent::Utterances(utterances) => utterances,
        TranscriptContent::Words(words) => group_words_by_speaker(&words),
        TranscriptContent::Empty => return Err(DiarizationError::NoSpeechDetected),
    };

    let mut segments: Vec<Segment> = utterances
        .iter()
        .map(|u| segment_from_utterance(u, declared_duration))
        .collect();
    segments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal));

    let total_duration_secs = declared_duration.unwrap_or_else(|| {
        segments.iter().map(|s| s.end).fold(0.0, f64::max)
    });

    Ok(ParsedTranscript {
        segments,
        total_duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(speaker: Option<&str>, text: &str, start: f64, end: f64) -> RawWord {
        RawWord {
            speaker: speaker.map(str::to_string),
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn consecutive_same_speaker_words_merge() {
        let words = vec![
            word(Some("A"), "hi", 0.0, 1.0),
            word(Some("A"), "there", 1.0, 2.0),
            word(Some("B"), "yo", 2.0, 3.0),
        ];
        let grouped = group_words_by_speaker(&words);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].speaker.as_deref(), Some("A"));
        assert_eq!(grouped[0].text, "hi there");
        assert_eq!(grouped[0].start, 0.0);
        assert_eq!(grouped[0].end, 2.0);
        assert_eq!(grouped[1].speaker.as_deref(), Some("B"));
        assert_eq!(grouped[1].text, "yo");
        assert_eq!(grouped[1].start, 2.0);
        assert_eq!(grouped[1].end, 3.0);
    }

    #[test]
    fn untagged_words_are_dropped() {
        let words = vec![
            word(Some("A"), "one", 0.0, 1.0),
            word(None, "uh", 1.0, 1.5),
            word(Some("A"), "two", 1.5, 2.0),
        ];
        let grouped = group_words_by_speaker(&words);
        // the untagged word neither appears nor splits the group
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].text, "one two");
    }

    #[test]
    fn speaker_returning_later_starts_a_new_group() {
        let words = vec![
            word(Some("A"), "first", 0.0, 1.0),
            word(Some("B"), "mid", 1.0, 2.0),
            word(Some("A"), "again", 2.0, 3.0),
        ];
        assert_eq!(group_words_by_speaker(&words).len(), 3);
    }

    fn completed(body: serde_json::Value) -> TranscriptPayload {
        serde_json::from_value(body).expect("payload should deserialize")
    }

    #[test]
    fn utterances_take_priority_and_convert_to_seconds() {
        let payload = completed(serde_json::json!({
            "status": "completed",
            "audio_duration": 12.5,
            "utterances": [
                {"speaker": "B", "start": 4000, "end": 9000, "text": "later span"},
                {"speaker": "A", "start": 0, "end": 3500, "text": "Hello there everyone"}
            ],
            "words": [{"speaker": "A", "start": 0, "end": 500, "text": "ignored"}]
        }));
        let parsed = parse(payload).expect("parse should succeed");
        assert_eq!(parsed.segments.len(), 2);
        // ordered by start regardless of wire order
        assert_eq!(parsed.segments[0].speaker_label, "Speaker A");
        assert_eq!(parsed.segments[0].start, 0.0);
        assert_eq!(parsed.segments[0].end, 3.5);
        assert_eq!(parsed.segments[1].speaker_label, "Speaker B");
        assert_eq!(parsed.segments[1].text, "later span");
        assert_eq!(parsed.total_duration_secs, 12.5);
    }

    #[test]
    fn word_fallback_builds_synthetic_utterances() {
        let payload = completed(serde_json::json!({
            "status": "completed",
            "utterances": [],
            "words": [
                {"speaker": "A", "start": 0, "end": 1000, "text": "good"},
                {"speaker": "A", "start": 1000, "end": 2000, "text": "morning"},
                {"speaker": "B", "start": 2000, "end": 2600, "text": "hey"}
            ]
        }));
        let parsed = parse(payload).unwrap();
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[0].text, "good morning");
        assert_eq!(parsed.segments[0].end, 2.0);
        // no declared duration: the last segment end wins
        assert!((parsed.total_duration_secs - 2.6).abs() < 1e-9);
    }

    #[test]
    fn empty_payload_is_no_speech() {
        let payload = completed(serde_json::json!({"status": "completed"}));
        assert!(matches!(
            parse(payload),
            Err(DiarizationError::NoSpeechDetected)
        ));
    }

    #[test]
    fn times_are_clamped_to_the_declared_duration() {
        let payload = completed(serde_json::json!({
            "status": "completed",
            "audio_duration": 5.0,
            "utterances": [
                {"speaker": "A", "start": -200, "end": 7000, "text": "overflow"}
            ]
        }));
        let parsed = parse(payload).unwrap();
        assert_eq!(parsed.segments[0].start, 0.0);
        assert_eq!(parsed.segments[0].end, 5.0);
    }

    #[test]
    fn unknown_status_strings_stay_in_flight() {
        let payload = completed(serde_json::json!({"status": "rearchiving"}));
        assert_eq!(payload.status, JobStatus::Unknown);
        assert!(!payload.status.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }
}
