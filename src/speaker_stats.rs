//! Per-speaker speaking-time aggregation

use serde::Serialize;
use std::cmp::Ordering;

use crate::segment_parser::Segment;

/// Shortest trimmed text worth keeping as a representative phrase
const MIN_PHRASE_CHARS: usize = 10;

/// Aggregated totals for one speaker
#[derive(Debug, Clone, Serialize)]
pub struct SpeakerStat {
    pub id: String,
    pub label: String,
    pub speaking_time_ms: f64,
    /// Share of the total duration, in [0, 100]
    pub percentage: f64,
    /// At most three phrases: first, middle, last
    pub speech_examples: Vec<String>,
    pub all_phrases: Vec<String>,
}

/// Result of reducing a segment set
#[derive(Debug, Clone, Serialize)]
pub struct SpeakerBreakdown {
    /// Sorted by speaking time descending, stable on ties
    pub speakers: Vec<SpeakerStat>,
    pub total_duration_ms: f64,
}

/// Picks deterministic representative phrases: first, middle, last
///
/// The middle element is `(len - 1) / 2`, so four phrases sample the second
/// one rather than the third.
pub fn extract_speech_examples(phrases: &[String]) -> Vec<String> {
    if phrases.is_empty() {
        return Vec::new();
    }
    let mut examples = vec![phrases[0].clone()];
    if phrases.len() >= 3 {
        examples.push(phrases[(phrases.len() - 1) / 2].clone());
    }
    if phrases.len() >= 2 {
        examples.push(phrases[phrases.len() - 1].clone());
    }
    examples
}

struct SpeakerGroup {
    label: String,
    speaking_time_ms: f64,
    phrases: Vec<String>,
}

/// Reduces segments into per-speaker totals and percentages
///
/// # Arguments
/// * `segments` - Any segment set; totals do not depend on its order
/// * `total_duration_ms_override` - Authoritative duration, when the caller
///   knows it
pub fn aggregate(
    segments: &[Segment],
    total_duration_ms_override: Option<f64>,
) -> SpeakerBreakdown {
    let mut groups: Vec<SpeakerGroup> = Vec::new();
    let mut max_end = 0.0f64;

    for segment in segments {
        max_end = max_end.max(segment.end);
        let duration_ms = (segment.end - segment.start).max(0.0) * 1000.0;

        let index = match groups
            .iter()
            .position(|g| g.label == segment.speaker_label)
        {
            Some(index) => index,
            None => {
                groups.push(SpeakerGroup {
                    label: segment.speaker_label.clone(),
                    speaking_time_ms: 0.0,
                    phrases: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[index];
        group.speaking_time_ms += duration_ms;

        // short interjections are timed but not sampled
        let trimmed = segment.text.trim();
        if trimmed.chars().count() >= MIN_PHRASE_CHARS {
            group.phrases.push(trimmed.to_string());
        }
    }

    let spoken_total_ms: f64 = groups.iter().map(|g| g.speaking_time_ms).sum();
    let total_duration_ms = match total_duration_ms_override {
        Some(total) => total,
        None if max_end > 0.0 => max_end * 1000.0,
        None => spoken_total_ms,
    };

    let mut speakers: Vec<SpeakerStat> = groups
        .into_iter()
        .map(|group| {
            let percentage = if total_duration_ms > 0.0 {
                (group.speaking_time_ms / total_duration_ms * 100.0).min(100.0)
            } else {
                0.0
            };
            SpeakerStat {
                id: group.label.clone(),
                label: group.label,
                speaking_time_ms: group.speaking_time_ms,
                percentage,
                speech_examples: extract_speech_examples(&group.phrases),
                all_phrases: group.phrases,
            }
        })
        .collect();

    // stable sort keeps encounter order on ties
    speakers.sort_by(|a, b| {
        b.speaking_time_ms
            .partial_cmp(&a.speaking_time_ms)
            .unwrap_or(Ordering::Equal)
    });

    SpeakerBreakdown {
        speakers,
        total_duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(label: &str, start: f64, end: f64, text: &str) -> Segment {
        Segment {
            speaker_label: label.to_string(),
            start,
            end,
            text: text.to_string(),
        }
    }

    fn phrases(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn examples_are_first_middle_last() {
        assert_eq!(
            extract_speech_examples(&phrases(&["a", "b", "c", "d"])),
            phrases(&["a", "b", "d"])
        );
        assert_eq!(extract_speech_examples(&phrases(&["a"])), phrases(&["a"]));
        assert_eq!(extract_speech_examples(&phrases(&[])), Vec::<String>::new());
        assert_eq!(
            extract_speech_examples(&phrases(&["a", "b"])),
            phrases(&["a", "b"])
        );
        assert_eq!(
            extract_speech_examples(&phrases(&["a", "b", "c", "d", "e"])),
            phrases(&["a", "c", "e"])
        );
    }

    #[test]
    fn totals_and_percentages_follow_the_segments() {
        let segments = vec![
            segment("Speaker A", 0.0, 2.0, "a reasonably long sentence"),
            segment("Speaker B", 2.0, 3.0, "another long enough reply"),
            segment("Speaker A", 3.0, 4.0, "ok"),
        ];
        let breakdown = aggregate(&segments, None);

        assert_eq!(breakdown.total_duration_ms, 4000.0);
        assert_eq!(breakdown.speakers.len(), 2);
        let a = &breakdown.speakers[0];
        assert_eq!(a.label, "Speaker A");
        assert_eq!(a.speaking_time_ms, 3000.0);
        assert_eq!(a.percentage, 75.0);
        // "ok" was timed but not collected as a phrase
        assert_eq!(a.all_phrases, phrases(&["a reasonably long sentence"]));
        assert_eq!(breakdown.speakers[1].percentage, 25.0);
    }

    #[test]
    fn totals_are_invariant_under_permutation() {
        let mut segments = vec![
            segment("Speaker A", 0.0, 1.5, "first thing said today"),
            segment("Speaker B", 1.5, 4.0, "second thing said today"),
            segment("Speaker C", 4.0, 4.5, "third thing said today"),
            segment("Speaker A", 4.5, 6.0, "fourth thing said today"),
        ];
        let forward = aggregate(&segments, None);
        segments.reverse();
        let backward = aggregate(&segments, None);

        assert_eq!(forward.total_duration_ms, backward.total_duration_ms);
        for speaker in &forward.speakers {
            let twin = backward
                .speakers
                .iter()
                .find(|s| s.label == speaker.label)
                .expect("speaker present in both runs");
            assert_eq!(twin.speaking_time_ms, speaker.speaking_time_ms);
            assert_eq!(twin.percentage, speaker.percentage);
        }
    }

    #[test]
    fn speaking_time_never_exceeds_the_duration() {
        let segments = vec![
            segment("Speaker A", 0.0, 1.0, ""),
            segment("Speaker B", 1.0, 2.5, ""),
            segment("Speaker A", 3.0, 5.0, ""),
        ];
        let breakdown = aggregate(&segments, None);
        let spoken: f64 = breakdown
            .speakers
            .iter()
            .map(|s| s.speaking_time_ms)
            .sum();
        assert!(spoken <= breakdown.total_duration_ms);
    }

    #[test]
    fn zero_duration_and_no_segments_is_a_clean_empty_result() {
        let breakdown = aggregate(&[], Some(0.0));
        assert_eq!(breakdown.total_duration_ms, 0.0);
        assert!(breakdown.speakers.is_empty());
    }

    #[test]
    fn zero_duration_with_segments_yields_zero_percentages() {
        let segments = vec![segment("Speaker A", 0.0, 1.0, "")];
        let breakdown = aggregate(&segments, Some(0.0));
        assert_eq!(breakdown.speakers[0].percentage, 0.0);
        assert!(breakdown.speakers[0].percentage.is_finite());
    }

    #[test]
    fn percentages_are_capped_at_one_hundred() {
        let segments = vec![segment("Speaker A", 0.0, 2.0, "")];
        let breakdown = aggregate(&segments, Some(1000.0));
        assert_eq!(breakdown.speakers[0].percentage, 100.0);
    }

    #[test]
    fn ties_keep_encounter_order() {
        let segments = vec![
            segment("Speaker B", 0.0, 1.0, ""),
            segment("Speaker A", 1.0, 2.0, ""),
        ];
        let breakdown = aggregate(&segments, None);
        assert_eq!(breakdown.speakers[0].label, "Speaker B");
        assert_eq!(breakdown.speakers[1].label, "Speaker A");
    }

    #[test]
    fn override_duration_wins_over_segment_ends() {
        let segments = vec![segment("Speaker A", 0.0, 2.0, "")];
        let breakdown = aggregate(&segments, Some(10_000.0));
        assert_eq!(breakdown.total_duration_ms, 10_000.0);
        assert!((breakdown.speakers[0].percentage - 20.0).abs() < 1e-9);
    }
}
