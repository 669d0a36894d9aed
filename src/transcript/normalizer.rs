/// Merges fragmentary caption events into readable segments
use super::{RawCaptionEvent, Transcript, TranscriptSegment};
use tracing::debug;

/// Segments shorter than this (in characters) absorb the following event
pub const MERGE_TEXT_THRESHOLD: usize = 20;

/// Only events starting within this many seconds of the segment start are absorbed
pub const MERGE_GAP_SECONDS: f64 = 3.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentNormalizer;

impl SegmentNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Merge events into a transcript; `None` when no event carries text
    pub fn normalize(&self, events: &[RawCaptionEvent]) -> Option<Transcript> {
        let mut segments: Vec<TranscriptSegment> = Vec::new();
        let mut current: Option<TranscriptSegment> = None;

        for event in events {
            let text = event.text.trim();
            if text.is_empty() {
                continue;
            }

            let start = event.start_ms as f64 / 1000.0;
            let duration = event.duration_ms as f64 / 1000.0;

            current = Some(match current.take() {
                Some(mut acc) if should_merge(&acc, start) => {
                    acc.text.push(' ');
                    acc.text.push_str(text);
                    acc.duration = acc.duration.max(start + duration - acc.start);
                    acc
                }
                Some(acc) => {
                    segments.push(acc);
                    TranscriptSegment {
                        start,
                        duration,
                        text: text.to_string(),
                    }
                }
                None => TranscriptSegment {
                    start,
                    duration,
                    text: text.to_string(),
                },
            });
        }

        segments.extend(current);
        debug!("Normalized {} caption events into {} segments", events.len(), segments.len());
        Transcript::new(segments)
    }
}

fn should_merge(acc: &TranscriptSegment, start: f64) -> bool {
    acc.text.chars().count() < MERGE_TEXT_THRESHOLD && start - acc.start < MERGE_GAP_SECONDS
}
