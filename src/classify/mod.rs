pub mod openai;

pub use openai::OpenAiClassifier;

use crate::error::{AdtrimError, Result};
use crate::timeline::TimeInterval;
use crate::transcribe::TranscriptSegment;
use async_trait::async_trait;
use regex::Regex;
use tracing::warn;

#[async_trait]
pub trait AdClassifier: Send + Sync {
    /// Identify ad intervals in a timed transcript.
    ///
    /// The returned list is raw classifier output: possibly unsorted,
    /// overlapping, or out of range. Sanitizing it is the complement
    /// engine's job.
    async fn classify(&self, segments: &[TranscriptSegment]) -> Result<Vec<TimeInterval>>;

    fn name(&self) -> &'static str;
}

/// Render transcript segments compactly for the classifier prompt,
/// omitting word-level detail it does not need.
pub fn render_segments(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("[{:.1} - {:.1}] {}", s.start, s.end, s.text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract ad intervals from free-form model output.
///
/// The model may wrap the JSON array in explanation text or code fences.
/// Policy: strip fences, locate a balanced `[...]` span that parses as a
/// JSON array of objects. A missing or unparseable array is a
/// `MalformedClassifierOutput` error, never a silent empty list.
/// Individual elements without numeric `start`/`end` are dropped with a
/// warning; the rest proceed.
pub fn parse_ad_intervals(response: &str) -> Result<Vec<TimeInterval>> {
    let stripped = strip_code_fences(response);

    // Prose may contain bracketed asides before the real array, some of
    // which even parse as JSON ("minutes [1, 2]"), so walk every balanced
    // candidate span until one holds an array of objects. An empty array
    // is an explicit no-ads answer and is accepted as-is.
    let mut search_from = 0usize;
    while let Some(span) = find_balanced_array(&stripped[search_from..]) {
        if let Ok(serde_json::Value::Array(entries)) = serde_json::from_str(span) {
            if entries.is_empty() || entries.iter().any(|e| e.is_object()) {
                let mut intervals = Vec::with_capacity(entries.len());
                for entry in &entries {
                    let start = entry.get("start").and_then(|v| v.as_f64());
                    let end = entry.get("end").and_then(|v| v.as_f64());
                    match (start, end) {
                        (Some(start), Some(end)) => intervals.push(TimeInterval::new(start, end)),
                        _ => warn!("Dropping classifier entry without numeric start/end: {entry}"),
                    }
                }
                return Ok(intervals);
            }
        }

        // Skip past this candidate's opening bracket and try again.
        let offset = span.as_ptr() as usize - stripped.as_ptr() as usize;
        search_from = offset + 1;
    }

    Err(AdtrimError::MalformedClassifierOutput(
        "no parseable JSON array found in classifier response".to_string(),
    ))
}

/// Remove markdown code fences, keeping their contents.
fn strip_code_fences(text: &str) -> String {
    let fence = Regex::new(r"```[a-zA-Z]*\n?").expect("static regex");
    fence.replace_all(text, "").into_owned()
}

/// Find the first balanced top-level `[...]` span, skipping brackets
/// inside JSON string literals.
fn find_balanced_array(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let open = text.find('[')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_render_segments() {
        let segments = vec![
            seg(0.0, 4.5, "Welcome back to the show. "),
            seg(4.5, 9.8, "This episode is brought to you by..."),
        ];
        let rendered = render_segments(&segments);
        assert_eq!(
            rendered,
            "[0.0 - 4.5] Welcome back to the show.\n[4.5 - 9.8] This episode is brought to you by..."
        );
    }

    #[test]
    fn test_parse_bare_array() {
        let intervals =
            parse_ad_intervals(r#"[{"start": 0.0, "end": 10.0}, {"start": 20.0, "end": 30.0}]"#)
                .unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0], TimeInterval::new(0.0, 10.0));
        assert_eq!(intervals[1], TimeInterval::new(20.0, 30.0));
    }

    #[test]
    fn test_parse_array_wrapped_in_prose() {
        let response = "Looking at the transcript, I can identify two ad reads.\n\
                        The timestamps are: [{\"start\": 45.2, \"end\": 93.0}, {\"start\": 1200.5, \"end\": 1261.0}]\n\
                        Let me know if you need anything else.";
        let intervals = parse_ad_intervals(response).unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].start, 45.2);
    }

    #[test]
    fn test_parse_array_in_code_fence() {
        let response = "```json\n[{\"start\": 5, \"end\": 15}]\n```";
        let intervals = parse_ad_intervals(response).unwrap();
        assert_eq!(intervals, vec![TimeInterval::new(5.0, 15.0)]);
    }

    #[test]
    fn test_parse_empty_array_is_not_an_error() {
        let intervals = parse_ad_intervals("No ads found: []").unwrap();
        assert!(intervals.is_empty());
    }

    #[test]
    fn test_no_array_is_an_error() {
        let result = parse_ad_intervals("I could not find any advertisement segments.");
        assert!(matches!(
            result,
            Err(AdtrimError::MalformedClassifierOutput(_))
        ));
    }

    #[test]
    fn test_unbalanced_array_is_an_error() {
        let result = parse_ad_intervals(r#"[{"start": 0.0, "end": 10.0}"#);
        assert!(matches!(
            result,
            Err(AdtrimError::MalformedClassifierOutput(_))
        ));
    }

    #[test]
    fn test_unparseable_span_is_an_error() {
        let result = parse_ad_intervals("[not json at all]");
        assert!(matches!(
            result,
            Err(AdtrimError::MalformedClassifierOutput(_))
        ));
    }

    #[test]
    fn test_entry_missing_end_is_dropped() {
        // An entry missing its end beside a valid entry.
        let intervals =
            parse_ad_intervals(r#"[{"start": 10}, {"start": 20.0, "end": 30.0}]"#).unwrap();
        assert_eq!(intervals, vec![TimeInterval::new(20.0, 30.0)]);
    }

    #[test]
    fn test_entry_with_non_numeric_values_is_dropped() {
        let intervals =
            parse_ad_intervals(r#"[{"start": "ten", "end": "twenty"}, {"start": 1, "end": 2}]"#)
                .unwrap();
        assert_eq!(intervals, vec![TimeInterval::new(1.0, 2.0)]);
    }

    #[test]
    fn test_numeric_aside_does_not_mask_real_array() {
        // "[1, 2]" parses as a JSON array but holds no objects; the real
        // ad array later in the response must still be found.
        let response = "I checked minutes [1, 2] closely. The ads are:\n\
                        [{\"start\": 60.0, \"end\": 120.0}]";
        let intervals = parse_ad_intervals(response).unwrap();
        assert_eq!(intervals, vec![TimeInterval::new(60.0, 120.0)]);
    }

    #[test]
    fn test_only_non_object_arrays_is_an_error() {
        let result = parse_ad_intervals("See minutes [1, 2] and [3, 4].");
        assert!(matches!(
            result,
            Err(AdtrimError::MalformedClassifierOutput(_))
        ));
    }

    #[test]
    fn test_brackets_inside_strings_ignored() {
        let response = r#"The segments ("[intro]" excluded) are [{"start": 1.0, "end": 2.0}]"#;
        let intervals = parse_ad_intervals(response).unwrap();
        // The scan starts at the first '[', which sits inside a quote in
        // prose; prose quotes are not JSON strings, so the scanner treats
        // the bracket as structural and finds the balanced "[intro]" span
        // first. That span is not an array of objects, so extraction must
        // keep looking or fail loudly rather than return garbage.
        assert_eq!(intervals, vec![TimeInterval::new(1.0, 2.0)]);
    }

    #[test]
    fn test_find_balanced_array_nested() {
        let text = r#"x [1, [2, 3], {"a": "]"}] y"#;
        assert_eq!(find_balanced_array(text), Some(r#"[1, [2, 3], {"a": "]"}]"#));
    }
}
