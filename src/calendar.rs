//! Calendar extraction
//!
//! Parses raw calendar text into Commitment records. Parsing is
//! best-effort: lines that do not match the expected shape are skipped and
//! recorded as issues, never aborting the run.
//!
//! Recognized line shape: `HH:MM - HH:MM  Description[ at Location]`,
//! 24-hour times. The location is the substring after the last locative
//! preposition on the line. Markdown headers and blank lines are skipped
//! silently.

use chrono::NaiveTime;
use tracing::debug;

use crate::domain::{Commitment, RunIssue};

/// Prepositions that introduce a trailing location phrase
const LOCATIVE_PREPOSITIONS: [&str; 2] = [" at ", " in "];

/// Result of extracting one calendar document
#[derive(Debug, Default)]
pub struct ParsedCalendar {
    /// Commitments in input order
    pub commitments: Vec<Commitment>,
    /// One issue per skipped line
    pub issues: Vec<RunIssue>,
}

/// Extract commitments from raw calendar text
///
/// Output ordering matches input ordering. Empty input yields an empty
/// result, not an error.
pub fn extract(text: &str) -> ParsedCalendar {
    let mut parsed = ParsedCalendar::default();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        // Headers and blank lines are structure, not events
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_line(line) {
            Ok(commitment) => parsed.commitments.push(commitment),
            Err(reason) => {
                debug!(line_no, %reason, "extract: skipping malformed line");
                parsed.issues.push(RunIssue::Parse {
                    line_no,
                    line: line.to_string(),
                    reason,
                });
            }
        }
    }

    debug!(
        commitments = parsed.commitments.len(),
        skipped = parsed.issues.len(),
        "extract: done"
    );
    parsed
}

/// Parse a single non-empty calendar line
fn parse_line(line: &str) -> Result<Commitment, String> {
    let (start_txt, rest) = line
        .split_once('-')
        .ok_or_else(|| "missing time range separator".to_string())?;

    let start = parse_time(start_txt.trim()).ok_or_else(|| format!("invalid start time '{}'", start_txt.trim()))?;

    let rest = rest.trim_start();
    let split_at = rest
        .find(char::is_whitespace)
        .ok_or_else(|| "missing description after time range".to_string())?;
    let (end_txt, desc_raw) = rest.split_at(split_at);

    let end = parse_time(end_txt).ok_or_else(|| format!("invalid end time '{}'", end_txt))?;

    if start >= end {
        return Err(format!("start {} is not before end {}", start_txt.trim(), end_txt));
    }

    let desc_raw = desc_raw.trim();
    if desc_raw.is_empty() {
        return Err("empty description".to_string());
    }

    let (description, location) = split_location(desc_raw);
    Ok(Commitment::new(start, end, description, location))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

/// Split a description into (description, location) on the last locative
/// preposition; no preposition yields an empty location
fn split_location(desc: &str) -> (&str, &str) {
    let best = LOCATIVE_PREPOSITIONS
        .iter()
        .filter_map(|prep| desc.rfind(prep).map(|pos| (pos, prep.len())))
        .max_by_key(|(pos, _)| *pos);

    match best {
        Some((pos, prep_len)) => {
            let location = desc[pos + prep_len..].trim();
            if location.is_empty() {
                (desc, "")
            } else {
                (desc[..pos].trim_end(), location)
            }
        }
        None => (desc, ""),
    }
}

/// Render a commitment back into the calendar line shape
///
/// Inverse of `extract` for well-formed lines: the time window and location
/// text survive the round trip.
pub fn render_line(commitment: &Commitment) -> String {
    let mut line = format!(
        "{} - {}  {}",
        commitment.start.format("%H:%M"),
        commitment.end.format("%H:%M"),
        commitment.description,
    );
    if commitment.has_location() {
        line.push_str(" at ");
        line.push_str(&commitment.location_text);
    }
    line
}
