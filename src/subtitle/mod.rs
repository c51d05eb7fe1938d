//! SRT rendering and parsing plus deterministic artifact naming.

use anyhow::Context;

use crate::backend::Segment;
use crate::utils::sanitize_filename;
use crate::Result;

/// Render segments as SRT: a numbered cue per segment with
/// `HH:MM:SS,mmm --> HH:MM:SS,mmm` timing lines.
///
/// Deterministic for the same input; no I/O.
pub fn render(segments: &[Segment]) -> String {
    let mut out = String::new();

    for (i, segment) in segments.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(segment.start),
            format_timestamp(segment.end),
            segment.text.trim(),
        ));
    }

    out
}

/// Parse SRT content back into segments. Inverse of [`render`] for cue
/// texts without blank lines.
pub fn parse(content: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();

    for block in content.split("\n\n").filter(|b| !b.trim().is_empty()) {
        let mut lines = block.lines();

        let index_line = lines.next().context("missing cue index")?;
        index_line
            .trim()
            .parse::<usize>()
            .with_context(|| format!("invalid cue index: {}", index_line))?;

        let timing = lines.next().context("missing timing line")?;
        let (start, end) = timing
            .split_once("-->")
            .context("malformed timing line")?;
        let start = parse_timestamp(start.trim())
            .with_context(|| format!("invalid start time: {}", start))?;
        let end = parse_timestamp(end.trim())
            .with_context(|| format!("invalid end time: {}", end))?;

        let text = lines.collect::<Vec<_>>().join("\n");
        if text.is_empty() {
            anyhow::bail!("cue has no text");
        }

        segments.push(Segment { start, end, text });
    }

    Ok(segments)
}

/// Format seconds as `HH:MM:SS,mmm`, rounding to the nearest millisecond.
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_seconds = total_ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, ms)
}

fn parse_timestamp(text: &str) -> Option<f64> {
    let (hms, ms) = text.split_once(',')?;
    let mut parts = hms.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes > 59 || seconds > 59 {
        return None;
    }
    let ms: u64 = ms.parse().ok()?;
    if ms > 999 {
        return None;
    }

    let total_ms = ((hours * 3600 + minutes * 60 + seconds) * 1000) + ms;
    Some(total_ms as f64 / 1000.0)
}

/// Deterministic artifact filename for a work item: the sanitized source
/// title when available, otherwise the canonical ID.
pub fn artifact_name(title: Option<&str>, canonical_id: &str) -> String {
    let base = title
        .map(sanitize_filename)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| sanitize_filename(canonical_id));

    format!("{}.srt", base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, text: &str) -> Segment {
        Segment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn renders_numbered_cues() {
        let srt = render(&[
            segment(0.0, 2.0, "こんにちは"),
            segment(2.5, 4.75, "world"),
        ]);

        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:02,000\nこんにちは\n\n\
             2\n00:00:02,500 --> 00:00:04,750\nworld\n\n"
        );
    }

    #[test]
    fn render_parse_round_trip() {
        let segments = vec![
            segment(0.0, 2.0, "first"),
            segment(2.04, 5.5, "second line"),
            segment(3661.25, 3670.001, "an hour in"),
        ];

        let parsed = parse(&render(&segments)).unwrap();
        assert_eq!(parsed, segments);
    }

    #[test]
    fn timestamps_wrap_hours_minutes_seconds() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(59.9996), "00:01:00,000");
        assert_eq!(format_timestamp(3723.456), "01:02:03,456");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse("not an srt file").is_err());
        assert!(parse("1\n00:00:00,000 --> bogus\ntext\n\n").is_err());
        assert!(parse("1\n00:00:00,000 --> 00:00:01,000\n\n").is_err());
    }

    #[test]
    fn artifact_name_prefers_sanitized_title() {
        assert_eq!(
            artifact_name(Some("My Video: Part 1/3"), "dQw4w9WgXcQ"),
            "My Video_ Part 1_3.srt"
        );
        assert_eq!(artifact_name(None, "dQw4w9WgXcQ"), "dQw4w9WgXcQ.srt");
    }
}
