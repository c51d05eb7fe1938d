//! Source Resolver: classifies clipboard text as a YouTube URL, a local
//! media file path, or irrelevant, and derives the canonical dedup identity.

use std::path::Path;
use url::Url;

use crate::orchestrator::{SourceKind, WorkItem};

/// Resolve a piece of clipboard text into a work item.
///
/// Returns `None` for anything that is not a parseable YouTube URL and not
/// an existing local file. Pure apart from the file-existence check on the
/// local-path branch.
pub fn resolve(text: &str) -> Option<WorkItem> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(video_id) = youtube_video_id(text) {
        return Some(WorkItem::new(text, SourceKind::YouTubeUrl, video_id));
    }

    local_file_id(text).map(|id| WorkItem::new(text, SourceKind::LocalFile, id))
}

/// Extract the 11-character video ID from the common YouTube URL shapes:
/// `watch?v=`, `youtu.be/`, `embed/`, `v/` and `shorts/`, with or without
/// scheme and `www.`/`m.` prefixes.
pub fn youtube_video_id(text: &str) -> Option<String> {
    // Clipboard text often lacks a scheme; Url::parse requires one.
    let candidate = if text.contains("://") {
        text.to_string()
    } else {
        format!("https://{}", text)
    };

    let url = Url::parse(&candidate).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    let mut segments = url.path_segments()?;

    let id = match host {
        "youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "m.youtube.com" | "youtube-nocookie.com" => {
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("embed") | Some("v") | Some("shorts") => {
                    segments.next().map(str::to_string)
                }
                _ => None,
            }
        }
        _ => None,
    }?;

    if is_video_id(&id) {
        Some(id)
    } else {
        None
    }
}

/// YouTube video IDs are exactly 11 characters of [A-Za-z0-9_-].
fn is_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Canonical identity for an existing local media file: the OS-normalized
/// absolute path.
fn local_file_id(text: &str) -> Option<String> {
    if text.starts_with("http://") || text.starts_with("https://") {
        return None;
    }

    let path = Path::new(text);
    if !path.is_file() {
        return None;
    }

    let absolute = path.canonicalize().ok()?;
    Some(absolute.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_watch_urls() {
        let item = resolve("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(item.source_kind, SourceKind::YouTubeUrl);
        assert_eq!(item.canonical_id, "dQw4w9WgXcQ");
    }

    #[test]
    fn recognizes_short_links() {
        let item = resolve("https://youtu.be/dQw4w9WgXcQ?t=42").unwrap();
        assert_eq!(item.canonical_id, "dQw4w9WgXcQ");
    }

    #[test]
    fn recognizes_embed_shorts_and_v_paths() {
        for url in [
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://youtube.com/shorts/dQw4w9WgXcQ",
            "https://m.youtube.com/v/dQw4w9WgXcQ",
        ] {
            let item = resolve(url).unwrap();
            assert_eq!(item.canonical_id, "dQw4w9WgXcQ", "url: {}", url);
        }
    }

    #[test]
    fn accepts_urls_without_scheme() {
        let item = resolve("youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(item.canonical_id, "dQw4w9WgXcQ");
    }

    #[test]
    fn rejects_malformed_video_ids() {
        assert!(resolve("https://youtu.be/short").is_none());
        assert!(resolve("https://www.youtube.com/watch?v=way_too_long_for_an_id").is_none());
        assert!(resolve("https://www.youtube.com/watch").is_none());
    }

    #[test]
    fn rejects_unrelated_text() {
        assert!(resolve("").is_none());
        assert!(resolve("   ").is_none());
        assert!(resolve("hello world").is_none());
        assert!(resolve("https://example.com/watch?v=dQw4w9WgXcQ").is_none());
        assert!(resolve("https://vimeo.com/12345").is_none());
    }

    #[test]
    fn resolves_existing_files_to_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("clip.mp3");
        fs_err::write(&file, b"audio").unwrap();

        let item = resolve(file.to_str().unwrap()).unwrap();
        assert_eq!(item.source_kind, SourceKind::LocalFile);
        assert!(Path::new(&item.canonical_id).is_absolute());
    }

    #[test]
    fn rejects_missing_paths_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve("/no/such/file.mp3").is_none());
        assert!(resolve(dir.path().to_str().unwrap()).is_none());
    }
}
