//! Video metadata and subtitle retrieval.

use std::collections::HashSet;
use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

pub mod fetcher;

static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:v=|youtu\.be/|shorts/)([a-zA-Z0-9_-]{11})").unwrap());

static SUBTITLE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Display fields for a video. All lookups are best-effort, a failed
/// lookup yields [`VideoMeta::unknown`] rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMeta {
    pub title: String,
    pub channel: String,
    pub thumbnail: String,
}

impl VideoMeta {
    pub fn unknown() -> Self {
        Self {
            title: "Unknown".into(),
            channel: "Unknown".into(),
            thumbnail: String::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.title == "Unknown"
    }
}

/// Plain-text subtitles plus the language they were actually found in,
/// which may differ from the requested one.
#[derive(Debug, Clone)]
pub struct SubtitleTrack {
    pub text: String,
    pub used_lang: String,
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Browser whose cookie jar yt-dlp reads for age/region gated videos.
    pub cookie_browser: String,
}

pub trait VideoFetcher {
    /// Never fails; unknown or unreachable videos produce the sentinel meta.
    fn fetch_video_meta(
        &self,
        video_url: &str,
        opts: &FetchOptions,
    ) -> impl Future<Output = VideoMeta> + Send;

    fn download_subtitles(
        &self,
        video_url: &str,
        preferred_lang: &str,
        opts: &FetchOptions,
    ) -> impl Future<Output = Result<SubtitleTrack, Error>> + Send;
}

/// Pulls the 11-character video id out of watch/short/shortened URLs.
/// Inputs that match no known URL shape are returned as-is, callers may
/// pass a bare id directly.
pub fn extract_video_id(url: &str) -> String {
    VIDEO_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| url.to_string())
}

/// Reduces an SRT document to deduplicated plain text.
///
/// Sequence numbers, timing lines, inline tags and `&nbsp;` entities are
/// dropped. Auto-generated captions repeat lines as the rolling window
/// advances, and not always adjacently, so every line is kept only on its
/// first occurrence.
pub fn srt_to_text(srt: &str) -> String {
    let mut seen = HashSet::new();
    let mut lines: Vec<String> = Vec::new();

    for raw in srt.lines() {
        let line = raw.trim();
        if line.is_empty() || line.contains("-->") {
            continue;
        }
        if line.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        let cleaned = SUBTITLE_TAG_RE
            .replace_all(line, "")
            .replace("&nbsp;", " ")
            .trim()
            .to_string();
        if cleaned.is_empty() {
            continue;
        }

        if seen.insert(cleaned.clone()) {
            lines.push(cleaned);
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_id_from_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn video_id_from_short_link_and_shorts() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=42"),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://youtube.com/shorts/abc123DEF45"),
            "abc123DEF45"
        );
    }

    #[test]
    fn unrecognized_input_passes_through() {
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), "dQw4w9WgXcQ");
    }

    #[test]
    fn srt_cleanup_drops_numbering_timing_and_tags() {
        let srt = "\
1
00:00:01,000 --> 00:00:03,000
<i>Hallo</i> Welt

2
00:00:03,000 --> 00:00:05,000
Hallo Welt

3
00:00:05,000 --> 00:00:07,000
Weiter&nbsp;geht's
";
        assert_eq!(srt_to_text(srt), "Hallo Welt\nWeiter geht's");
    }

    #[test]
    fn srt_cleanup_drops_non_adjacent_repeats() {
        // rolling captions re-emit earlier lines after intervening cues
        let srt = "\
1
00:00:01,000 --> 00:00:03,000
Hallo Welt

2
00:00:03,000 --> 00:00:05,000
Zwischenzeile

3
00:00:05,000 --> 00:00:07,000
Hallo Welt
";
        assert_eq!(srt_to_text(srt), "Hallo Welt\nZwischenzeile");
    }

    #[test]
    fn srt_cleanup_of_empty_input() {
        assert_eq!(srt_to_text(""), "");
    }

    #[test]
    fn unknown_meta_sentinel() {
        let meta = VideoMeta::unknown();
        assert!(meta.is_unknown());
        assert!(meta.thumbnail.is_empty());
    }
}
