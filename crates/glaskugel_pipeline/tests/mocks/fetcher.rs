use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use glaskugel_pipeline::{
    yt::{FetchOptions, SubtitleTrack, VideoFetcher, VideoMeta},
    Error,
};

/// Fetcher with canned metadata and per-language subtitle tracks.
#[derive(Clone)]
pub struct MockFetcher {
    pub meta: VideoMeta,
    pub tracks: HashMap<String, String>,
    /// (url, cookie_browser) per metadata fetch.
    pub meta_calls: Arc<Mutex<Vec<(String, String)>>>,
    pub subtitle_calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self {
            meta: VideoMeta {
                title: "Marktausblick 2026".to_string(),
                channel: "Finanzkanal".to_string(),
                thumbnail: "https://example.com/thumb.jpg".to_string(),
            },
            tracks: HashMap::from([("de".to_string(), "Hallo und willkommen.".to_string())]),
            meta_calls: Arc::new(Mutex::new(Vec::new())),
            subtitle_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockFetcher {
    pub fn with_tracks(tracks: &[(&str, &str)]) -> Self {
        Self {
            tracks: tracks
                .iter()
                .map(|(l, t)| (l.to_string(), t.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn without_subtitles() -> Self {
        Self {
            tracks: HashMap::new(),
            ..Default::default()
        }
    }

    pub fn unknown_meta(mut self) -> Self {
        self.meta = VideoMeta::unknown();
        self
    }
}

impl VideoFetcher for MockFetcher {
    async fn fetch_video_meta(&self, video_url: &str, opts: &FetchOptions) -> VideoMeta {
        self.meta_calls
            .lock()
            .unwrap()
            .push((video_url.to_string(), opts.cookie_browser.clone()));
        self.meta.clone()
    }

    async fn download_subtitles(
        &self,
        video_url: &str,
        preferred_lang: &str,
        _opts: &FetchOptions,
    ) -> Result<SubtitleTrack, Error> {
        self.subtitle_calls
            .lock()
            .unwrap()
            .push((video_url.to_string(), preferred_lang.to_string()));

        let mut langs = vec![preferred_lang.to_string()];
        if preferred_lang != "en" {
            langs.push("en".to_string());
        }

        for lang in &langs {
            if let Some(text) = self.tracks.get(lang) {
                return Ok(SubtitleTrack {
                    text: text.clone(),
                    used_lang: lang.clone(),
                });
            }
        }
        Err(Error::NoSubtitles { attempted: langs })
    }
}
