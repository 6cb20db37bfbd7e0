//! yt-dlp backed [`VideoFetcher`].

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use tokio::process::Command;

use crate::error::Error;
use crate::yt::{srt_to_text, FetchOptions, SubtitleTrack, VideoFetcher, VideoMeta};

/// Shells out to the `yt-dlp` binary on PATH. One subprocess per call,
/// no state is shared between invocations.
#[derive(Debug, Clone, Default)]
pub struct YtDlpFetcher;

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self
    }

    async fn dump_json(&self, video_url: &str, cookie_browser: &str) -> Option<Value> {
        let mut cmd = Command::new("yt-dlp");
        cmd.arg("--dump-json").arg("--skip-download");
        // gated videos need the cookie jar for the metadata dump as well
        if !cookie_browser.is_empty() {
            cmd.arg("--cookies-from-browser").arg(cookie_browser);
        }
        cmd.arg(video_url);

        let output = cmd
            .output()
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Failed to spawn yt-dlp"))
            .ok()?;

        if !output.status.success() {
            tracing::warn!(
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "yt-dlp metadata dump failed"
            );
            return None;
        }

        serde_json::from_slice(&output.stdout)
            .inspect_err(|e| tracing::warn!(error = %e, "Unparseable yt-dlp metadata"))
            .ok()
    }

    /// Tries both subtitle variants for one language: auto-generated
    /// captions first, creator-uploaded second.
    async fn try_download_lang(
        &self,
        video_url: &str,
        lang: &str,
        cookie_browser: &str,
    ) -> Result<Option<String>, Error> {
        for variant in ["--write-auto-sub", "--write-sub"] {
            let dir = subtitle_work_dir(lang);
            tokio::fs::create_dir_all(&dir).await?;

            let mut cmd = Command::new("yt-dlp");
            cmd.arg(variant)
                .arg("--sub-lang")
                .arg(lang)
                .arg("--skip-download")
                .arg("--sub-format")
                .arg("srt")
                .arg("-o")
                .arg(dir.join("%(id)s.%(ext)s"));
            if !cookie_browser.is_empty() {
                cmd.arg("--cookies-from-browser").arg(cookie_browser);
            }
            cmd.arg(video_url);

            let output = cmd
                .output()
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "Failed to spawn yt-dlp"))?;
            if !output.status.success() {
                tracing::debug!(
                    lang,
                    variant,
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "yt-dlp subtitle download failed"
                );
            }

            let text = first_srt_in(&dir).await?.map(|srt| srt_to_text(&srt));
            let _ = tokio::fs::remove_dir_all(&dir).await;

            if let Some(text) = text.filter(|t| !t.is_empty()) {
                return Ok(Some(text));
            }
        }

        Ok(None)
    }
}

fn subtitle_work_dir(lang: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "glaskugel_subs_{}_{}",
        Utc::now().timestamp_millis(),
        lang
    ))
}

async fn first_srt_in(dir: &Path) -> Result<Option<String>, Error> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "srt") {
            return Ok(Some(tokio::fs::read_to_string(&path).await?));
        }
    }
    Ok(None)
}

fn str_field(json: &Value, key: &str) -> Option<String> {
    json.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

impl VideoFetcher for YtDlpFetcher {
    async fn fetch_video_meta(&self, video_url: &str, opts: &FetchOptions) -> VideoMeta {
        let Some(json) = self.dump_json(video_url, &opts.cookie_browser).await else {
            return VideoMeta::unknown();
        };

        let title = str_field(&json, "title").unwrap_or_else(|| "Unknown".into());
        let channel = str_field(&json, "channel")
            .or_else(|| str_field(&json, "uploader"))
            .unwrap_or_else(|| "Unknown".into());
        let thumbnail = str_field(&json, "thumbnail")
            .or_else(|| {
                json.get("thumbnails")
                    .and_then(Value::as_array)
                    .and_then(|t| t.last())
                    .and_then(|t| t.get("url"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_default();

        VideoMeta {
            title,
            channel,
            thumbnail,
        }
    }

    async fn download_subtitles(
        &self,
        video_url: &str,
        preferred_lang: &str,
        opts: &FetchOptions,
    ) -> Result<SubtitleTrack, Error> {
        let mut langs = vec![preferred_lang.to_string()];
        if preferred_lang != "en" {
            langs.push("en".into());
        }

        for lang in &langs {
            if let Some(text) = self
                .try_download_lang(video_url, lang, &opts.cookie_browser)
                .await?
            {
                return Ok(SubtitleTrack {
                    text,
                    used_lang: lang.clone(),
                });
            }
            tracing::info!(lang, video_url, "No subtitles in language, trying next");
        }

        Err(Error::NoSubtitles { attempted: langs })
    }
}
