//! The core summarization pipeline: one fire-and-forget job per submitted
//! video, advancing queued → metadata → transcript → summarizing → done.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use glaskugel_datastore::{DataStore, NewJob, NewPrediction};

use crate::{
    events::{EventBus, ProgressEvent, ProgressStep},
    extractor::extract_summary_meta,
    summarizer::{Summarizer, SummaryOptions, TranscriptContext},
    yt::{extract_video_id, FetchOptions, VideoFetcher},
};

pub mod builder;

/// A manual submission. Hints are optional; anything missing is filled in
/// from fetched metadata or conventional defaults.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub video_url: String,
    pub lang: Option<String>,
    pub video_title: Option<String>,
    pub channel_name: Option<String>,
    pub thumbnail_url: Option<String>,
}

struct Inner<D, F, S> {
    store: D,
    fetcher: F,
    summarizer: S,
    bus: EventBus,
}

/// Orchestrates summarization jobs over a datastore, a video fetcher and a
/// summarizer. Cheap to clone; all clones share the collaborators and the
/// event bus.
pub struct SummaryPipeline<D, F, S>
where
    D: DataStore + Send + Sync + 'static,
    F: VideoFetcher + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
{
    inner: Arc<Inner<D, F, S>>,
}

impl<D, F, S> Clone for SummaryPipeline<D, F, S>
where
    D: DataStore + Send + Sync + 'static,
    F: VideoFetcher + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        SummaryPipeline {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D, F, S> SummaryPipeline<D, F, S>
where
    D: DataStore + Send + Sync + 'static,
    F: VideoFetcher + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
{
    pub fn event_bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Creates the job record, announces it and spawns the pipeline run.
    /// Returns the new job id as soon as the record exists; step failures
    /// after that surface only through the job record and the event bus.
    #[tracing::instrument(skip(self))]
    pub async fn submit(&self, request: SubmitRequest) -> anyhow::Result<String> {
        let settings = self
            .inner
            .store
            .load_settings()
            .await
            .context("Failed to load settings")?;

        let video_id = extract_video_id(&request.video_url);
        let lang = request
            .lang
            .clone()
            .filter(|l| !l.is_empty())
            .unwrap_or(settings.default_lang);
        let label = display_label(&request);

        let job_id = format!("{}_{}", Utc::now().timestamp_millis(), video_id);
        let job = NewJob {
            id: job_id.clone(),
            video_id,
            video_url: request.video_url.clone(),
            video_title: request.video_title.clone().unwrap_or_default(),
            channel_name: request.channel_name.clone().unwrap_or_default(),
            thumbnail_url: request.thumbnail_url.clone().unwrap_or_default(),
            lang: lang.clone(),
        };
        self.inner
            .store
            .create_job(&job)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to create job"))
            .context("Failed to create job")?;

        self.emit(&job_id, &label, ProgressStep::Queued, "In Warteschlange...");

        let pipeline = self.clone();
        let id = job_id.clone();
        tokio::spawn(async move {
            pipeline.process(id, request, lang, label).await;
        });

        Ok(job_id)
    }

    /// Runs all steps for one job. Never returns an error: any step failure
    /// becomes the job's terminal `error` status plus one `error` event.
    #[tracing::instrument(skip(self, request, label), fields(job_id = %job_id))]
    async fn process(&self, job_id: String, request: SubmitRequest, lang: String, label: String) {
        if let Err(e) = self.run_steps(&job_id, &request, &lang).await {
            let mut message = e.to_string();
            if message.is_empty() {
                message = "Unknown error".to_string();
            }
            tracing::error!(error = ?e, job_id, "Job failed");

            if let Err(e) = self.inner.store.update_job_error(&job_id, &message).await {
                tracing::error!(error = ?e, job_id, "Failed to persist error status");
            }
            self.emit(&job_id, &label, ProgressStep::Error, &message);
        }
    }

    async fn run_steps(
        &self,
        job_id: &str,
        request: &SubmitRequest,
        lang: &str,
    ) -> anyhow::Result<()> {
        let store = &self.inner.store;
        let settings = store
            .load_settings()
            .await
            .context("Failed to load settings")?;

        // ── metadata ───────────────────────────────────────────────────────
        let label = display_label(request);
        self.emit(
            job_id,
            &label,
            ProgressStep::Metadata,
            "Video-Metadaten werden geladen...",
        );

        let fetch_opts = FetchOptions {
            cookie_browser: settings.cookie_browser.clone(),
        };
        let meta = self
            .inner
            .fetcher
            .fetch_video_meta(&request.video_url, &fetch_opts)
            .await;
        let title = if !meta.is_unknown() {
            meta.title.clone()
        } else {
            request
                .video_title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Unknown".to_string())
        };
        let channel = if meta.channel != "Unknown" {
            meta.channel.clone()
        } else {
            request
                .channel_name
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "Unknown".to_string())
        };
        let thumbnail = [meta.thumbnail.clone(), request.thumbnail_url.clone().unwrap_or_default()]
            .into_iter()
            .find(|t| !t.is_empty())
            .unwrap_or_else(|| {
                format!(
                    "https://img.youtube.com/vi/{}/maxresdefault.jpg",
                    extract_video_id(&request.video_url)
                )
            });

        // persisted right away so partial progress survives later failures
        store
            .update_job_meta(job_id, &title, &channel, &thumbnail)
            .await
            .context("Failed to persist video metadata")?;

        // ── transcript ─────────────────────────────────────────────────────
        let attempted = if lang == "en" {
            "en".to_string()
        } else {
            format!("{lang}, en")
        };
        self.emit(
            job_id,
            &title,
            ProgressStep::Transcript,
            format!("Untertitel werden heruntergeladen ({attempted})..."),
        );

        let track = self
            .inner
            .fetcher
            .download_subtitles(&request.video_url, lang, &fetch_opts)
            .await?;

        if track.used_lang != lang {
            store
                .update_job_lang(job_id, &track.used_lang)
                .await
                .context("Failed to persist corrected language")?;
            self.emit(
                job_id,
                &title,
                ProgressStep::Transcript,
                format!("Kein '{lang}' gefunden, verwende '{}'", track.used_lang),
            );
        }

        // ── summarizing ────────────────────────────────────────────────────
        // fresh snapshot so prompt/model edits made mid-download apply
        let settings = store
            .load_settings()
            .await
            .context("Failed to load settings")?;

        // readiness is checked before the step is announced, an unconfigured
        // credential must not produce a summarizing event
        self.inner.summarizer.ensure_ready().map_err(Into::into)?;

        self.emit(
            job_id,
            &title,
            ProgressStep::Summarizing,
            format!("KI-Zusammenfassung läuft ({})...", settings.openai_model),
        );

        let bus = self.inner.bus.clone();
        let progress_job_id = job_id.to_string();
        let progress_title = title.clone();
        let on_progress = move |msg: &str| {
            bus.publish(ProgressEvent::new(
                progress_job_id.clone(),
                progress_title.clone(),
                ProgressStep::Summarizing,
                msg,
            ));
        };
        let context = TranscriptContext {
            title: Some(title.clone()),
            channel: Some(channel.clone()),
        };
        let summary = self
            .inner
            .summarizer
            .summarize(
                &track.text,
                SummaryOptions {
                    model: &settings.openai_model,
                    prompt_template: &settings.summary_prompt,
                    context: Some(&context),
                    on_progress: Some(&on_progress),
                },
            )
            .await
            .map_err(Into::into)?;

        store
            .update_job_done(job_id, &track.text, &summary, &settings.summary_prompt)
            .await
            .context("Failed to persist summary")?;

        // ── extraction, folded into completion ─────────────────────────────
        // best effort: the job is already done, extraction hiccups must not
        // flip it to error
        let extracted = extract_summary_meta(&summary);
        if !extracted.author.is_empty() {
            if let Err(e) = store.update_job_author(job_id, &extracted.author).await {
                tracing::warn!(error = ?e, job_id, "Failed to persist author");
            }
        }
        if !extracted.predictions.is_empty() {
            let rows: Vec<NewPrediction> = extracted
                .predictions
                .iter()
                .map(|p| NewPrediction {
                    job_id: job_id.to_string(),
                    video_title: title.clone(),
                    video_url: request.video_url.clone(),
                    channel_name: channel.clone(),
                    author: extracted.author.clone(),
                    asset_name: p.name.clone(),
                    direction: p.direction.clone(),
                    if_cases: p.if_cases.clone(),
                    price_target: p.price_target.clone(),
                })
                .collect();
            match store.insert_predictions(&rows).await {
                Ok(count) => tracing::info!(job_id, count, "Persisted predictions"),
                Err(e) => tracing::warn!(error = ?e, job_id, "Failed to persist predictions"),
            }
        }

        self.emit(job_id, &title, ProgressStep::Done, "Fertig!");
        Ok(())
    }

    fn emit(&self, job_id: &str, title: &str, step: ProgressStep, message: impl Into<String>) {
        self.inner
            .bus
            .publish(ProgressEvent::new(job_id, title, step, message));
    }
}

/// Best-known display title before metadata is fetched.
fn display_label(request: &SubmitRequest) -> String {
    request
        .video_title
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| request.video_url.clone())
}
