use std::{collections::HashMap, future::Future};

use crate::{Job, NewJob, NewPrediction, Prediction, Settings};

pub mod postgres;

/// Persistence operations the pipeline needs. Every write is a single
/// statement keyed by job id, so concurrent jobs never contend on one row.
pub trait DataStore {
    fn create_job(&self, job: &NewJob) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn get_job(&self, id: &str) -> impl Future<Output = anyhow::Result<Option<Job>>> + Send;

    fn list_jobs(&self) -> impl Future<Output = anyhow::Result<Vec<Job>>> + Send;

    fn update_job_meta(
        &self,
        id: &str,
        title: &str,
        channel: &str,
        thumbnail: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn update_job_lang(
        &self,
        id: &str,
        lang: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn update_job_done(
        &self,
        id: &str,
        transcript: &str,
        summary: &str,
        prompt: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn update_job_author(
        &self,
        id: &str,
        author: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn update_job_error(
        &self,
        id: &str,
        message: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Deletes a job; owned predictions go with it. Returns whether a row
    /// was actually removed.
    fn delete_job(&self, id: &str) -> impl Future<Output = anyhow::Result<bool>> + Send;

    /// Maps video id -> job id for every job that is not in `error` status.
    /// Failed videos are deliberately absent so they can be resubmitted
    /// without being treated as duplicates.
    fn summarized_video_ids(
        &self,
    ) -> impl Future<Output = anyhow::Result<HashMap<String, String>>> + Send;

    /// Bulk-inserts prediction rows. Returns the number of rows written.
    fn insert_predictions(
        &self,
        rows: &[NewPrediction],
    ) -> impl Future<Output = anyhow::Result<usize>> + Send;

    fn list_predictions(&self) -> impl Future<Output = anyhow::Result<Vec<Prediction>>> + Send;

    fn delete_prediction(&self, id: &str) -> impl Future<Output = anyhow::Result<bool>> + Send;

    fn delete_predictions_by_job(
        &self,
        job_id: &str,
    ) -> impl Future<Output = anyhow::Result<u64>> + Send;

    /// Read-only settings snapshot, merged over the shipped defaults.
    fn load_settings(&self) -> impl Future<Output = anyhow::Result<Settings>> + Send;
}

impl<T: DataStore + Send + Sync> DataStore for &T {
    async fn create_job(&self, job: &NewJob) -> anyhow::Result<()> {
        (**self).create_job(job).await
    }

    async fn get_job(&self, id: &str) -> anyhow::Result<Option<Job>> {
        (**self).get_job(id).await
    }

    async fn list_jobs(&self) -> anyhow::Result<Vec<Job>> {
        (**self).list_jobs().await
    }

    async fn update_job_meta(
        &self,
        id: &str,
        title: &str,
        channel: &str,
        thumbnail: &str,
    ) -> anyhow::Result<()> {
        (**self).update_job_meta(id, title, channel, thumbnail).await
    }

    async fn update_job_lang(&self, id: &str, lang: &str) -> anyhow::Result<()> {
        (**self).update_job_lang(id, lang).await
    }

    async fn update_job_done(
        &self,
        id: &str,
        transcript: &str,
        summary: &str,
        prompt: &str,
    ) -> anyhow::Result<()> {
        (**self).update_job_done(id, transcript, summary, prompt).await
    }

    async fn update_job_author(&self, id: &str, author: &str) -> anyhow::Result<()> {
        (**self).update_job_author(id, author).await
    }

    async fn update_job_error(&self, id: &str, message: &str) -> anyhow::Result<()> {
        (**self).update_job_error(id, message).await
    }

    async fn delete_job(&self, id: &str) -> anyhow::Result<bool> {
        (**self).delete_job(id).await
    }

    async fn summarized_video_ids(&self) -> anyhow::Result<HashMap<String, String>> {
        (**self).summarized_video_ids().await
    }

    async fn insert_predictions(&self, rows: &[NewPrediction]) -> anyhow::Result<usize> {
        (**self).insert_predictions(rows).await
    }

    async fn list_predictions(&self) -> anyhow::Result<Vec<Prediction>> {
        (**self).list_predictions().await
    }

    async fn delete_prediction(&self, id: &str) -> anyhow::Result<bool> {
        (**self).delete_prediction(id).await
    }

    async fn delete_predictions_by_job(&self, job_id: &str) -> anyhow::Result<u64> {
        (**self).delete_predictions_by_job(job_id).await
    }

    async fn load_settings(&self) -> anyhow::Result<Settings> {
        (**self).load_settings().await
    }
}
