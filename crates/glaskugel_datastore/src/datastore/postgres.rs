use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};

use crate::{
    datastore::DataStore, Job, JobStatus, NewJob, NewPrediction, Prediction, Settings,
};

static MIGRATOR: Migrator = sqlx::migrate!();

const JOB_COLUMNS: &str = "id, video_id, video_url, video_title, channel_name, author, \
     thumbnail_url, lang, transcript, summary, custom_prompt, status, error_message, created_at";

#[derive(Debug, Clone)]
pub struct PgDataStore {
    pub pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    video_id: String,
    video_url: String,
    video_title: String,
    channel_name: String,
    author: String,
    thumbnail_url: String,
    lang: String,
    transcript: String,
    summary: String,
    custom_prompt: String,
    status: String,
    error_message: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = anyhow::Error;

    fn try_from(row: JobRow) -> anyhow::Result<Self> {
        let status = JobStatus::parse(&row.status)
            .ok_or_else(|| anyhow::anyhow!("Unknown job status in row {}: {}", row.id, row.status))?;
        Ok(Job {
            id: row.id,
            video_id: row.video_id,
            video_url: row.video_url,
            video_title: row.video_title,
            channel_name: row.channel_name,
            author: row.author,
            thumbnail_url: row.thumbnail_url,
            lang: row.lang,
            transcript: row.transcript,
            summary: row.summary,
            custom_prompt: row.custom_prompt,
            status,
            error_message: row.error_message,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PredictionRow {
    id: String,
    job_id: String,
    video_title: String,
    video_url: String,
    channel_name: String,
    author: String,
    asset_name: String,
    direction: String,
    if_cases: String,
    price_target: String,
    created_at: DateTime<Utc>,
}

impl From<PredictionRow> for Prediction {
    fn from(row: PredictionRow) -> Self {
        Prediction {
            id: row.id,
            job_id: row.job_id,
            video_title: row.video_title,
            video_url: row.video_url,
            channel_name: row.channel_name,
            author: row.author,
            asset_name: row.asset_name,
            direction: row.direction,
            if_cases: row.if_cases,
            price_target: row.price_target,
            created_at: row.created_at,
        }
    }
}

impl PgDataStore {
    /// Establish connection to database, run migrations and seed default
    /// settings if this is the first run.
    pub async fn init(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .inspect_err(
                |e| tracing::error!(error = ?e, "Failed to establish connection to database"),
            )
            .context("Failed to connect to postgres database")?;

        MIGRATOR
            .run(&pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to run database migrations"))
            .context("Failed to run database migrations")?;

        let store = PgDataStore { pool };
        store.seed_default_settings().await?;

        Ok(store)
    }

    async fn seed_default_settings(&self) -> anyhow::Result<()> {
        let defaults = Settings::default();
        for (key, value) in [
            ("summary_prompt", defaults.summary_prompt.clone()),
            ("default_lang", defaults.default_lang.clone()),
            ("cookie_browser", defaults.cookie_browser.clone()),
            ("openai_model", defaults.openai_model.clone()),
            (
                "blocked_channels",
                serde_json::to_string(&defaults.blocked_channels)?,
            ),
        ] {
            sqlx::query("INSERT INTO settings (key, value) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(key)
                .bind(&value)
                .execute(&self.pool)
                .await
                .context("Failed to seed default settings")?;
        }
        Ok(())
    }

    /// Writes a partial settings update. Only known keys are touched.
    pub async fn update_settings(&self, updates: &[(&str, String)]) -> anyhow::Result<()> {
        const KNOWN_KEYS: [&str; 5] = [
            "summary_prompt",
            "default_lang",
            "cookie_browser",
            "openai_model",
            "blocked_channels",
        ];

        for (key, value) in updates {
            if !KNOWN_KEYS.contains(key) {
                anyhow::bail!("Unknown settings key: {key}");
            }
            sqlx::query(
                "INSERT INTO settings (key, value) VALUES ($1, $2) \
                 ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
            )
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, key, "Failed to update setting"))
            .context("Failed to update settings")?;
        }
        Ok(())
    }
}

/// The job id keeps ids from concurrent jobs apart even when they insert
/// within the same millisecond; the timestamp keeps re-extractions for one
/// job apart.
fn prediction_id(job_id: &str, index: usize) -> String {
    format!("pred_{}_{}_{}", job_id, Utc::now().timestamp_millis(), index)
}

impl DataStore for PgDataStore {
    async fn create_job(&self, job: &NewJob) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, video_id, video_url, video_title, channel_name, thumbnail_url, lang)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&job.id)
        .bind(&job.video_id)
        .bind(&job.video_url)
        .bind(&job.video_title)
        .bind(&job.channel_name)
        .bind(&job.thumbnail_url)
        .bind(&job.lang)
        .execute(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, job_id = %job.id, "Failed to create job"))
        .context("Failed to create job")?;

        Ok(())
    }

    async fn get_job(&self, id: &str) -> anyhow::Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, job_id = %id, "Failed to fetch job"))
        .context("Failed to fetch job")?;

        row.map(Job::try_from).transpose()
    }

    async fn list_jobs(&self) -> anyhow::Result<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to list jobs"))
        .context("Failed to list jobs")?;

        rows.into_iter().map(Job::try_from).collect()
    }

    async fn update_job_meta(
        &self,
        id: &str,
        title: &str,
        channel: &str,
        thumbnail: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE jobs SET video_title = $1, channel_name = $2, thumbnail_url = $3 WHERE id = $4",
        )
        .bind(title)
        .bind(channel)
        .bind(thumbnail)
        .bind(id)
        .execute(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, job_id = %id, "Failed to update job metadata"))
        .context("Failed to update job metadata")?;

        Ok(())
    }

    async fn update_job_lang(&self, id: &str, lang: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE jobs SET lang = $1 WHERE id = $2")
            .bind(lang)
            .bind(id)
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, job_id = %id, "Failed to update job lang"))
            .context("Failed to update job lang")?;

        Ok(())
    }

    async fn update_job_done(
        &self,
        id: &str,
        transcript: &str,
        summary: &str,
        prompt: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE jobs SET transcript = $1, summary = $2, custom_prompt = $3, status = $4 \
             WHERE id = $5",
        )
        .bind(transcript)
        .bind(summary)
        .bind(prompt)
        .bind(JobStatus::Done.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, job_id = %id, "Failed to mark job done"))
        .context("Failed to mark job done")?;

        Ok(())
    }

    async fn update_job_author(&self, id: &str, author: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE jobs SET author = $1 WHERE id = $2")
            .bind(author)
            .bind(id)
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, job_id = %id, "Failed to update job author"))
            .context("Failed to update job author")?;

        Ok(())
    }

    async fn update_job_error(&self, id: &str, message: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE jobs SET error_message = $1, status = $2 WHERE id = $3")
            .bind(message)
            .bind(JobStatus::Error.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, job_id = %id, "Failed to mark job errored"))
            .context("Failed to mark job errored")?;

        Ok(())
    }

    async fn delete_job(&self, id: &str) -> anyhow::Result<bool> {
        // predictions cascade via the FK
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, job_id = %id, "Failed to delete job"))
            .context("Failed to delete job")?;

        Ok(result.rows_affected() > 0)
    }

    async fn summarized_video_ids(&self) -> anyhow::Result<HashMap<String, String>> {
        #[derive(sqlx::FromRow)]
        struct IdPair {
            video_id: String,
            id: String,
        }

        let rows = sqlx::query_as::<_, IdPair>(
            "SELECT video_id, id FROM jobs WHERE status != $1",
        )
        .bind(JobStatus::Error.as_str())
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to fetch summarized video ids"))
        .context("Failed to fetch summarized video ids")?;

        Ok(rows.into_iter().map(|r| (r.video_id, r.id)).collect())
    }

    async fn insert_predictions(&self, rows: &[NewPrediction]) -> anyhow::Result<usize> {
        let mut written = 0;
        for (i, row) in rows.iter().enumerate() {
            let id = prediction_id(&row.job_id, i);
            sqlx::query(
                r#"
                INSERT INTO predictions
                    (id, job_id, video_title, video_url, channel_name, author,
                     asset_name, direction, if_cases, price_target)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(&id)
            .bind(&row.job_id)
            .bind(&row.video_title)
            .bind(&row.video_url)
            .bind(&row.channel_name)
            .bind(&row.author)
            .bind(&row.asset_name)
            .bind(&row.direction)
            .bind(&row.if_cases)
            .bind(&row.price_target)
            .execute(&self.pool)
            .await
            .inspect_err(|e| {
                tracing::error!(error = ?e, job_id = %row.job_id, "Failed to insert prediction")
            })
            .context("Failed to insert prediction")?;
            written += 1;
        }
        Ok(written)
    }

    async fn list_predictions(&self) -> anyhow::Result<Vec<Prediction>> {
        let rows = sqlx::query_as::<_, PredictionRow>(
            "SELECT id, job_id, video_title, video_url, channel_name, author, asset_name, \
             direction, if_cases, price_target, created_at \
             FROM predictions ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to list predictions"))
        .context("Failed to list predictions")?;

        Ok(rows.into_iter().map(Prediction::from).collect())
    }

    async fn delete_prediction(&self, id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM predictions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, id = %id, "Failed to delete prediction"))
            .context("Failed to delete prediction")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_predictions_by_job(&self, job_id: &str) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM predictions WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .inspect_err(
                |e| tracing::error!(error = ?e, job_id = %job_id, "Failed to delete predictions"),
            )
            .context("Failed to delete predictions for job")?;

        Ok(result.rows_affected())
    }

    async fn load_settings(&self) -> anyhow::Result<Settings> {
        #[derive(sqlx::FromRow)]
        struct SettingRow {
            key: String,
            value: String,
        }

        let rows = sqlx::query_as::<_, SettingRow>("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to load settings"))
            .context("Failed to load settings")?;

        let mut settings = Settings::default();
        for row in rows {
            match row.key.as_str() {
                "summary_prompt" => settings.summary_prompt = row.value,
                "default_lang" => settings.default_lang = row.value,
                "cookie_browser" => settings.cookie_browser = row.value,
                "openai_model" => settings.openai_model = row.value,
                "blocked_channels" => {
                    settings.blocked_channels = serde_json::from_str(&row.value)
                        .inspect_err(|e| {
                            tracing::warn!(error = ?e, "Malformed blocked_channels value, using default")
                        })
                        .unwrap_or_default();
                }
                _ => {}
            }
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_ids_from_different_jobs_never_collide() {
        // same index, same millisecond: the job id keeps them distinct
        let a = prediction_id("1700000000000_aaaaaaaaaaa", 0);
        let b = prediction_id("1700000000000_bbbbbbbbbbb", 0);
        assert_ne!(a, b);
        assert!(a.starts_with("pred_1700000000000_aaaaaaaaaaa_"));
    }

    #[test]
    fn prediction_ids_within_one_batch_are_unique() {
        let ids: Vec<String> = (0..5).map(|i| prediction_id("job", i)).collect();
        for pair in ids.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }
}
