use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::Utc;
use glaskugel_datastore::{
    DataStore, Job, JobStatus, NewJob, NewPrediction, Prediction, Settings,
};

/// In-memory datastore that records every write for assertions.
#[derive(Clone)]
pub struct MockDataStore {
    pub settings: Settings,
    pub created: Arc<Mutex<Vec<NewJob>>>,
    pub meta_updates: Arc<Mutex<Vec<(String, String, String, String)>>>,
    pub lang_updates: Arc<Mutex<Vec<(String, String)>>>,
    pub done_updates: Arc<Mutex<Vec<(String, String, String, String)>>>,
    pub author_updates: Arc<Mutex<Vec<(String, String)>>>,
    pub error_updates: Arc<Mutex<Vec<(String, String)>>>,
    pub predictions: Arc<Mutex<Vec<NewPrediction>>>,
}

impl Default for MockDataStore {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            created: Arc::new(Mutex::new(Vec::new())),
            meta_updates: Arc::new(Mutex::new(Vec::new())),
            lang_updates: Arc::new(Mutex::new(Vec::new())),
            done_updates: Arc::new(Mutex::new(Vec::new())),
            author_updates: Arc::new(Mutex::new(Vec::new())),
            error_updates: Arc::new(Mutex::new(Vec::new())),
            predictions: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockDataStore {
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    fn status_of(&self, id: &str) -> JobStatus {
        if self.error_updates.lock().unwrap().iter().any(|(i, _)| i == id) {
            JobStatus::Error
        } else if self.done_updates.lock().unwrap().iter().any(|(i, _, _, _)| i == id) {
            JobStatus::Done
        } else {
            JobStatus::Processing
        }
    }

    fn reconstruct(&self, new_job: &NewJob) -> Job {
        let id = &new_job.id;
        let mut job = Job {
            id: id.clone(),
            video_id: new_job.video_id.clone(),
            video_url: new_job.video_url.clone(),
            video_title: new_job.video_title.clone(),
            channel_name: new_job.channel_name.clone(),
            author: String::new(),
            thumbnail_url: new_job.thumbnail_url.clone(),
            lang: new_job.lang.clone(),
            transcript: String::new(),
            summary: String::new(),
            custom_prompt: String::new(),
            status: self.status_of(id),
            error_message: String::new(),
            created_at: Utc::now(),
        };

        if let Some((_, title, channel, thumbnail)) = self
            .meta_updates
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(i, _, _, _)| i == id)
        {
            job.video_title = title.clone();
            job.channel_name = channel.clone();
            job.thumbnail_url = thumbnail.clone();
        }
        if let Some((_, lang)) = self
            .lang_updates
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(i, _)| i == id)
        {
            job.lang = lang.clone();
        }
        if let Some((_, transcript, summary, prompt)) = self
            .done_updates
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(i, _, _, _)| i == id)
        {
            job.transcript = transcript.clone();
            job.summary = summary.clone();
            job.custom_prompt = prompt.clone();
        }
        if let Some((_, author)) = self
            .author_updates
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(i, _)| i == id)
        {
            job.author = author.clone();
        }
        if let Some((_, message)) = self
            .error_updates
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(i, _)| i == id)
        {
            job.error_message = message.clone();
        }

        job
    }
}

impl DataStore for MockDataStore {
    async fn create_job(&self, job: &NewJob) -> anyhow::Result<()> {
        self.created.lock().unwrap().push(job.clone());
        Ok(())
    }

    async fn get_job(&self, id: &str) -> anyhow::Result<Option<Job>> {
        let created = self.created.lock().unwrap();
        Ok(created
            .iter()
            .find(|j| j.id == id)
            .cloned()
            .map(|j| self.reconstruct(&j)))
    }

    async fn list_jobs(&self) -> anyhow::Result<Vec<Job>> {
        let created = self.created.lock().unwrap().clone();
        Ok(created.iter().map(|j| self.reconstruct(j)).collect())
    }

    async fn update_job_meta(
        &self,
        id: &str,
        title: &str,
        channel: &str,
        thumbnail: &str,
    ) -> anyhow::Result<()> {
        self.meta_updates.lock().unwrap().push((
            id.to_string(),
            title.to_string(),
            channel.to_string(),
            thumbnail.to_string(),
        ));
        Ok(())
    }

    async fn update_job_lang(&self, id: &str, lang: &str) -> anyhow::Result<()> {
        self.lang_updates
            .lock()
            .unwrap()
            .push((id.to_string(), lang.to_string()));
        Ok(())
    }

    async fn update_job_done(
        &self,
        id: &str,
        transcript: &str,
        summary: &str,
        prompt: &str,
    ) -> anyhow::Result<()> {
        self.done_updates.lock().unwrap().push((
            id.to_string(),
            transcript.to_string(),
            summary.to_string(),
            prompt.to_string(),
        ));
        Ok(())
    }

    async fn update_job_author(&self, id: &str, author: &str) -> anyhow::Result<()> {
        self.author_updates
            .lock()
            .unwrap()
            .push((id.to_string(), author.to_string()));
        Ok(())
    }

    async fn update_job_error(&self, id: &str, message: &str) -> anyhow::Result<()> {
        self.error_updates
            .lock()
            .unwrap()
            .push((id.to_string(), message.to_string()));
        Ok(())
    }

    async fn delete_job(&self, id: &str) -> anyhow::Result<bool> {
        let mut created = self.created.lock().unwrap();
        let before = created.len();
        created.retain(|j| j.id != id);
        self.predictions.lock().unwrap().retain(|p| p.job_id != id);
        Ok(created.len() < before)
    }

    async fn summarized_video_ids(&self) -> anyhow::Result<HashMap<String, String>> {
        let created = self.created.lock().unwrap();
        Ok(created
            .iter()
            .filter(|j| self.status_of(&j.id) != JobStatus::Error)
            .map(|j| (j.video_id.clone(), j.id.clone()))
            .collect())
    }

    async fn insert_predictions(&self, rows: &[NewPrediction]) -> anyhow::Result<usize> {
        self.predictions.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len())
    }

    async fn list_predictions(&self) -> anyhow::Result<Vec<Prediction>> {
        let rows = self.predictions.lock().unwrap();
        Ok(rows
            .iter()
            .enumerate()
            .map(|(i, p)| Prediction {
                id: format!("pred_{i}"),
                job_id: p.job_id.clone(),
                video_title: p.video_title.clone(),
                video_url: p.video_url.clone(),
                channel_name: p.channel_name.clone(),
                author: p.author.clone(),
                asset_name: p.asset_name.clone(),
                direction: p.direction.clone(),
                if_cases: p.if_cases.clone(),
                price_target: p.price_target.clone(),
                created_at: Utc::now(),
            })
            .collect())
    }

    async fn delete_prediction(&self, _id: &str) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn delete_predictions_by_job(&self, job_id: &str) -> anyhow::Result<u64> {
        let mut rows = self.predictions.lock().unwrap();
        let before = rows.len();
        rows.retain(|p| p.job_id != job_id);
        Ok((before - rows.len()) as u64)
    }

    async fn load_settings(&self) -> anyhow::Result<Settings> {
        Ok(self.settings.clone())
    }
}
