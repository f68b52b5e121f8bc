use crate::config::toml_config::ReembedJob;
use crate::domain::ports::{Embedder, Storage};
use crate::utils::error::{ChatError, Result};
use serde_json::Value;

const PROGRESS_EVERY: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReembedReport {
    pub total: usize,
    pub embedded: usize,
    pub skipped: usize,
}

/// Recomputes the `embedding` field of JSON datasets with a given model.
pub struct Reembedder<E, S> {
    embedder: E,
    storage: S,
    model: String,
}

impl<E: Embedder, S: Storage> Reembedder<E, S> {
    pub fn new(embedder: E, storage: S, model: impl Into<String>) -> Self {
        Self {
            embedder,
            storage,
            model: model.into(),
        }
    }

    pub async fn run_job(&self, job: &ReembedJob) -> Result<ReembedReport> {
        let raw = self.storage.read_file(&job.input).await?;
        let mut entries = match serde_json::from_slice::<Value>(&raw)? {
            Value::Array(entries) => entries,
            _ => {
                return Err(ChatError::KnowledgeBaseError {
                    path: job.input.clone(),
                    message: "expected a JSON array".to_string(),
                })
            }
        };

        let mut report = ReembedReport {
            total: entries.len(),
            ..Default::default()
        };

        for i in 0..entries.len() {
            let text = entries[i]
                .get(&job.text_field)
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);

            match (text, entries[i].as_object_mut()) {
                (Some(text), Some(entry)) => {
                    let embedding = self.embedder.embed(&self.model, &text).await?;
                    entry.insert("embedding".to_string(), serde_json::to_value(embedding)?);
                    report.embedded += 1;
                }
                // 缺少文字欄位的項目保留原樣
                _ => report.skipped += 1,
            }

            if (i + 1) % PROGRESS_EVERY == 0 || i + 1 == entries.len() {
                tracing::info!("Re-embedded {} / {} for {}", i + 1, entries.len(), job.input);
            }
        }

        let output = serde_json::to_string_pretty(&entries)?;
        self.storage.write_file(&job.output, output.as_bytes()).await?;
        tracing::info!("✅ Done: {}", job.output);

        Ok(report)
    }

    /// Run jobs in order; the first failure stops the batch.
    pub async fn run_all(&self, jobs: &[ReembedJob]) -> Result<Vec<ReembedReport>> {
        let mut reports = Vec::with_capacity(jobs.len());
        for job in jobs {
            reports.push(self.run_job(job).await?);
        }
        Ok(reports)
    }
}
