//! 模型检索后端（Hugging Face Hub API，模型与数据集）

use async_trait::async_trait;
use serde::Deserialize;

use crate::backends::{BackendError, SearchProvider, check_status};
use crate::types::Resource;

const API_BASE: &str = "https://huggingface.co/api";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HubKind {
    Model,
    Dataset,
}

impl HubKind {
    fn endpoint(&self) -> String {
        match self {
            HubKind::Model => format!("{}/models", API_BASE),
            HubKind::Dataset => format!("{}/datasets", API_BASE),
        }
    }

    fn page_url(&self, id: &str) -> String {
        match self {
            HubKind::Model => format!("https://huggingface.co/{}", id),
            HubKind::Dataset => format!("https://huggingface.co/datasets/{}", id),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            HubKind::Model => "model",
            HubKind::Dataset => "dataset",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HubEntry {
    pub id: String,
    #[serde(default)]
    pub downloads: Option<u64>,
}

pub struct HuggingFaceProvider {
    client: reqwest::Client,
}

impl HuggingFaceProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn search_hub(
        &self,
        kind: HubKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Resource>, BackendError> {
        let limit_param = limit.to_string();
        let response = self
            .client
            .get(kind.endpoint())
            .query(&[
                ("search", query),
                ("limit", limit_param.as_str()),
                ("sort", "downloads"),
                ("direction", "-1"),
            ])
            .send()
            .await?;
        let entries: Vec<HubEntry> = check_status(response)?.json().await?;
        Ok(to_resources(kind, entries))
    }
}

pub fn to_resources(kind: HubKind, entries: Vec<HubEntry>) -> Vec<Resource> {
    entries
        .into_iter()
        .filter(|entry| !entry.id.trim().is_empty())
        .map(|entry| {
            let resource = Resource::new(entry.id.clone(), kind.page_url(&entry.id)).with_kind(kind.label());
            match entry.downloads {
                Some(downloads) => resource.with_popularity(downloads),
                None => resource,
            }
        })
        .collect()
}

/// 模型在前、数据集在后；任一侧成功即视为成功
pub fn merge_results(
    models: Result<Vec<Resource>, BackendError>,
    datasets: Result<Vec<Resource>, BackendError>,
    limit: usize,
) -> Result<Vec<Resource>, BackendError> {
    let merged = match (models, datasets) {
        (Err(err), Err(_)) => return Err(err),
        (Ok(models), Err(err)) => {
            tracing::debug!(error = %err, "Hugging Face数据集检索失败，仅使用模型结果");
            models
        }
        (Err(err), Ok(datasets)) => {
            tracing::debug!(error = %err, "Hugging Face模型检索失败，仅使用数据集结果");
            datasets
        }
        (Ok(mut models), Ok(datasets)) => {
            models.extend(datasets);
            models
        }
    };
    Ok(merged.into_iter().take(limit).collect())
}

#[async_trait]
impl SearchProvider for HuggingFaceProvider {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Resource>, BackendError> {
        let (models, datasets) = futures::future::join(
            self.search_hub(HubKind::Model, query, limit),
            self.search_hub(HubKind::Dataset, query, limit),
        )
        .await;
        merge_results(models, datasets, limit)
    }
}
