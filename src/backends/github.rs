//! 代码仓库检索后端（GitHub Search API）

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use crate::backends::text::truncate_chars;
use crate::backends::{BackendError, SearchProvider, check_status};
use crate::types::Resource;

const ENDPOINT: &str = "https://api.github.com/search/repositories";

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<Repository>,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub description: Option<String>,
}

pub struct GitHubProvider {
    client: reqwest::Client,
    token: Option<String>,
}

impl GitHubProvider {
    /// 未提供token时使用匿名配额
    pub fn new(client: reqwest::Client, token: Option<String>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        Self { client, token }
    }
}

#[async_trait]
impl SearchProvider for GitHubProvider {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Resource>, BackendError> {
        let per_page = limit.to_string();
        let mut request = self
            .client
            .get(ENDPOINT)
            .header(ACCEPT, "application/vnd.github.v3+json")
            .query(&[
                ("q", query),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let body: SearchResponse = check_status(response)?.json().await?;
        Ok(to_resources(body))
    }
}

pub fn to_resources(body: SearchResponse) -> Vec<Resource> {
    body.items
        .into_iter()
        .map(|repo| {
            let mut resource =
                Resource::new(repo.full_name, repo.html_url).with_popularity(repo.stargazers_count);
            if let Some(description) = repo.description.filter(|d| !d.trim().is_empty()) {
                resource = resource.with_snippet(truncate_chars(description.trim(), 200));
            }
            resource.with_kind("repository")
        })
        .collect()
}
