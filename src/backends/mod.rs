//! 外部检索后端
//!
//! 每个数据源实现 [`SearchProvider`]，只负责单次请求与解析；
//! [`ResilientBackend`] 统一负责超时、一次重试、速率限制熔断与降级为空结果，
//! 对外暴露永不失败的 [`ResourceBackend::search`]。

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::config::SearchConfig;
use crate::types::{Resource, ResourceCategory};

pub mod arxiv;
pub mod github;
pub mod huggingface;
pub mod kaggle;
mod text;
pub mod web_search;

pub use arxiv::ArxivProvider;
pub use github::GitHubProvider;
pub use huggingface::HuggingFaceProvider;
pub use kaggle::KaggleProvider;
pub use web_search::DuckDuckGoProvider;

/// 抓取网页时使用的浏览器User-Agent
pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// 单次尝试最多次数：首次 + 一次重试
const MAX_ATTEMPTS: u32 = 2;

/// 检索后端错误，不会越过 [`ResilientBackend`] 向外传播
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackendError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Malformed(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

/// 检查HTTP状态码，区分速率限制与其他失败
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let quota_exhausted = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        == Some("0");

    if status == StatusCode::TOO_MANY_REQUESTS || (status == StatusCode::FORBIDDEN && quota_exhausted) {
        Err(BackendError::RateLimited(format!("HTTP {}", status)))
    } else {
        Err(BackendError::Transport(format!("HTTP {}", status)))
    }
}

/// 单个数据源的一次检索请求
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Resource>, BackendError>;
}

/// 统一的检索后端接口，失败时返回空列表而不是错误
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    fn name(&self) -> &str;

    /// 按数据源原始排序返回不超过 `limit` 条资源
    async fn search(&self, query: &str, limit: usize) -> Vec<Resource>;
}

/// 为数据源提供超时、重试与降级能力
pub struct ResilientBackend<P> {
    provider: P,
    timeout: Duration,
    retry_delay: Duration,
    rate_limited: AtomicBool,
}

impl<P: SearchProvider> ResilientBackend<P> {
    pub fn new(provider: P, timeout: Duration, retry_delay: Duration) -> Self {
        Self {
            provider,
            timeout,
            retry_delay,
            rate_limited: AtomicBool::new(false),
        }
    }

    async fn attempt(&self, query: &str, limit: usize) -> Result<Vec<Resource>, BackendError> {
        match tokio::time::timeout(self.timeout, self.provider.fetch(query, limit)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl<P: SearchProvider> ResourceBackend for ResilientBackend<P> {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<Resource> {
        if limit == 0 {
            return Vec::new();
        }
        // 配额已耗尽，本次运行内不再请求该数据源
        if self.rate_limited.load(Ordering::Relaxed) {
            tracing::debug!(backend = self.name(), query, "速率限制已触发，跳过请求");
            return Vec::new();
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.attempt(query, limit).await {
                Ok(mut resources) => {
                    resources.truncate(limit);
                    tracing::debug!(backend = self.name(), query, count = resources.len(), "检索完成");
                    return resources;
                }
                Err(err) => {
                    tracing::warn!(
                        backend = self.name(),
                        query,
                        attempt = attempts,
                        max_attempts = MAX_ATTEMPTS,
                        error = %err,
                        "检索请求失败"
                    );
                    if attempts >= MAX_ATTEMPTS {
                        if matches!(err, BackendError::RateLimited(_)) {
                            self.rate_limited.store(true, Ordering::Relaxed);
                        }
                        tracing::warn!(backend = self.name(), query, "重试耗尽，降级为空结果");
                        return Vec::new();
                    }
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}

/// 查询放宽策略：完整查询无结果时依次尝试前三个词、前两个词
pub fn broadened_queries(query: &str) -> Vec<String> {
    let words: Vec<&str> = query.split_whitespace().collect();
    let mut queries = vec![words.join(" ")];
    if words.len() > 3 {
        queries.push(words[..3].join(" "));
    }
    if words.len() > 2 {
        queries.push(words[..2].join(" "));
    }
    queries
}

/// 在空结果时自动放宽查询的数据源包装
pub struct Broadened<P>(pub P);

#[async_trait]
impl<P: SearchProvider> SearchProvider for Broadened<P> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Resource>, BackendError> {
        for candidate in broadened_queries(query) {
            let resources = self.0.fetch(&candidate, limit).await?;
            if !resources.is_empty() {
                return Ok(resources);
            }
            tracing::debug!(backend = self.name(), query = %candidate, "无结果，放宽查询");
        }
        Ok(Vec::new())
    }
}

/// 一次运行使用的全部检索后端
#[derive(Clone)]
pub struct BackendSet {
    pub web: Arc<dyn ResourceBackend>,
    pub arxiv: Arc<dyn ResourceBackend>,
    pub huggingface: Arc<dyn ResourceBackend>,
    pub kaggle: Arc<dyn ResourceBackend>,
    pub github: Arc<dyn ResourceBackend>,
}

impl BackendSet {
    /// 根据配置创建基于HTTP的全部后端，共享同一个连接池
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.call_timeout())
            .build()?;

        let timeout = config.call_timeout();
        let retry_delay = config.retry_delay();

        Ok(Self {
            web: Arc::new(ResilientBackend::new(
                DuckDuckGoProvider::new(client.clone()),
                timeout,
                retry_delay,
            )),
            arxiv: Arc::new(ResilientBackend::new(
                Broadened(ArxivProvider::new(client.clone())),
                timeout,
                retry_delay,
            )),
            huggingface: Arc::new(ResilientBackend::new(
                Broadened(HuggingFaceProvider::new(client.clone())),
                timeout,
                retry_delay,
            )),
            kaggle: Arc::new(ResilientBackend::new(
                Broadened(KaggleProvider::new(client.clone())),
                timeout,
                retry_delay,
            )),
            github: Arc::new(ResilientBackend::new(
                Broadened(GitHubProvider::new(client, config.github_token.clone())),
                timeout,
                retry_delay,
            )),
        })
    }

    pub fn for_category(&self, category: ResourceCategory) -> Arc<dyn ResourceBackend> {
        match category {
            ResourceCategory::Arxiv => self.arxiv.clone(),
            ResourceCategory::HuggingFace => self.huggingface.clone(),
            ResourceCategory::Kaggle => self.kaggle.clone(),
            ResourceCategory::GitHub => self.github.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct ScriptedProvider {
        replies: Mutex<Vec<Result<Vec<Resource>, BackendError>>>,
        calls: AtomicUsize,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<Vec<Resource>, BackendError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SearchProvider for Arc<ScriptedProvider> {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch(&self, query: &str, _limit: usize) -> Result<Vec<Resource>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn resources(count: usize) -> Vec<Resource> {
        (0..count)
            .map(|i| Resource::new(format!("r{}", i), format!("https://example.com/{}", i)))
            .collect()
    }

    fn resilient(provider: Arc<ScriptedProvider>) -> ResilientBackend<Arc<ScriptedProvider>> {
        ResilientBackend::new(provider, Duration::from_secs(5), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_fails_twice_returns_empty() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(BackendError::Transport("reset".into())),
            Err(BackendError::Transport("reset".into())),
            Ok(resources(3)),
        ]));
        let backend = resilient(provider.clone());

        let result = backend.search("fraud detection", 5).await;

        assert!(result.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fails_once_then_succeeds() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(BackendError::Malformed("bad json".into())),
            Ok(resources(2)),
        ]));
        let backend = resilient(provider.clone());

        let result = backend.search("fraud detection", 5).await;

        assert_eq!(result, resources(2));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_truncates_to_limit_preserving_order() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(resources(6))]));
        let backend = resilient(provider);

        let result = backend.search("q", 3).await;

        assert_eq!(result, resources(3));
    }

    #[tokio::test]
    async fn test_zero_limit_skips_request() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(resources(2))]));
        let backend = resilient(provider.clone());

        assert!(backend.search("q", 0).await.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_short_circuits_later_calls() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(BackendError::RateLimited("HTTP 403".into())),
            Err(BackendError::RateLimited("HTTP 403".into())),
            Ok(resources(2)),
        ]));
        let backend = resilient(provider.clone());

        assert!(backend.search("first", 5).await.is_empty());
        assert!(backend.search("second", 5).await.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_empty() {
        struct Stalled;

        #[async_trait]
        impl SearchProvider for Stalled {
            fn name(&self) -> &'static str {
                "stalled"
            }

            async fn fetch(&self, _: &str, _: usize) -> Result<Vec<Resource>, BackendError> {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
        }

        let backend = ResilientBackend::new(Stalled, Duration::from_millis(20), Duration::from_millis(1));
        assert!(backend.search("q", 5).await.is_empty());
    }

    #[test]
    fn test_broadened_queries() {
        assert_eq!(
            broadened_queries("Demand Forecasting Engine Acme Corp"),
            vec![
                "Demand Forecasting Engine Acme Corp".to_string(),
                "Demand Forecasting Engine".to_string(),
                "Demand Forecasting".to_string(),
            ]
        );
        assert_eq!(
            broadened_queries("Fraud Detection Acme"),
            vec!["Fraud Detection Acme".to_string(), "Fraud Detection".to_string()]
        );
        assert_eq!(broadened_queries("  Chatbot  "), vec!["Chatbot".to_string()]);
    }

    #[tokio::test]
    async fn test_broadened_falls_back_to_shorter_query() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(Vec::new()),
            Ok(Vec::new()),
            Ok(resources(1)),
        ]));
        let broadened = Broadened(provider.clone());

        let result = broadened.fetch("Visual Search Ranking Acme", 5).await.unwrap();

        assert_eq!(result, resources(1));
        assert_eq!(
            *provider.queries.lock().unwrap(),
            vec![
                "Visual Search Ranking Acme".to_string(),
                "Visual Search Ranking".to_string(),
                "Visual Search".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_broadened_propagates_errors_for_retry() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(BackendError::Transport(
            "down".into(),
        ))]));
        let broadened = Broadened(provider);

        assert!(broadened.fetch("a b c d", 5).await.is_err());
    }
}
