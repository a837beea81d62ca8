//! 生成器单元测试共用的脚本化LLM与检索后端

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backends::{BackendSet, ResourceBackend};
use crate::config::Config;
use crate::generator::context::GeneratorContext;
use crate::generator::progress::{ProgressEvent, ProgressSink};
use crate::llm::client::{ChatBackend, LLMClient, LlmError};
use crate::types::Resource;

/// 按顺序返回预设回复，并记录每次调用的提示词与温度
pub struct ScriptedChat {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<(String, String, f64)>>,
}

impl ScriptedChat {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn ok(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|reply| Ok(reply.to_string())).collect())
    }

    pub fn calls(&self) -> Vec<(String, String, f64)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn client(self: &Arc<Self>) -> LLMClient {
        LLMClient::with_backend(self.clone(), Duration::from_millis(1), Duration::from_secs(5))
    }
}

#[async_trait]
impl ChatBackend for ScriptedChat {
    async fn chat(&self, system: &str, user: &str, temperature: f64) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string(), temperature));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Transport("script exhausted".to_string())))
    }
}

/// 固定返回同一批资源的后端，可选延迟，并统计并发峰值
pub struct StaticBackend {
    name: &'static str,
    resources: Vec<Resource>,
    delay: Duration,
    pub queries: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl StaticBackend {
    pub fn new(name: &'static str, resources: Vec<Resource>) -> Arc<Self> {
        Self::delayed(name, resources, Duration::ZERO)
    }

    pub fn delayed(name: &'static str, resources: Vec<Resource>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            resources,
            delay,
            queries: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceBackend for StaticBackend {
    fn name(&self) -> &str {
        self.name
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<Resource> {
        self.queries.lock().unwrap().push(query.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.resources.iter().take(limit).cloned().collect()
    }
}

pub fn resources(prefix: &str, count: usize) -> Vec<Resource> {
    (0..count)
        .map(|i| Resource::new(format!("{} {}", prefix, i), format!("https://example.com/{}/{}", prefix, i)))
        .collect()
}

/// 所有资源后端共用同一个实现
pub fn uniform_backends(web: Arc<StaticBackend>, resource: Arc<StaticBackend>) -> BackendSet {
    BackendSet {
        web,
        arxiv: resource.clone(),
        huggingface: resource.clone(),
        kaggle: resource.clone(),
        github: resource,
    }
}

pub fn context(chat: &Arc<ScriptedChat>, backends: BackendSet) -> GeneratorContext {
    let mut config = Config::default();
    config.llm.api_key = "test-key".to_string();
    config.search.results_per_source = 2;
    GeneratorContext::with_parts(config, chat.client(), backends)
}

/// 记录全部进度事件
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}
