//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LLMConfig;

mod providers;
pub mod types;
pub mod utils;

pub use providers::{ProviderClient, RigChatBackend};
pub use types::{ChatBackend, LlmError};

/// 单次调用最多尝试次数：首次 + 一次重试
const MAX_ATTEMPTS: u32 = 2;

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    backend: Arc<dyn ChatBackend>,
    /// 结构化输出优先走rig的Extractor，测试替身不提供
    extractor: Option<Arc<RigChatBackend>>,
    retry_delay: Duration,
    timeout: Duration,
}

impl LLMClient {
    /// 根据配置创建基于rig的LLM客户端
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let backend = Arc::new(RigChatBackend::new(config)?);
        let mut client = Self::with_backend(
            backend.clone(),
            Duration::from_millis(config.retry_delay_ms),
            Duration::from_secs(config.timeout_seconds),
        );
        client.extractor = Some(backend);
        Ok(client)
    }

    /// 使用指定的对话后端创建客户端
    pub fn with_backend(
        backend: Arc<dyn ChatBackend>,
        retry_delay: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            extractor: None,
            retry_delay,
            timeout,
        }
    }

    /// 通用重试逻辑：失败后等待一次间隔再重试一次
    async fn retry_once<T, F, Fut>(&self, operation: F) -> Result<T, LlmError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut attempts = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    attempts += 1;
                    tracing::warn!(attempt = attempts, max_attempts = MAX_ATTEMPTS, error = %err, "调用模型服务出错");
                    if attempts >= MAX_ATTEMPTS {
                        return Err(err);
                    }
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    /// 为单次调用加上超时，超时视为传输错误
    async fn within_timeout<T>(
        &self,
        call: impl Future<Output = Result<T, LlmError>>,
    ) -> Result<T, LlmError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Transport(format!(
                "no response within {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    /// 单次文本调用
    async fn attempt(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
    ) -> Result<String, LlmError> {
        self.within_timeout(self.backend.chat(system_prompt, user_prompt, temperature))
            .await
    }

    /// 单次结构化调用：先由Extractor通过提交工具返回结构化数据，
    /// 输出不合格时再请求文本回复并从中截取JSON
    async fn attempt_structured<T>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
    ) -> Result<T, LlmError>
    where
        T: JsonSchema + DeserializeOwned + Serialize + Send + Sync + 'static,
    {
        if let Some(extractor) = &self.extractor {
            match self
                .within_timeout(extractor.extract::<T>(system_prompt, user_prompt, temperature))
                .await
            {
                Err(LlmError::MalformedResponse(reason)) => {
                    tracing::debug!(%reason, "结构化抽取失败，改为解析文本回复");
                }
                extracted => return extracted,
            }
        }

        let text = self.attempt(system_prompt, user_prompt, temperature).await?;
        utils::parse_json_payload::<T>(&text)
    }

    /// 文本补全，空回复视为格式错误
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
    ) -> Result<String, LlmError> {
        self.retry_once(|| async move {
            let text = self.attempt(system_prompt, user_prompt, temperature).await?;
            let text = text.trim();
            if text.is_empty() {
                return Err(LlmError::MalformedResponse("empty completion".to_string()));
            }
            Ok(text.to_string())
        })
        .await
    }

    /// 结构化补全，解析失败同样消耗重试次数
    pub async fn complete_json<T>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
    ) -> Result<T, LlmError>
    where
        T: JsonSchema + DeserializeOwned + Serialize + Send + Sync + 'static,
    {
        self.complete_json_with(system_prompt, user_prompt, temperature, |value: T| {
            Ok::<T, String>(value)
        })
        .await
    }

    /// 结构化补全并校验结果，校验不通过与解析失败一样消耗重试次数
    pub async fn complete_json_with<T, U, F>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
        accept: F,
    ) -> Result<U, LlmError>
    where
        T: JsonSchema + DeserializeOwned + Serialize + Send + Sync + 'static,
        F: Fn(T) -> Result<U, String>,
    {
        let accept = &accept;
        self.retry_once(move || async move {
            let parsed = self
                .attempt_structured::<T>(system_prompt, user_prompt, temperature)
                .await?;
            accept(parsed).map_err(LlmError::MalformedResponse)
        })
        .await
    }
}
