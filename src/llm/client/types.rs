use async_trait::async_trait;
use thiserror::Error;

/// LLM调用失败的分类
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LlmError {
    /// 网络或超时错误
    #[error("LLM transport failure: {0}")]
    Transport(String),

    /// Provider配额耗尽
    #[error("LLM rate limit exceeded: {0}")]
    RateLimited(String),

    /// 返回内容为空或无法解析
    #[error("LLM returned a malformed response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// 根据Provider返回的错误信息进行分类
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if lowered.contains("429")
            || lowered.contains("rate limit")
            || lowered.contains("too many requests")
        {
            LlmError::RateLimited(message)
        } else if lowered.contains("json")
            || lowered.contains("deserializ")
            || lowered.contains("unexpected response")
        {
            LlmError::MalformedResponse(message)
        } else {
            LlmError::Transport(message)
        }
    }
}

/// 单轮对话后端，屏蔽具体Provider差异
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// 发起一次对话请求，不做任何重试
    async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
    ) -> Result<String, LlmError>;
}
