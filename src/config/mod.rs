use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    /// 任意兼容OpenAI Chat Completions的服务（默认指向Groq）
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
}

impl LLMProvider {
    /// 该Provider是否需要API KEY
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LLMProvider::Ollama)
    }
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Mistral => write!(f, "mistral"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "groq" => Ok(LLMProvider::OpenAI),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "mistral" => Ok(LLMProvider::Mistral),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 启动前置条件错误，流水线开始前检测，唯一会直接返回给用户的失败类型
#[derive(Debug, Error, PartialEq)]
pub enum PreconditionError {
    #[error(
        "missing LLM API key for provider `{provider}`: set RADAR_LLM_API_KEY (or GROQ_API_KEY), add `api_key` under [llm] in radar.toml, or pass --llm-api-key"
    )]
    MissingCredential { provider: LLMProvider },

    #[error("company name must not be empty")]
    EmptyCompanyName,
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// LLM模型配置
    pub llm: LLMConfig,

    /// 检索后端与并发配置
    pub search: SearchConfig,

    /// 报告输出文件，为空时输出到标准输出
    pub output_path: Option<PathBuf>,

    /// 是否格式化输出JSON
    pub pretty: bool,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 模型名称
    pub model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 规划类调用的温度，偏低以保证确定性
    pub planning_temperature: f64,

    /// 生成类调用（摘要、用例）的温度
    pub generation_temperature: f64,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 单次调用超时时间（秒）
    pub timeout_seconds: u64,
}

/// 检索后端配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// 每个数据源返回的最大条目数
    pub results_per_source: usize,

    /// 资源检索阶段的最大并发调用数
    pub max_concurrency: usize,

    /// 单次后端调用超时时间（秒）
    pub call_timeout_secs: u64,

    /// 整个运行的全局截止时间（秒）
    pub deadline_secs: u64,

    /// 后端重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// GitHub访问令牌（可选，提高速率限制）
    pub github_token: Option<String>,

    /// HTTP请求使用的User-Agent
    pub user_agent: String,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 检查必需的凭据是否存在
    pub fn ensure_credentials(&self) -> Result<(), PreconditionError> {
        if self.llm.provider.requires_api_key() && self.llm.api_key.trim().is_empty() {
            return Err(PreconditionError::MissingCredential {
                provider: self.llm.provider.clone(),
            });
        }
        Ok(())
    }
}

impl SearchConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            output_path: None,
            pretty: false,
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: env_non_empty("RADAR_LLM_API_KEY")
                .or_else(|| env_non_empty("GROQ_API_KEY"))
                .unwrap_or_default(),
            api_base_url: String::from("https://api.groq.com/openai/v1"),
            model: String::from("llama-3.1-8b-instant"),
            max_tokens: 4096,
            planning_temperature: 0.1,
            generation_temperature: 0.7,
            retry_delay_ms: 2000,
            timeout_seconds: 60,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            results_per_source: 5,
            max_concurrency: 8,
            call_timeout_secs: 10,
            deadline_secs: 120,
            retry_delay_ms: 2000,
            github_token: env_non_empty("GITHUB_TOKEN"),
            user_agent: String::from(concat!("usecase-radar/", env!("CARGO_PKG_VERSION"))),
        }
    }
}
