use crate::config::{Config, LLMProvider};
use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;

/// 默认配置文件名，位于当前工作目录
pub const DEFAULT_CONFIG_FILE: &str = "radar.toml";

/// UseCase Radar - 为公司生成AI用例及学习资源报告
#[derive(Parser, Debug)]
#[command(name = "usecase-radar")]
#[command(
    about = "Turns a company name into a JSON report of AI use-cases, each backed by papers, models, datasets and code repositories."
)]
#[command(version)]
pub struct Args {
    /// 公司名称
    #[arg(required_unless_present = "verify")]
    pub company: Option<String>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 报告输出文件，不指定时输出到标准输出
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 格式化输出JSON
    #[arg(long)]
    pub pretty: bool,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// 重新校验已有的报告文件，不调用任何外部服务
    #[arg(long, value_name = "FILE", conflicts_with = "company")]
    pub verify: Option<PathBuf>,

    /// LLM Provider (openai/groq, deepseek, mistral, anthropic, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 模型名称
    #[arg(long)]
    pub model: Option<String>,

    /// 规划调用的温度
    #[arg(long)]
    pub planning_temperature: Option<f64>,

    /// 摘要与用例生成调用的温度
    #[arg(long)]
    pub generation_temperature: Option<f64>,

    /// 资源检索的最大并发数
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// 单次后端调用超时（秒）
    #[arg(long)]
    pub call_timeout_secs: Option<u64>,

    /// 整个运行的截止时间（秒）
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// 每个数据源返回的条目数
    #[arg(long)]
    pub results_per_source: Option<usize>,

    /// GitHub访问令牌
    #[arg(long)]
    pub github_token: Option<String>,
}

/// 本次运行要执行的任务
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Analyze { company: String },
    Verify { input: PathBuf },
}

impl Args {
    /// 根据参数确定任务
    pub fn task(&self) -> Result<Task> {
        if let Some(input) = &self.verify {
            return Ok(Task::Verify {
                input: input.clone(),
            });
        }
        match self.company.as_deref().map(str::trim) {
            Some(company) if !company.is_empty() => Ok(Task::Analyze {
                company: company.to_string(),
            }),
            _ => bail!("a company name is required"),
        }
    }

    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Result<Config> {
        let mut config = if let Some(config_path) = &self.config {
            // 如果显式指定了配置文件路径，从该路径加载
            Config::from_file(config_path)?
        } else {
            // 如果没有显式指定配置文件，尝试从默认位置加载
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(DEFAULT_CONFIG_FILE);

            if default_config_path.exists() {
                Config::from_file(&default_config_path)?
            } else {
                // 默认配置文件不存在，使用默认值
                Config::default()
            }
        };

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(temperature) = self.planning_temperature {
            config.llm.planning_temperature = temperature;
        }
        if let Some(temperature) = self.generation_temperature {
            config.llm.generation_temperature = temperature;
        }

        // 覆盖检索配置
        if let Some(max_concurrency) = self.max_concurrency {
            config.search.max_concurrency = max_concurrency;
        }
        if let Some(call_timeout_secs) = self.call_timeout_secs {
            config.search.call_timeout_secs = call_timeout_secs;
        }
        if let Some(deadline_secs) = self.deadline_secs {
            config.search.deadline_secs = deadline_secs;
        }
        if let Some(results_per_source) = self.results_per_source {
            config.search.results_per_source = results_per_source;
        }
        if let Some(github_token) = self.github_token {
            config.search.github_token = Some(github_token);
        }

        // 输出配置
        if let Some(output) = self.output {
            config.output_path = Some(output);
        }
        config.pretty = config.pretty || self.pretty;
        config.verbose = config.verbose || self.verbose;

        Ok(config)
    }
}
