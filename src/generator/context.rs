use anyhow::Result;

use crate::{backends::BackendSet, config::Config, llm::client::LLMClient};

/// 一次运行共享的上下文，启动时创建一次并以引用传递
#[derive(Clone)]
pub struct GeneratorContext {
    /// LLM调用器，用于与AI通信。
    pub llm_client: LLMClient,
    /// 配置
    pub config: Config,
    /// 检索后端
    pub backends: BackendSet,
}

impl GeneratorContext {
    /// 根据配置创建LLM客户端与全部HTTP检索后端
    pub fn new(config: Config) -> Result<Self> {
        let llm_client = LLMClient::new(&config.llm)?;
        let backends = BackendSet::from_config(&config.search)?;

        Ok(Self {
            llm_client,
            config,
            backends,
        })
    }

    /// 使用已构建好的组件创建上下文
    pub fn with_parts(config: Config, llm_client: LLMClient, backends: BackendSet) -> Self {
        Self {
            llm_client,
            config,
            backends,
        }
    }
}
