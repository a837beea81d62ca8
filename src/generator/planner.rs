use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::generator::context::GeneratorContext;
use crate::llm::client::LLMClient;
use crate::types::{Plan, Step, StepKind};

/// LLM返回的计划草稿
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct PlanDraft {
    #[serde(default)]
    pub company: Option<String>,
    pub steps: Vec<StepDraft>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct StepDraft {
    #[serde(default)]
    pub id: Option<u32>,
    /// 动作名，例如 `search_company_info`
    pub action: String,
    #[serde(default)]
    pub tool: Option<ToolSpec>,
}

/// 工具可以是单个名称，也可以是名称列表
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum ToolSpec {
    Single(String),
    Many(Vec<String>),
}

impl ToolSpec {
    fn into_tools(self) -> Vec<String> {
        let tools = match self {
            ToolSpec::Single(tool) => vec![tool],
            ToolSpec::Many(tools) => tools,
        };
        tools
            .into_iter()
            .map(|tool| tool.trim().to_string())
            .filter(|tool| !tool.is_empty())
            .collect()
    }
}

const SYSTEM_PROMPT: &str = r#"You are a planning agent that turns a request into a step-by-step execution plan.

The plan must contain these steps, in this order:
1. search_company_info - search the web for the company (tool: DuckDuckGo)
2. summarize_company - summarize what the company does (tool: LLM)
3. generate_ai_use_cases - propose AI use-cases for the company (tool: LLM)
4. search_resources - find resources for each use-case (tools: arXiv, HuggingFace, Kaggle, GitHub)
5. verify_and_finalize - verify and normalize the output (tool: Verifier)

If you answer in text, return ONLY a JSON object like:
{"company": "...", "steps": [{"id": 1, "action": "search_company_info", "tool": "DuckDuckGo"}]}"#;

/// 计划生成器：向LLM请求计划，任何失败都退回静态默认计划
pub struct PlanGenerator<'a> {
    llm: &'a LLMClient,
    temperature: f64,
}

impl<'a> PlanGenerator<'a> {
    pub fn new(context: &'a GeneratorContext) -> Self {
        Self {
            llm: &context.llm_client,
            temperature: context.config.llm.planning_temperature,
        }
    }

    pub async fn generate(&self, company: &str) -> Plan {
        let user_prompt = format!("Create an execution plan to analyze the company: {}", company);

        match self
            .llm
            .complete_json::<PlanDraft>(SYSTEM_PROMPT, &user_prompt, self.temperature)
            .await
        {
            Ok(draft) => match plan_from_draft(company, draft) {
                Some(plan) => {
                    tracing::debug!(steps = plan.steps.len(), "使用模型生成的执行计划");
                    plan
                }
                None => {
                    tracing::warn!("模型生成的计划缺少必需步骤，使用默认计划");
                    Plan::default_for(company)
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "计划生成失败，使用默认计划");
                Plan::default_for(company)
            }
        }
    }
}

/// 将草稿映射为计划：丢弃未知动作并重新编号，未覆盖全部必需步骤时返回 `None`
pub fn plan_from_draft(company: &str, draft: PlanDraft) -> Option<Plan> {
    let steps: Vec<Step> = draft
        .steps
        .into_iter()
        .filter_map(|draft_step| {
            let Some(kind) = StepKind::from_action(&draft_step.action) else {
                tracing::debug!(action = %draft_step.action, "忽略未知的计划动作");
                return None;
            };
            let tools = draft_step
                .tool
                .map(ToolSpec::into_tools)
                .filter(|tools| !tools.is_empty())
                .unwrap_or_else(|| kind.default_tools());
            Some((kind, draft_step.action, tools))
        })
        .enumerate()
        .map(|(index, (kind, action, tools))| Step::new(index as u32 + 1, kind, action.trim(), tools))
        .collect();

    let plan = Plan {
        company: company.to_string(),
        steps,
    };
    plan.covers_required_steps().then_some(plan)
}
