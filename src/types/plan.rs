use serde::{Deserialize, Serialize};
use std::fmt;

/// 流水线步骤类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Search,
    Summarize,
    GenerateUseCases,
    GatherResources,
    Verify,
}

impl StepKind {
    /// 每个计划必须按此顺序包含的步骤
    pub const REQUIRED: [StepKind; 5] = [
        StepKind::Search,
        StepKind::Summarize,
        StepKind::GenerateUseCases,
        StepKind::GatherResources,
        StepKind::Verify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Search => "search",
            StepKind::Summarize => "summarize",
            StepKind::GenerateUseCases => "generate_use_cases",
            StepKind::GatherResources => "gather_resources",
            StepKind::Verify => "verify",
        }
    }

    /// 将LLM给出的动作名映射为步骤类型，兼容常见别名
    pub fn from_action(action: &str) -> Option<Self> {
        let normalized = action.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "search" | "search_company" | "search_company_info" | "web_search" => {
                Some(StepKind::Search)
            }
            "summarize" | "summarise" | "summarize_company" | "company_summary" => {
                Some(StepKind::Summarize)
            }
            "generate_use_cases" | "generate_ai_use_cases" | "use_cases" | "propose_use_cases" => {
                Some(StepKind::GenerateUseCases)
            }
            "gather_resources" | "search_resources" | "find_resources" | "collect_resources" => {
                Some(StepKind::GatherResources)
            }
            "verify" | "verify_and_finalize" | "finalize" | "validate" => Some(StepKind::Verify),
            _ => None,
        }
    }

    pub fn purpose(&self) -> &'static str {
        match self {
            StepKind::Search => "Search the web for information about the company",
            StepKind::Summarize => "Summarize what the company does",
            StepKind::GenerateUseCases => "Propose AI use-cases tailored to the company",
            StepKind::GatherResources => {
                "Find papers, models, datasets and repositories for each use-case"
            }
            StepKind::Verify => "Verify completeness and normalize the report",
        }
    }

    pub fn default_tools(&self) -> Vec<String> {
        let tools: &[&str] = match self {
            StepKind::Search => &["DuckDuckGo"],
            StepKind::Summarize | StepKind::GenerateUseCases => &["LLM"],
            StepKind::GatherResources => &["arXiv", "HuggingFace", "Kaggle", "GitHub"],
            StepKind::Verify => &["Verifier"],
        };
        tools.iter().map(|tool| tool.to_string()).collect()
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 计划中的单个步骤，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub id: u32,
    pub kind: StepKind,
    /// 计划中原始的动作名
    pub name: String,
    pub purpose: String,
    pub tools: Vec<String>,
}

impl Step {
    pub fn new(id: u32, kind: StepKind, name: impl Into<String>, tools: Vec<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            purpose: kind.purpose().to_string(),
            tools,
        }
    }
}

/// 执行计划
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub company: String,
    pub steps: Vec<Step>,
}

impl Plan {
    /// 静态默认计划，覆盖全部必需步骤
    pub fn default_for(company: &str) -> Self {
        let steps = StepKind::REQUIRED
            .iter()
            .enumerate()
            .map(|(index, kind)| Step::new(index as u32 + 1, *kind, kind.as_str(), kind.default_tools()))
            .collect();
        Self {
            company: company.to_string(),
            steps,
        }
    }

    pub fn step(&self, kind: StepKind) -> Option<&Step> {
        self.steps.iter().find(|step| step.kind == kind)
    }

    /// 必需步骤是否全部出现且保持既定顺序
    pub fn covers_required_steps(&self) -> bool {
        let mut kinds = self.steps.iter().map(|step| step.kind);
        StepKind::REQUIRED
            .iter()
            .all(|required| kinds.any(|kind| kind == *required))
    }
}
