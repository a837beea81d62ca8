use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::generator::context::GeneratorContext;
use crate::llm::client::LLMClient;
use crate::types::UseCase;

/// 报告中允许的最多用例数
pub const MAX_USE_CASES: usize = 5;

/// 报告中要求的最少用例数
pub const MIN_USE_CASES: usize = 3;

const SYSTEM_PROMPT: &str = r#"You are an AI consultant who identifies practical AI opportunities for businesses.
Based on the company description, propose between 3 and 5 AI use-cases that are specific to this company's industry, products and operations.
Avoid generic ideas unless they are clearly relevant to this company.

For each use-case provide:
- "use_case": a short, specific name
- "description": two or three sentences on how it works and how it benefits this company

Return ONLY a JSON array in exactly this format, with no text before or after it:
[
  {"use_case": "Specific Use Case Name", "description": "How it works and why it matters for this company"}
]"#;

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UseCaseDraft {
    #[serde(default, alias = "name")]
    pub use_case: String,
    #[serde(default)]
    pub description: String,
}

/// 用例列表，Extractor按此结构提交
#[derive(Debug, Serialize, JsonSchema)]
pub struct UseCaseList {
    pub use_cases: Vec<UseCaseDraft>,
}

/// 文本回复兼容裸数组与 `{"use_cases": [...]}` 两种形式
#[derive(Deserialize)]
#[serde(untagged)]
enum UseCasePayload {
    List(Vec<UseCaseDraft>),
    Wrapped { use_cases: Vec<UseCaseDraft> },
}

impl<'de> Deserialize<'de> for UseCaseList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let use_cases = match UseCasePayload::deserialize(deserializer)? {
            UseCasePayload::List(drafts) => drafts,
            UseCasePayload::Wrapped { use_cases } => use_cases,
        };
        Ok(Self { use_cases })
    }
}

/// 丢弃空名称条目并截断到上限；没有剩余条目时视为无效输出
pub fn accept_payload(payload: UseCaseList) -> Result<Vec<UseCase>, String> {
    let use_cases: Vec<UseCase> = payload
        .use_cases
        .into_iter()
        .filter(|draft| !draft.use_case.trim().is_empty())
        .take(MAX_USE_CASES)
        .map(|draft| UseCase::new(draft.use_case.trim(), draft.description.trim()))
        .collect();

    if use_cases.is_empty() {
        return Err("no named use-cases in response".to_string());
    }
    Ok(use_cases)
}

/// 通用用例模板，既用于生成失败的兜底，也用于补足数量
pub fn default_use_cases(company: &str) -> Vec<UseCase> {
    vec![
        UseCase::new(
            "Customer Service Chatbot",
            format!(
                "Deploy an AI assistant that answers customer inquiries for {}, shortening response times and improving satisfaction.",
                company
            ),
        ),
        UseCase::new(
            "Predictive Analytics",
            format!(
                "Apply machine learning to {}'s business data to forecast trends and support better decisions.",
                company
            ),
        ),
        UseCase::new(
            "Process Automation",
            format!(
                "Automate repetitive tasks and workflows at {} to increase efficiency and reduce operating costs.",
                company
            ),
        ),
    ]
}

/// 用例生成器
pub struct UseCaseGenerator<'a> {
    llm: &'a LLMClient,
    temperature: f64,
}

impl<'a> UseCaseGenerator<'a> {
    pub fn new(context: &'a GeneratorContext) -> Self {
        Self {
            llm: &context.llm_client,
            temperature: context.config.llm.generation_temperature,
        }
    }

    /// 生成不超过5个用例；两次尝试均失败时返回单个通用用例
    pub async fn generate(&self, company: &str, summary: &str) -> Vec<UseCase> {
        let user_prompt = format!(
            "Company Name: {company}\n\nCompany Description:\n{summary}\n\nPropose 3 to 5 AI use-cases tailored to what {company} actually does."
        );

        match self
            .llm
            .complete_json_with(SYSTEM_PROMPT, &user_prompt, self.temperature, accept_payload)
            .await
        {
            Ok(use_cases) => use_cases,
            Err(err) => {
                tracing::warn!(error = %err, "用例生成失败，使用通用用例");
                default_use_cases(company).into_iter().take(1).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::testing::{ScriptedChat, StaticBackend, context, uniform_backends};
    use std::sync::Arc;

    fn generator_context(chat: &Arc<ScriptedChat>) -> GeneratorContext {
        let empty = StaticBackend::new("empty", Vec::new());
        context(chat, uniform_backends(empty.clone(), empty))
    }

    fn names(use_cases: &[UseCase]) -> Vec<&str> {
        use_cases.iter().map(|u| u.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_generate_from_array() {
        let chat = ScriptedChat::ok(&[r#"[
            {"use_case": "Demand Forecasting", "description": "Predict demand"},
            {"use_case": "  ", "description": "discarded"},
            {"name": "Fraud Detection", "description": "Flag fraud"}
        ]"#]);
        let context = generator_context(&chat);

        let use_cases = UseCaseGenerator::new(&context).generate("Acme", "Acme sells anvils").await;

        assert_eq!(names(&use_cases), vec!["Demand Forecasting", "Fraud Detection"]);
        assert!(use_cases[0].resources.is_empty());
        assert_eq!(chat.calls()[0].2, 0.7);
    }

    #[tokio::test]
    async fn test_generate_from_wrapped_object_truncates() {
        let items: Vec<String> = (1..=8)
            .map(|i| format!(r#"{{"use_case": "Use Case {}", "description": "d"}}"#, i))
            .collect();
        let reply = format!(r#"{{"use_cases": [{}]}}"#, items.join(","));
        let chat = ScriptedChat::ok(&[reply.as_str()]);
        let context = generator_context(&chat);

        let use_cases = UseCaseGenerator::new(&context).generate("Acme", "summary").await;

        assert_eq!(use_cases.len(), MAX_USE_CASES);
        assert_eq!(use_cases[4].name, "Use Case 5");
    }

    #[test]
    fn test_use_case_list_schema_is_object() {
        // 提交工具的参数必须是对象
        let schema = serde_json::to_value(schemars::schema_for!(UseCaseList)).unwrap();

        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["use_cases"].is_object());
    }

    #[test]
    fn test_use_case_list_accepts_both_shapes() {
        let list: UseCaseList =
            serde_json::from_str(r#"[{"use_case": "Visual Search", "description": "d"}]"#).unwrap();
        let wrapped: UseCaseList =
            serde_json::from_str(r#"{"use_cases": [{"name": "Visual Search"}]}"#).unwrap();

        assert_eq!(list.use_cases[0].use_case, "Visual Search");
        assert_eq!(wrapped.use_cases[0].use_case, "Visual Search");
        assert!(wrapped.use_cases[0].description.is_empty());
    }

    #[tokio::test]
    async fn test_empty_output_is_retried() {
        let chat = ScriptedChat::ok(&[
            "[]",
            r#"[{"use_case": "Route Optimization", "description": "Plan routes"}]"#,
        ]);
        let context = generator_context(&chat);

        let use_cases = UseCaseGenerator::new(&context).generate("Acme", "summary").await;

        assert_eq!(names(&use_cases), vec!["Route Optimization"]);
        assert_eq!(chat.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_second_failure_yields_single_fallback() {
        let chat = ScriptedChat::ok(&["Sorry, I can't help.", r#"{"unexpected": true}"#]);
        let context = generator_context(&chat);

        let use_cases = UseCaseGenerator::new(&context).generate("Acme", "summary").await;

        assert_eq!(use_cases.len(), 1);
        assert_eq!(use_cases[0].name, "Customer Service Chatbot");
        assert!(use_cases[0].description.contains("Acme"));
    }
}
