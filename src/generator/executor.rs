use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::generator::context::GeneratorContext;
use crate::generator::progress::{ProgressEvent, ProgressSink};
use crate::generator::use_cases::UseCaseGenerator;
use crate::generator::verifier::fallback_summary;
use crate::types::{Plan, Report, Resource, ResourceCategory, StepKind, UseCase};

const SUMMARY_SYSTEM_PROMPT: &str = r#"You are a business analyst who researches companies.
Using the web search results, write a detailed summary of what this company does, covering:
- its primary business and core offerings
- the industry and market it operates in
- its main products, services or platform
- its target customers
- anything distinctive about its business model

Write 3-4 factual, professional sentences."#;

/// 网页搜索使用的查询
pub fn company_search_query(company: &str) -> String {
    format!("{} company what does it do business overview", company)
}

/// 资源检索使用的查询：用例名在前，放宽查询时先去掉公司名
pub fn resource_query(use_case: &str, company: &str) -> String {
    format!("{} {}", use_case.trim(), company.trim())
}

/// 计划执行器：依次完成搜索、摘要、用例生成，再并发检索资源
pub struct Executor<'a> {
    context: &'a GeneratorContext,
    progress: &'a dyn ProgressSink,
}

impl<'a> Executor<'a> {
    pub fn new(context: &'a GeneratorContext, progress: &'a dyn ProgressSink) -> Self {
        Self { context, progress }
    }

    /// 执行计划并组装原始报告；任何外部失败都只会降级，不会中断
    pub async fn execute(&self, plan: &Plan, deadline: Instant) -> Report {
        let company = plan.company.as_str();
        let mut report = Report::new(company);
        let limit = self.context.config.search.results_per_source;

        self.start_step(plan, StepKind::Search);
        let search_results = self
            .context
            .backends
            .web
            .search(&company_search_query(company), limit)
            .await;
        self.complete_step(StepKind::Search, format!("{} 条网页结果", search_results.len()));

        self.start_step(plan, StepKind::Summarize);
        report.company_summary = self.summarize(company, &search_results).await;
        self.complete_step(
            StepKind::Summarize,
            format!("{} 字符", report.company_summary.chars().count()),
        );

        self.start_step(plan, StepKind::GenerateUseCases);
        let mut use_cases = UseCaseGenerator::new(self.context)
            .generate(company, &report.company_summary)
            .await;
        self.complete_step(
            StepKind::GenerateUseCases,
            use_cases
                .iter()
                .map(|use_case| use_case.name.as_str())
                .collect::<Vec<_>>()
                .join("、"),
        );

        self.start_step(plan, StepKind::GatherResources);
        let finished = self.gather_resources(company, &mut use_cases, deadline).await;
        self.complete_step(
            StepKind::GatherResources,
            format!("{}/{} 次检索完成", finished, use_cases.len() * ResourceCategory::ALL.len()),
        );

        report.use_cases = use_cases;
        report
    }

    fn start_step(&self, plan: &Plan, kind: StepKind) {
        if let Some(step) = plan.step(kind) {
            tracing::info!(step = step.id, action = %step.name, tools = ?step.tools, "执行步骤");
        }
        self.progress.emit(ProgressEvent::StepStarted { kind });
    }

    fn complete_step(&self, kind: StepKind, detail: String) {
        self.progress.emit(ProgressEvent::StepCompleted { kind, detail });
    }

    async fn summarize(&self, company: &str, search_results: &[Resource]) -> String {
        let context = search_results
            .iter()
            .take(3)
            .map(|result| {
                format!(
                    "Title: {}\nURL: {}\nContent: {}",
                    result.title,
                    result.url,
                    result.snippet.as_deref().unwrap_or("")
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        let user_prompt = format!(
            "Company Name: {company}\n\nWeb Search Results:\n{context}\n\nSummarize the specific nature of {company}'s business, industry and offerings."
        );

        match self
            .context
            .llm_client
            .complete(
                SUMMARY_SYSTEM_PROMPT,
                &user_prompt,
                self.context.config.llm.generation_temperature,
            )
            .await
        {
            Ok(summary) => summary,
            Err(err) => {
                tracing::warn!(error = %err, "公司摘要生成失败，使用模板摘要");
                fallback_summary(company)
            }
        }
    }

    /// 对每个(用例, 类别)并发检索，写入互不重叠的槽位；
    /// 超过全局截止时间后放弃未完成的任务，对应槽位保持缺失
    async fn gather_resources(
        &self,
        company: &str,
        use_cases: &mut [UseCase],
        deadline: Instant,
    ) -> usize {
        let search = &self.context.config.search;
        let semaphore = Arc::new(Semaphore::new(search.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, use_case) in use_cases.iter().enumerate() {
            let query = resource_query(&use_case.name, company);
            for category in ResourceCategory::ALL {
                let backend = self.context.backends.for_category(category);
                let semaphore = semaphore.clone();
                let query = query.clone();
                let limit = search.results_per_source;

                tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    let resources = backend.search(&query, limit).await;
                    (index, category, resources)
                });
            }
        }

        let mut finished = 0;
        let collected = tokio::time::timeout_at(deadline, async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((index, category, resources)) => {
                        let use_case = &mut use_cases[index];
                        self.progress.emit(ProgressEvent::ResourcesFound {
                            use_case: use_case.name.clone(),
                            category,
                            count: resources.len(),
                        });
                        use_case.resources.insert(category, resources);
                        finished += 1;
                    }
                    Err(err) => tracing::warn!(error = %err, "资源检索任务异常退出"),
                }
            }
        })
        .await;

        if collected.is_err() {
            let aborted = tasks.len();
            tasks.abort_all();
            tracing::warn!(aborted, "已到达全局截止时间，放弃未完成的资源检索");
            self.progress.emit(ProgressEvent::DeadlineExceeded { aborted });
        }

        finished
    }
}
