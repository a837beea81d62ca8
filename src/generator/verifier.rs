//! 报告校验与规范化
//!
//! 纯函数、无外部调用且幂等：每条规则只在字段缺失或无效时生效，
//! 因此对已规范化的报告再次执行不会产生任何修改。

use std::collections::HashSet;
use thiserror::Error;

use crate::generator::use_cases::{MAX_USE_CASES, MIN_USE_CASES, default_use_cases};
use crate::types::{Report, Resource, ResourceCategory, UseCase};

/// 校验发现并已自动修正的问题
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("company summary is blank")]
    BlankSummary,

    #[error("{count} use cases exceed the maximum of {max}", max = MAX_USE_CASES)]
    TooManyUseCases { count: usize },

    #[error("{count} use cases are below the minimum of {min}", min = MIN_USE_CASES)]
    TooFewUseCases { count: usize },

    #[error("use case #{index} has a blank name")]
    BlankUseCaseName { index: usize },

    #[error("use case `{use_case}` has a blank description")]
    BlankDescription { use_case: String },

    #[error("use case `{use_case}` has no `{category}` resources")]
    MissingCategory {
        use_case: String,
        category: ResourceCategory,
    },

    #[error("use case `{use_case}` has an empty `{category}` resource list")]
    EmptyCategory {
        use_case: String,
        category: ResourceCategory,
    },
}

/// 摘要缺失时使用的模板句
pub fn fallback_summary(company: &str) -> String {
    format!("{} is a company in the technology/business sector.", company)
}

fn fallback_description(company: &str, use_case: &str) -> String {
    format!(
        "Apply AI to {} at {} to improve efficiency and decision-making.",
        use_case, company
    )
}

/// 就地规范化报告，返回已修正的问题列表
pub fn normalize(report: &mut Report) -> Vec<SchemaViolation> {
    let mut violations = Vec::new();

    if report.company_summary.trim().is_empty() {
        report.company_summary = fallback_summary(&report.company);
        violations.push(SchemaViolation::BlankSummary);
    }

    let count = report.use_cases.len();
    if count > MAX_USE_CASES {
        report.use_cases.truncate(MAX_USE_CASES);
        violations.push(SchemaViolation::TooManyUseCases { count });
    }

    for (index, use_case) in report.use_cases.iter_mut().enumerate() {
        if use_case.name.trim().is_empty() {
            use_case.name = format!("AI Use Case {}", index + 1);
            violations.push(SchemaViolation::BlankUseCaseName { index: index + 1 });
        }
    }

    if count < MIN_USE_CASES {
        pad_use_cases(report);
        violations.push(SchemaViolation::TooFewUseCases { count });
    }

    for use_case in report.use_cases.iter_mut() {
        if use_case.description.trim().is_empty() {
            use_case.description = fallback_description(&report.company, &use_case.name);
            violations.push(SchemaViolation::BlankDescription {
                use_case: use_case.name.clone(),
            });
        }
        fill_resources(use_case, &mut violations);
    }

    violations
}

/// 规范化并记录修正内容
pub fn verify(mut report: Report) -> Report {
    let violations = normalize(&mut report);
    for violation in &violations {
        tracing::info!(%violation, "报告已自动修正");
    }
    report
}

/// 按模板补足用例，跳过同名用例
fn pad_use_cases(report: &mut Report) {
    let existing: HashSet<String> = report
        .use_cases
        .iter()
        .map(|use_case| use_case.name.trim().to_lowercase())
        .collect();
    let mut templates = default_use_cases(&report.company)
        .into_iter()
        .filter(|template| !existing.contains(&template.name.to_lowercase()));

    while report.use_cases.len() < MIN_USE_CASES {
        let next = templates.next().unwrap_or_else(|| {
            let n = report.use_cases.len() + 1;
            let name = format!("AI Use Case {}", n);
            let description = fallback_description(&report.company, &name);
            UseCase::new(name, description)
        });
        report.use_cases.push(next);
    }
}

fn fill_resources(use_case: &mut UseCase, violations: &mut Vec<SchemaViolation>) {
    for category in ResourceCategory::ALL {
        let violation = match use_case.resources.get(category) {
            None => SchemaViolation::MissingCategory {
                use_case: use_case.name.clone(),
                category,
            },
            Some([]) => SchemaViolation::EmptyCategory {
                use_case: use_case.name.clone(),
                category,
            },
            Some(_) => continue,
        };
        use_case
            .resources
            .insert(category, vec![Resource::placeholder(category, &use_case.name)]);
        violations.push(violation);
    }
}
