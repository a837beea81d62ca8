use crate::types::{ResourceCategory, StepKind};

/// 流水线进度事件
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    PlanReady { steps: usize },
    StepStarted { kind: StepKind },
    StepCompleted { kind: StepKind, detail: String },
    ResourcesFound {
        use_case: String,
        category: ResourceCategory,
        count: usize,
    },
    DeadlineExceeded { aborted: usize },
}

/// 进度事件的消费者
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// 在终端打印进度；报告可能写到标准输出，所以进度走标准错误
#[derive(Default)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::PlanReady { steps } => eprintln!("🗺️ 执行计划已生成，共{}个步骤", steps),
            ProgressEvent::StepStarted { kind } => {
                let icon = match kind {
                    StepKind::Search => "🔍",
                    StepKind::Summarize => "📝",
                    StepKind::GenerateUseCases => "💡",
                    StepKind::GatherResources => "🔎",
                    StepKind::Verify => "🧪",
                };
                eprintln!("{} {}...", icon, kind.purpose());
            }
            ProgressEvent::StepCompleted { kind, detail } => eprintln!("✓ {} 完成：{}", kind, detail),
            ProgressEvent::ResourcesFound {
                use_case,
                category,
                count,
            } => eprintln!("   - {} / {}: {} 条", use_case, category, count),
            ProgressEvent::DeadlineExceeded { aborted } => {
                eprintln!("⚠️ 已到达全局截止时间，放弃{}个未完成的检索", aborted)
            }
        }
    }
}

/// 丢弃全部事件
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn emit(&self, _event: ProgressEvent) {}
}
