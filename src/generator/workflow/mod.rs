use crate::config::{Config, PreconditionError};
use crate::generator::context::GeneratorContext;
use crate::generator::executor::Executor;
use crate::generator::planner::PlanGenerator;
use crate::generator::progress::{ConsoleProgress, ProgressEvent, ProgressSink};
use crate::generator::verifier;
use crate::types::{Report, StepKind};

use anyhow::{Context, Result};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: Vec<(String, Instant)>,
    phase_durations: Vec<(String, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: Vec::new(),
            phase_durations: Vec::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &str) {
        self.phase_start_times
            .push((phase_name.to_string(), Instant::now()));
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &str) -> Option<Duration> {
        let position = self
            .phase_start_times
            .iter()
            .position(|(name, _)| name == phase_name)?;
        let (name, start_time) = self.phase_start_times.remove(position);
        let duration = start_time.elapsed();
        self.phase_durations.push((name, duration));
        Some(duration)
    }

    /// 获取总执行时间
    pub fn get_total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 按完成顺序获取各阶段的执行时间
    pub fn get_phase_durations(&self) -> &[(String, Duration)] {
        &self.phase_durations
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.get_total_duration().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for (phase, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}秒\n", phase, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// 时间跟踪常量
pub struct TimingKeys;

impl TimingKeys {
    pub const PLAN: &'static str = "plan";
    pub const EXECUTE: &'static str = "execute";
    pub const VERIFY: &'static str = "verify";
}

/// 截止时间超出时钟范围时使用的替代值
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// 从现在起计算全局截止时间，溢出时视为不设限
pub fn deadline_after(limit: Duration) -> tokio::time::Instant {
    let now = tokio::time::Instant::now();
    now.checked_add(limit).unwrap_or_else(|| now + FAR_FUTURE)
}

/// 运行完整流水线：计划 → 执行 → 校验。外部失败只会降级，因此总能得到报告
pub async fn run_pipeline(
    context: &GeneratorContext,
    company: &str,
    progress: &dyn ProgressSink,
) -> Report {
    run_timed(context, company, progress).await.0
}

/// 运行流水线并返回各阶段耗时
async fn run_timed(
    context: &GeneratorContext,
    company: &str,
    progress: &dyn ProgressSink,
) -> (Report, TimingScope) {
    let deadline = deadline_after(context.config.search.deadline());
    let mut timing = TimingScope::new();

    timing.start_phase(TimingKeys::PLAN);
    let plan = PlanGenerator::new(context).generate(company).await;
    progress.emit(ProgressEvent::PlanReady {
        steps: plan.steps.len(),
    });
    timing.end_phase(TimingKeys::PLAN);

    timing.start_phase(TimingKeys::EXECUTE);
    let mut report = Executor::new(context, progress).execute(&plan, deadline).await;
    timing.end_phase(TimingKeys::EXECUTE);

    timing.start_phase(TimingKeys::VERIFY);
    progress.emit(ProgressEvent::StepStarted {
        kind: StepKind::Verify,
    });
    let violations = verifier::normalize(&mut report);
    for violation in &violations {
        tracing::info!(%violation, "报告已自动修正");
    }
    progress.emit(ProgressEvent::StepCompleted {
        kind: StepKind::Verify,
        detail: format!("修正{}处问题", violations.len()),
    });
    timing.end_phase(TimingKeys::VERIFY);

    (report, timing)
}

/// 为指定公司生成用例报告并输出
pub async fn launch(config: &Config, company: &str) -> Result<Report> {
    let company = company.trim();
    if company.is_empty() {
        return Err(PreconditionError::EmptyCompanyName.into());
    }
    // 凭据缺失在流水线开始前直接报错
    config.ensure_credentials()?;

    let context = GeneratorContext::new(config.clone())?;
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id, company);

    eprintln!("🚀 开始分析 {} 的AI用例...", company);
    let (report, timing) = run_timed(&context, company, &ConsoleProgress)
        .instrument(span.clone())
        .await;

    write_report(&report, config)?;
    span.in_scope(|| tracing::info!("{}", timing.generate_timing_report()));
    Ok(report)
}

/// 离线重新校验已有报告文件，不需要任何凭据
pub fn verify_file(config: &Config, input: &Path) -> Result<Report> {
    let content = std::fs::read_to_string(input)
        .context(format!("Failed to read report file: {:?}", input))?;
    let report: Report =
        serde_json::from_str(&content).context("Failed to parse report file")?;

    let report = verifier::verify(report);
    write_report(&report, config)?;
    Ok(report)
}

/// 序列化报告
pub fn render_report(report: &Report, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    Ok(json)
}

/// 将报告写到配置的输出文件，未配置时写到标准输出
pub fn write_report(report: &Report, config: &Config) -> Result<()> {
    let json = render_report(report, config.pretty)?;

    match &config.output_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .context(format!("Failed to create output directory: {:?}", parent))?;
            }
            std::fs::write(path, json)
                .context(format!("Failed to write report: {:?}", path))?;
            eprintln!("💾 报告已保存到 {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
