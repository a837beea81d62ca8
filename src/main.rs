use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use usecase_radar::cli::{self, Task};
use usecase_radar::{launch, verify_file};

/// 初始化日志：RUST_LOG优先，否则按 --verbose 选择级别
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "usecase_radar=debug,warn"
    } else {
        "usecase_radar=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = cli::Args::parse();
    init_tracing(args.verbose);

    let task = args.task()?;
    let config = args.into_config()?;

    match task {
        Task::Analyze { company } => {
            launch(&config, &company).await?;
        }
        Task::Verify { input } => {
            verify_file(&config, &input)?;
        }
    }

    Ok(())
}
