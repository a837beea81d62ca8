pub mod backends;
pub mod cli;
pub mod config;
pub mod generator;
pub mod llm;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use generator::workflow::{launch, run_pipeline, verify_file};
pub use types::{Plan, Report, Resource, ResourceCategory, UseCase};
