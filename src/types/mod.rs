pub mod plan;
pub mod report;

pub use plan::{Plan, Step, StepKind};
pub use report::{Report, Resource, ResourceCategory, Resources, UseCase};
