pub mod context;
pub mod executor;
pub mod planner;
pub mod progress;
pub mod use_cases;
pub mod verifier;
pub mod workflow;

#[cfg(test)]
mod testing;
