//! Scenario-based tests for stagehand

mod file_steps;
mod lifecycle;
mod parallel_stage;
mod process_steps;
mod sequential_job;
mod variable_steps;
