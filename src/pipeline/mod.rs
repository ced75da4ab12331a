//! Pipeline module: the policies task and the named task runner

mod policies;
mod tasks;

pub use policies::{run, run_policies_task, RunOptions};
pub use tasks::{print_plan, run_pipeline, PipelineOptions, Task, TaskOutcome};
