//! Named task list for the pipeline command
//!
//! | Task | Status |
//! |------|--------|
//! | `policies_npc` | ready |
//! | `finreg` | TODO |
//! | `bank_tech_finance` | TODO |
//! | `peer_products` | TODO |
//! | `investment_itjuzi` | TODO |

use crate::config::Config;
use crate::crawler::CrawlOptions;
use crate::output::RunReport;
use crate::pipeline::policies::{run_policies_task, RunOptions};
use anyhow::Context;
use chrono::NaiveDate;
use std::fmt;

/// A pipeline task, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    PoliciesNpc,
    Finreg,
    BankTechFinance,
    PeerProducts,
    InvestmentItjuzi,
}

impl Task {
    pub const ALL: [Task; 5] = [
        Task::PoliciesNpc,
        Task::Finreg,
        Task::BankTechFinance,
        Task::PeerProducts,
        Task::InvestmentItjuzi,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Task::PoliciesNpc => "policies_npc",
            Task::Finreg => "finreg",
            Task::BankTechFinance => "bank_tech_finance",
            Task::PeerProducts => "peer_products",
            Task::InvestmentItjuzi => "investment_itjuzi",
        }
    }

    /// Returns true if the task has an implementation
    pub fn is_ready(&self) -> bool {
        matches!(self, Task::PoliciesNpc)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for the pipeline command
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Print the plan without running anything
    pub dry_run: bool,
    pub policies_since: Option<NaiveDate>,
    pub policies_skip_export: bool,
}

/// What happened to one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed(RunReport),
    /// Not implemented yet
    Skipped,
    /// Listed by a dry run
    Planned,
}

/// Prints the task plan with each task's status
pub fn print_plan() {
    println!("Planned tasks:");
    for task in Task::ALL {
        let status = if task.is_ready() { "ready" } else { "TODO" };
        println!(" - {} [{}]", task, status);
    }
}

/// Runs every ready task in order
///
/// Placeholder tasks are logged and skipped. The first failing task aborts
/// the pipeline.
///
/// # Returns
///
/// * `Ok(Vec<(Task, TaskOutcome)>)` - One entry per task
/// * `Err(anyhow::Error)` - The failing task's error, with the task named
pub async fn run_pipeline(
    config: &Config,
    options: &PipelineOptions,
) -> anyhow::Result<Vec<(Task, TaskOutcome)>> {
    if options.dry_run {
        print_plan();
        return Ok(Task::ALL.iter().map(|t| (*t, TaskOutcome::Planned)).collect());
    }

    let mut outcomes = Vec::with_capacity(Task::ALL.len());
    for task in Task::ALL {
        if !task.is_ready() {
            tracing::warn!("Skipping {}: not implemented yet", task);
            outcomes.push((task, TaskOutcome::Skipped));
            continue;
        }

        tracing::info!("Running {}", task);
        let report = run_task(task, config, options)
            .await
            .with_context(|| format!("task {} failed", task))?;
        outcomes.push((task, TaskOutcome::Completed(report)));
    }

    Ok(outcomes)
}

async fn run_task(
    task: Task,
    config: &Config,
    options: &PipelineOptions,
) -> anyhow::Result<RunReport> {
    match task {
        Task::PoliciesNpc => {
            let run_options = RunOptions {
                crawl: CrawlOptions {
                    since: options.policies_since,
                    ..CrawlOptions::default()
                },
                skip_export: options.policies_skip_export,
                ..RunOptions::from_config(config)
            };
            Ok(run_policies_task(config, &run_options).await?)
        }
        other => anyhow::bail!("task {} has no implementation", other),
    }
}
