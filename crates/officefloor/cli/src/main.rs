// OfficeFloor Execution
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Floor Teams CLI Tool
//!
//! Drives a team with a synthetic workload of countdown jobs and reports how
//! the team executed them.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use officefloor_common::ExecutionConfig;
use officefloor_core::{
    DirectExecutive, ExecutionContext, ExecutorTeam, Job, JobContext, JobPoll, ManagedExecutionFactory, PassiveTeam, ProcessContextTeam,
    Team, ThreadCompletionListener, ThreadFactoryManufacturer, WorkerPerJobTeam,
};
use serde::Serialize;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{error, info};

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "floor-teams")]
#[command(about = "OfficeFloor teams - drive a team with a synthetic workload")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run countdown jobs on a team
    Run {
        /// Team implementation
        #[arg(long, value_enum, default_value_t = TeamKind::Executor)]
        team: TeamKind,
        /// Number of jobs to assign
        #[arg(long, default_value_t = 100)]
        jobs: usize,
        /// Times each job reports pending before completing
        #[arg(long, default_value_t = 3)]
        pending_rounds: u32,
        /// Worker count for the executor team (overrides OFFICEFLOOR_TEAM_SIZE)
        #[arg(long)]
        size: Option<usize>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
enum TeamKind {
    Executor,
    OnePerson,
    WorkerPerJob,
    Passive,
    ProcessContext,
}

#[derive(Debug, Serialize)]
struct RunReport {
    team: TeamKind,
    jobs: usize,
    pending_rounds: u32,
    invocations: u64,
    thread_completions: usize,
    elapsed_ms: u128,
}

/// Job that reports pending a fixed number of times before completing
struct CountdownJob {
    remaining: u32,
    invocations: Arc<AtomicU64>,
    done: mpsc::Sender<()>,
}

impl Job for CountdownJob {
    fn do_job(&mut self, _context: &mut dyn JobContext) -> JobPoll {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        if self.remaining > 0 {
            self.remaining -= 1;
            return JobPoll::Pending;
        }
        let _ = self.done.send(());
        JobPoll::Complete
    }
}

#[derive(Default)]
struct CompletionCounter(AtomicUsize);

impl ThreadCompletionListener for CompletionCounter {
    fn thread_complete(&self) -> anyhow::Result<()> {
        self.0.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            team,
            jobs,
            pending_rounds,
            size,
            json,
        } => handle_run(team, jobs, pending_rounds, size, json),
        Commands::Config => handle_config(),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        process::exit(1);
    }
}

fn handle_config() -> anyhow::Result<()> {
    let config = ExecutionConfig::from_env();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn handle_run(kind: TeamKind, jobs: usize, pending_rounds: u32, size: Option<usize>, json: bool) -> anyhow::Result<()> {
    let mut config = ExecutionConfig::from_env();
    if let Some(size) = size {
        config.team_size = size;
    }
    config.validate()?;

    let report = run_workload(kind, jobs, pending_rounds, &config)?;
    info!(
        team = ?report.team,
        jobs = report.jobs,
        invocations = report.invocations,
        "Workload finished"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Team:               {:?}", report.team);
        println!("Jobs:               {}", report.jobs);
        println!("Pending rounds:     {}", report.pending_rounds);
        println!("Invocations:        {}", report.invocations);
        println!("Thread completions: {}", report.thread_completions);
        println!("Elapsed:            {} ms", report.elapsed_ms);
    }
    Ok(())
}

fn run_workload(kind: TeamKind, jobs: usize, pending_rounds: u32, config: &ExecutionConfig) -> anyhow::Result<RunReport> {
    let counter = Arc::new(CompletionCounter::default());
    let listener: Arc<dyn ThreadCompletionListener> = counter.clone();
    let manufacturer = ThreadFactoryManufacturer::new(ManagedExecutionFactory::new(vec![listener]), None);

    let invocations = Arc::new(AtomicU64::new(0));
    let (done_tx, done_rx) = mpsc::channel();
    let job = || -> Box<dyn Job> {
        Box::new(CountdownJob {
            remaining: pending_rounds,
            invocations: invocations.clone(),
            done: done_tx.clone(),
        })
    };

    let start = Instant::now();
    let executive = Arc::new(DirectExecutive);
    match kind {
        TeamKind::Executor => {
            let team = ExecutorTeam::from_config("executor", &manufacturer, executive, config);
            drive(&team, jobs, &job, &done_rx)?;
        }
        TeamKind::OnePerson => {
            let factory = manufacturer.manufacture_thread_factory(&config.thread_group("one-person"), executive);
            drive(&ExecutorTeam::one_person("one-person", factory, config), jobs, &job, &done_rx)?;
        }
        TeamKind::WorkerPerJob => {
            let factory = manufacturer.manufacture_thread_factory(&config.thread_group("worker-per-job"), executive);
            let team = WorkerPerJobTeam::new("worker-per-job", factory).with_retry(config.retry);
            drive(&team, jobs, &job, &done_rx)?;
        }
        TeamKind::Passive => {
            drive(&PassiveTeam::new("passive").with_retry(config.retry), jobs, &job, &done_rx)?;
        }
        TeamKind::ProcessContext => {
            let team = ProcessContextTeam::new("process-context").with_retry(config.retry);
            team.start_working()?;
            let mut ctx = ExecutionContext::new();
            team.run_in_context(&mut ctx, |ctx| -> anyhow::Result<()> {
                for _ in 0..jobs {
                    team.assign_job_in(ctx, job(), None)?;
                }
                Ok(())
            })??;
            wait_for_completion(&done_rx, jobs)?;
            team.stop_working()?;
        }
    }

    Ok(RunReport {
        team: kind,
        jobs,
        pending_rounds,
        invocations: invocations.load(Ordering::Relaxed),
        thread_completions: counter.0.load(Ordering::Relaxed),
        elapsed_ms: start.elapsed().as_millis(),
    })
}

/// Start `team`, assign the workload from this thread and stop once every
/// job has completed
fn drive(team: &dyn Team, jobs: usize, job: &dyn Fn() -> Box<dyn Job>, done: &mpsc::Receiver<()>) -> anyhow::Result<()> {
    team.start_working()?;
    for _ in 0..jobs {
        team.assign_job(job(), None)?;
    }
    wait_for_completion(done, jobs)?;
    team.stop_working()?;
    Ok(())
}

fn wait_for_completion(done: &mpsc::Receiver<()>, jobs: usize) -> anyhow::Result<()> {
    for completed in 0..jobs {
        done.recv_timeout(COMPLETION_TIMEOUT)
            .with_context(|| format!("Only {completed} of {jobs} jobs completed"))?;
    }
    Ok(())
}
