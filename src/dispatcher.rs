//! Bounded-concurrency job dispatch.
//!
//! One loop owns every piece of mutable run state: the pending FIFO, the
//! per-job state machine, and the aggregate counters. Job tasks never touch
//! it; they only send [`JobEvent`]s over the channel, so admission and
//! completion handling need no locks. The concurrency cap is the only
//! admission control: on each completion the freed slot is refilled from the
//! backlog until it is exhausted.

use crate::command::CommandTemplate;
use crate::config::Config;
use crate::runner::{self, JobEvent};
use crate::sink::OutputSink;
use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Aggregate result of a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub completed: usize,
    /// Literal sum of per-job exit statuses; the run's own exit code.
    pub status_sum: i32,
    pub elapsed: Duration,
}

/// Per-job lifecycle. Completion is only accepted from `Running`, which is
/// what makes the report-exactly-once contract checkable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    Pending,
    Running,
    Done,
}

/// Run the whole batch: admit up to the cap, refill on completion, drain.
///
/// Validates the configuration before anything starts. Per-job failures are
/// folded into the summary, never returned as errors; the only error paths
/// are configuration rejection and sink I/O.
pub async fn run(
    config: &Config,
    hosts: Vec<String>,
    command: Vec<String>,
    sink: &mut dyn OutputSink,
) -> Result<RunSummary> {
    config.validate(&command)?;

    let template = CommandTemplate::new(&config.transport, command);
    let started = Instant::now();
    let total = hosts.len();

    if config.dry_run {
        return dry_run(&template, &hosts, sink, started);
    }

    let cap = config.max_concurrency as usize;
    let mut states = vec![JobState::Pending; total];
    let mut pending: VecDeque<usize> = (0..total).collect();
    let mut running = 0usize;
    let mut completed = 0usize;
    let mut status_sum = 0i32;

    let (events_tx, mut events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let mut progress = ProgressSignal::new().context("failed to install progress signal handler")?;

    // Initial admission; with cap >= total this degenerates to full
    // parallelism and the backlog is empty from the start.
    while running < cap {
        let Some(job) = pending.pop_front() else {
            break;
        };
        states[job] = JobState::Running;
        runner::spawn_job(job, hosts[job].clone(), &template, events_tx.clone());
        running += 1;
    }

    while completed < total {
        tokio::select! {
            event = events_rx.recv() => {
                // The dispatcher holds a sender, so the channel never closes
                // while jobs remain.
                let Some(event) = event else { break };
                match event {
                    JobEvent::Data { job, source, chunk } => {
                        sink.on_data(job, &hosts[job], source, &chunk)
                            .context("failed to write job output")?;
                    }
                    JobEvent::Exited { job, status, duration } => {
                        if states[job] != JobState::Running {
                            tracing::warn!(
                                "dropping duplicate completion for job {} ({})",
                                job, hosts[job]
                            );
                            continue;
                        }
                        states[job] = JobState::Done;
                        sink.on_job_complete(job, &hosts[job], status, duration)
                            .context("failed to report job completion")?;
                        tracing::debug!(
                            host = %hosts[job],
                            status,
                            ?duration,
                            "job finished"
                        );
                        running -= 1;
                        completed += 1;
                        status_sum += status;

                        // Refill the freed slot from the backlog.
                        while running < cap {
                            let Some(next) = pending.pop_front() else { break };
                            states[next] = JobState::Running;
                            runner::spawn_job(
                                next,
                                hosts[next].clone(),
                                &template,
                                events_tx.clone(),
                            );
                            running += 1;
                        }
                    }
                }
            }
            _ = progress.recv() => {
                crate::summary::write_progress(&mut std::io::stderr(), completed, total)
                    .context("failed to write progress")?;
            }
        }
    }

    debug_assert_eq!(running, 0);
    debug_assert!(pending.is_empty());

    sink.finish().context("failed to flush output")?;
    let elapsed = started.elapsed();
    tracing::info!(
        completed,
        total,
        status_sum,
        "run drained in {:.2}s",
        elapsed.as_secs_f64()
    );

    Ok(RunSummary {
        total,
        completed,
        status_sum,
        elapsed,
    })
}

/// Dry run: log every intended invocation, spawn nothing, complete each job
/// immediately with status 0.
fn dry_run(
    template: &CommandTemplate,
    hosts: &[String],
    sink: &mut dyn OutputSink,
    started: Instant,
) -> Result<RunSummary> {
    for (job, host) in hosts.iter().enumerate() {
        tracing::info!("dry-run: {}", template.render(host));
        sink.on_job_complete(job, host, 0, Duration::ZERO)
            .context("failed to report job completion")?;
    }
    sink.finish().context("failed to flush output")?;
    Ok(RunSummary {
        total: hosts.len(),
        completed: hosts.len(),
        status_sum: 0,
        elapsed: started.elapsed(),
    })
}

/// External progress trigger: SIGUSR1 on unix, never fires elsewhere.
struct ProgressSignal {
    #[cfg(unix)]
    inner: tokio::signal::unix::Signal,
}

impl ProgressSignal {
    fn new() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                inner: signal(SignalKind::user_defined1())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    async fn recv(&mut self) {
        #[cfg(unix)]
        {
            self.inner.recv().await;
        }
        #[cfg(not(unix))]
        {
            std::future::pending::<()>().await
        }
    }
}
