//! Batch coordinator
//!
//! Expands a [`BatchJob`] into the cross product of commands and target
//! servers, always command-major: every target runs the first command
//! before any target sees the second.

use futures::future::join_all;

use sb_core::{BatchError, BatchFailure, CommandOutcome, DispatchError, ExecutionMode};
use sb_protocol::ServerId;

use crate::dispatcher::Dispatcher;

/// Commands to run against a set of servers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    commands: Vec<String>,
    targets: Vec<ServerId>,
    mode: ExecutionMode,
}

impl BatchJob {
    /// Trim commands, drop blank ones and collapse duplicate targets while
    /// keeping selection order
    pub fn new<I, S, T>(commands: I, targets: T, mode: ExecutionMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        T: IntoIterator<Item = ServerId>,
    {
        let commands = commands
            .into_iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        let mut unique = Vec::new();
        for id in targets {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        Self {
            commands,
            targets: unique,
            mode,
        }
    }

    /// One command per non-blank line of `script`
    pub fn from_script<T>(script: &str, targets: T, mode: ExecutionMode) -> Self
    where
        T: IntoIterator<Item = ServerId>,
    {
        Self::new(script.lines(), targets, mode)
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn targets(&self) -> &[ServerId] {
        &self.targets
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Number of dispatches the job expands to
    pub fn dispatch_count(&self) -> usize {
        self.commands.len() * self.targets.len()
    }
}

/// Outcomes of a batch that ran without failures
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub mode: ExecutionMode,
    /// In issue order
    pub outcomes: Vec<CommandOutcome>,
}

/// Runs batch jobs through a [`Dispatcher`]
#[derive(Clone)]
pub struct BatchCoordinator {
    dispatcher: Dispatcher,
}

impl BatchCoordinator {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn run_batch(&self, job: BatchJob) -> Result<BatchReport, BatchError> {
        if job.targets.is_empty() {
            return Err(BatchError::InvalidBatchJob(
                "no target servers selected".to_string(),
            ));
        }
        if job.commands.is_empty() {
            return Err(BatchError::InvalidBatchJob(
                "no commands to run".to_string(),
            ));
        }

        tracing::info!(
            mode = %job.mode,
            "Running {} command(s) on {} server(s)",
            job.commands.len(),
            job.targets.len()
        );

        match job.mode {
            ExecutionMode::Sequential => self.run_sequential(&job).await,
            ExecutionMode::Parallel => self.run_parallel(&job).await,
        }
    }

    async fn run_sequential(&self, job: &BatchJob) -> Result<BatchReport, BatchError> {
        let mut completed = Vec::with_capacity(job.dispatch_count());

        for command in &job.commands {
            for &server_id in &job.targets {
                let request = self.dispatcher.next_request(server_id, command);
                let result = self.dispatcher.dispatch(request).await;

                match classify(command, server_id, result) {
                    Ok(outcome) => completed.push(outcome),
                    Err(failure) => {
                        tracing::warn!(mode = "sequential", "Batch aborted: {}", failure);
                        return Err(BatchError::BatchAborted { completed, failure });
                    }
                }
            }
        }

        Ok(BatchReport {
            mode: ExecutionMode::Sequential,
            outcomes: completed,
        })
    }

    async fn run_parallel(&self, job: &BatchJob) -> Result<BatchReport, BatchError> {
        let requests: Vec<_> = job
            .commands
            .iter()
            .flat_map(|command| {
                job.targets
                    .iter()
                    .map(move |&server_id| self.dispatcher.next_request(server_id, command))
            })
            .collect();

        let results = join_all(requests.into_iter().map(|request| {
            let dispatcher = self.dispatcher.clone();
            async move {
                let command = request.command_text.clone();
                let server_id = request.server_id;
                classify(&command, server_id, dispatcher.dispatch(request).await)
            }
        }))
        .await;

        let mut succeeded = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(outcome) => succeeded.push(outcome),
                Err(failure) => failures.push(failure),
            }
        }

        if failures.is_empty() {
            Ok(BatchReport {
                mode: ExecutionMode::Parallel,
                outcomes: succeeded,
            })
        } else {
            tracing::warn!(
                mode = "parallel",
                "{} of {} dispatch(es) failed",
                failures.len(),
                failures.len() + succeeded.len()
            );
            Err(BatchError::PartialBatchFailure {
                failed: failures.len(),
                failures,
                succeeded,
            })
        }
    }
}

/// Treat `success = false` the same as a dispatch error
fn classify(
    command: &str,
    server_id: ServerId,
    result: Result<CommandOutcome, DispatchError>,
) -> Result<CommandOutcome, BatchFailure> {
    let reason = match result {
        Ok(outcome) if outcome.success => return Ok(outcome),
        Ok(outcome) => {
            if outcome.message.is_empty() {
                outcome.output
            } else {
                outcome.message
            }
        }
        Err(e) => e.to_string(),
    };

    Err(BatchFailure {
        command: command.to_string(),
        server_id,
        reason,
    })
}
