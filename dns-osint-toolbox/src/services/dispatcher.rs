//! Bounded-concurrency fan-out of DNS queries.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::types::{DnsRecordType, QueryOutcome};

use super::classifier::classify;
use super::resolver::{ResolveFailure, ResolverHandle};
use super::stats::round_to;

/// One query to run: exactly one [`QueryOutcome`] comes back for it.
#[derive(Clone)]
pub(crate) struct QueryTask {
    target: String,
    record_type: DnsRecordType,
    handle: ResolverHandle,
    operation: &'static str,
    extra_context: Vec<(&'static str, String)>,
}

impl QueryTask {
    pub(crate) fn new(
        target: impl Into<String>,
        record_type: DnsRecordType,
        handle: ResolverHandle,
        operation: &'static str,
    ) -> Self {
        Self {
            target: target.into(),
            record_type,
            handle,
            operation,
            extra_context: Vec::new(),
        }
    }

    /// Attach an extra field to the classified error on failure.
    pub(crate) fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.extra_context.push((key, value.into()));
        self
    }

    fn failure_context(&self) -> BTreeMap<String, String> {
        let mut context = super::classifier::context([
            ("domain", self.target.clone()),
            ("record_type", self.record_type.to_string()),
            ("resolver", self.handle.identity().id().to_string()),
            ("operation", self.operation.to_string()),
        ]);
        for (key, value) in &self.extra_context {
            context.insert((*key).to_string(), value.clone());
        }
        context
    }
}

/// Outcomes of one dispatch round, in input order.
#[derive(Debug, Clone)]
pub(crate) struct DispatchRound {
    pub outcomes: Vec<QueryOutcome>,
    /// Wall-clock seconds for the whole round, 3 decimals.
    pub total_elapsed: f64,
}

/// Run a single task, timing only the resolver call.
pub(crate) async fn run_task(task: QueryTask) -> QueryOutcome {
    let started = Instant::now();
    let result = task.handle.query(&task.target, task.record_type).await;
    let elapsed_seconds = round_to(started.elapsed().as_secs_f64(), 3);

    match result {
        Ok(records) => QueryOutcome::Success {
            records,
            elapsed_seconds,
        },
        Err(failure) => QueryOutcome::Failure {
            error: classify(&failure, task.failure_context()),
            elapsed_seconds,
        },
    }
}

/// Fans query tasks out under a concurrency cap.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Dispatcher {
    ceiling: usize,
}

impl Dispatcher {
    pub(crate) fn new(ceiling: usize) -> Self {
        Self {
            ceiling: ceiling.max(1),
        }
    }

    /// Run every task with at most `max_concurrency` (clamped to
    /// `[1, ceiling]`) in flight. A task never fails the round: resolver
    /// errors and panics both come back as [`QueryOutcome::Failure`].
    pub(crate) async fn run_all(&self, tasks: Vec<QueryTask>, max_concurrency: usize) -> DispatchRound {
        if tasks.is_empty() {
            return DispatchRound {
                outcomes: Vec::new(),
                total_elapsed: 0.0,
            };
        }

        let permits = max_concurrency.clamp(1, self.ceiling).min(tasks.len());
        log::debug!(
            "Dispatching {} DNS queries with concurrency {permits}",
            tasks.len()
        );

        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(permits));

        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let fallback = task.failure_context();
                let semaphore = Arc::clone(&semaphore);
                let handle = tokio::spawn(async move {
                    // never closed
                    let _permit = semaphore.acquire_owned().await.ok();
                    run_task(task).await
                });
                (handle, fallback)
            })
            .collect();

        let outcomes = join_all(handles.into_iter().map(|(handle, fallback)| async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::warn!("DNS query task aborted: {e}");
                    QueryOutcome::Failure {
                        error: classify(
                            &ResolveFailure::new("TaskAborted", "query task did not complete"),
                            fallback,
                        ),
                        elapsed_seconds: 0.0,
                    }
                }
            }
        }))
        .await;

        DispatchRound {
            outcomes,
            total_elapsed: round_to(started.elapsed().as_secs_f64(), 3),
        }
    }
}
