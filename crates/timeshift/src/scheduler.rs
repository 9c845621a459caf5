// Batch fan-out: one task per program, joined structurally so the caller
// blocks until every program reaches a terminal outcome.

use crate::orchestrator::{Orchestrator, RetrievalOutcome};
use crate::program::{Program, ProgramId};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Fans a collection of programs into concurrent retrievals.
///
/// The number of concurrently orchestrated programs is deliberately
/// unbounded; resolving and listing are cheap, and segment transfer is
/// already capped by the orchestrator's shared download semaphore.
pub struct BatchScheduler {
    orchestrator: Arc<Orchestrator>,
}

impl BatchScheduler {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Retrieve every program, judged against the current instant.
    pub async fn run(
        &self,
        programs: Vec<Program>,
        token: &CancellationToken,
    ) -> Vec<(ProgramId, RetrievalOutcome)> {
        let now = Utc::now().with_timezone(&self.orchestrator.config().time_zone);
        self.run_at(programs, now, token).await
    }

    /// Retrieve every program against a fixed `now`, returning once all of
    /// them have reached a terminal state. A panicked retrieval is logged
    /// and never aborts the rest of the batch.
    pub async fn run_at(
        &self,
        programs: Vec<Program>,
        now: DateTime<Tz>,
        token: &CancellationToken,
    ) -> Vec<(ProgramId, RetrievalOutcome)> {
        let mut tasks = JoinSet::new();
        for program in programs {
            let orchestrator = Arc::clone(&self.orchestrator);
            let token = token.clone();
            tasks.spawn(async move {
                let id = program.id();
                let outcome = orchestrator.retrieve(&program, now, &token).await;
                (id, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(pair) => outcomes.push(pair),
                Err(e) => {
                    error!(error = %e, "program retrieval task panicked");
                }
            }
        }
        outcomes
    }
}
