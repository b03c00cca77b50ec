//! Single-query event loop
//!
//! Alternates reduction passes with local execution: every pass may queue
//! new invocations, which are spawned on the worker pool; the loop then
//! sleeps until at least one finishes, records every completion that has
//! arrived, and runs the next pass. The first failed invocation aborts the
//! query and cancels everything it still has running.

use super::Completion;
use crate::application::Application;
use crate::driver::{Query, QueryError, QueryFailure, QueryOutcome};
use crate::reducer::types::Compound;
use crate::workflows::WorkflowDocument;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Reduce `document` to completion, executing foreign calls locally
pub async fn run_query(
    app: &Application,
    document: &WorkflowDocument,
) -> Result<Vec<Compound>, QueryFailure> {
    let mut query = Query::new(document.definitions.clone(), document.targets.clone());
    let id = query.id();
    let options = app.pass_options();
    let registry = Arc::clone(app.registry());
    let fin = Arc::clone(app.fin());

    // Dropping the guard kills whatever this query still has running
    let cancel = app.worker().shutdown_token().child_token();
    let _guard = cancel.clone().drop_guard();
    let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
    let mut running = 0usize;

    info!(query = %id, targets = query.targets().len(), "query started");

    loop {
        // Snapshot dropped before any insert so the store never copies its map
        let stepped = {
            let snapshot = fin.snapshot();
            query.step(&snapshot, registry.as_ref(), &options)
        };
        match stepped {
            Ok(QueryOutcome::Done(targets)) => {
                info!(query = %id, passes = query.passes(), "query completed");
                registry.forget(id);
                return Ok(targets);
            }
            Ok(QueryOutcome::Waiting) => {}
            Err(error) => return Err(abort(app, &query, error)),
        }

        for invocation in registry.drain_outbox(id) {
            debug!(query = %id, ticket = %invocation.ticket, "spawning invocation");
            app.worker().spawn(invocation, cancel.clone(), tx.clone());
            running += 1;
        }

        if running == 0 {
            let outstanding = registry.outstanding(id);
            return Err(abort(app, &query, QueryError::Stalled { outstanding }));
        }

        let Some(first) = rx.recv().await else {
            let outstanding = registry.outstanding(id);
            return Err(abort(app, &query, QueryError::Stalled { outstanding }));
        };
        let mut batch = vec![first];
        while let Ok(completion) = rx.try_recv() {
            batch.push(completion);
        }

        for completion in batch {
            running -= 1;
            match completion.result {
                Ok(outputs) => {
                    // Record before resolving so the next pass sees the value
                    if let Err(e) = fin.insert(completion.ticket, outputs) {
                        warn!(ticket = %completion.ticket, error = %e, "completion not recorded");
                    }
                    registry.resolve(completion.ticket);
                }
                Err(e) => {
                    let error = QueryError::Invocation {
                        ticket: completion.ticket,
                        message: e.to_string(),
                    };
                    return Err(abort(app, &query, error));
                }
            }
        }
    }
}

fn abort(app: &Application, query: &Query, error: QueryError) -> QueryFailure {
    warn!(query = %query.id(), kind = error.kind(), %error, "query failed");
    app.registry().forget(query.id());
    query.failure(error)
}

#[cfg(test)]
#[path = "tests/runner_tests.rs"]
mod tests;
