//! Bounded fan-out / fan-in of per-metric queries.
//!
//! A batch of metrics is pushed onto a task queue sized to the whole batch,
//! drained by a fixed pool of workers, and the per-metric outcomes are
//! merged by a single aggregator that races the outcome channel against a
//! deadline.
//!
//! ```text
//!  metrics ──► task queue ──► worker 0 ──┐
//!  (closed     (cap = N)  ├─► worker 1 ──┼──► outcome channel ──► aggregator ──► BatchResult
//!   once fed)             └─► worker W ──┘     (cap = N)              ▲
//!                                                                     │
//!                                                         deadline ───┘
//! ```
//!
//! # Deadline semantics
//!
//! The deadline only bounds how long the aggregator waits. Workers are not
//! cancelled: a query still in flight when the deadline fires runs to
//! completion in the background and its outcome is dropped. Both channels
//! hold the full batch, so a late worker never blocks on a publish. Once
//! the aggregator has returned, workers stop claiming queued metrics, so
//! no new query is started for an abandoned batch.
//!
//! # Duplicate metrics
//!
//! A metric named more than once in a batch is dispatched once (first
//! occurrence wins), so every name has at most one outcome.

mod result;

pub use result::{BatchResult, MetricStatus};

pub(crate) use result::Outcome;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::Result;
use crate::telemetry;
use crate::traits::MetricSource;
use crate::types::{Metric, Query, QueryScope, Telemetry};

/// Number of workers for a batch: `max(1, min(batch_size, max_workers))`.
pub fn worker_count(batch_size: usize, max_workers: usize) -> usize {
    batch_size.min(max_workers).max(1)
}

/// Everything a worker needs to turn a metric into a query.
pub(crate) struct Dispatch {
    pub source: Arc<dyn MetricSource>,
    pub scope: QueryScope,
    pub page_limit: Option<u32>,
}

type TaskQueue = Arc<Mutex<mpsc::Receiver<Metric>>>;

/// Run one query and tag the returned points with the metric name.
pub(crate) async fn fetch(
    source: &dyn MetricSource,
    query: Query,
    metric: &str,
) -> Result<Vec<Telemetry>> {
    query.validate()?;

    let started = Instant::now();
    let result = source.post_query(&query).await;

    let status = if result.is_ok() { "ok" } else { "error" };
    metrics::counter!(telemetry::QUERIES_TOTAL,
        "source" => source.name().to_owned(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::QUERY_DURATION_SECONDS,
        "source" => source.name().to_owned(),
    )
    .record(started.elapsed().as_secs_f64());

    let mut points = result?.data;
    for point in &mut points {
        point.metric = metric.to_owned();
    }
    Ok(points)
}

/// Query every metric concurrently and collect what arrives before `timeout`.
pub(crate) async fn run_batch(
    dispatch: Dispatch,
    metrics: &[Metric],
    max_workers: usize,
    timeout: Duration,
) -> BatchResult {
    let tasks = dedupe(metrics);
    if tasks.is_empty() {
        return BatchResult::default();
    }

    let batch_size = tasks.len();
    let workers = worker_count(batch_size, max_workers);

    let queue: TaskQueue = Arc::new(Mutex::new(feed(tasks)));
    let (outcome_tx, outcome_rx) = mpsc::channel(batch_size);
    let dispatch = Arc::new(dispatch);

    debug!(batch_size, workers, "starting workers");
    for id in 0..workers {
        tokio::spawn(run_worker(
            id,
            dispatch.clone(),
            queue.clone(),
            outcome_tx.clone(),
        ));
    }
    // Only workers hold senders now; the channel closes when the last one exits.
    drop(outcome_tx);

    aggregate(outcome_rx, batch_size, timeout).await
}

fn dedupe(metrics: &[Metric]) -> Vec<Metric> {
    let mut seen = HashSet::with_capacity(metrics.len());
    metrics
        .iter()
        .filter(|m| {
            let first = seen.insert(m.name.as_str());
            if !first {
                warn!(metric = %m.name, "duplicate metric in batch, dispatching once");
            }
            first
        })
        .cloned()
        .collect()
}

/// Enqueue every task and close the queue.
///
/// Capacity equals the batch size, so this never waits on a worker.
fn feed(tasks: Vec<Metric>) -> mpsc::Receiver<Metric> {
    let (tx, rx) = mpsc::channel(tasks.len().max(1));
    for metric in tasks {
        debug!(metric = %metric.name, "queueing metric");
        if let Err(e) = tx.try_send(metric) {
            warn!(error = %e, "task queue rejected metric");
        }
    }
    rx
}

async fn run_worker(
    id: usize,
    dispatch: Arc<Dispatch>,
    queue: TaskQueue,
    outcomes: mpsc::Sender<Outcome>,
) {
    loop {
        // The aggregator has returned; don't start calls nobody will read.
        if outcomes.is_closed() {
            debug!(worker = id, "batch abandoned, leaving remaining tasks");
            break;
        }

        // Hold the lock only long enough to claim one task.
        let next = {
            let mut tasks = queue.lock().await;
            tasks.recv().await
        };
        let Some(metric) = next else {
            break;
        };

        let query = Query::for_metric(&dispatch.scope, &metric, dispatch.page_limit);
        let outcome = match fetch(dispatch.source.as_ref(), query, &metric.name).await {
            Ok(points) => Outcome::Success {
                metric: metric.name,
                points,
            },
            Err(error) => {
                debug!(worker = id, metric = %metric.name, error = %error, "metric query failed");
                Outcome::Failure {
                    metric: metric.name,
                    error,
                }
            }
        };

        match outcomes.try_send(outcome) {
            Ok(()) => {}
            Err(TrySendError::Closed(_)) => {
                debug!(worker = id, "aggregator already returned, dropping outcome");
                break;
            }
            Err(TrySendError::Full(_)) => {
                warn!(worker = id, "outcome channel full, dropping outcome");
            }
        }
    }
    debug!(worker = id, "worker exiting");
}

/// Merge outcomes until all `expected` have arrived or the deadline fires.
///
/// The deadline is polled first, so when it has elapsed it wins over an
/// outcome that is ready at the same moment.
async fn aggregate(
    mut outcomes: mpsc::Receiver<Outcome>,
    expected: usize,
    timeout: Duration,
) -> BatchResult {
    let started = Instant::now();
    let mut result = BatchResult::default();
    let mut received = 0usize;

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let timed_out = loop {
        if received == expected {
            break false;
        }
        tokio::select! {
            biased;
            () = &mut deadline => break true,
            next = outcomes.recv() => match next {
                Some(outcome) => {
                    received += 1;
                    result.merge(outcome);
                }
                // Every worker exited without reporting (a worker panicked).
                None => break false,
            },
        }
    };

    let status = if received == expected {
        "complete"
    } else if timed_out {
        "timed_out"
    } else {
        "incomplete"
    };
    metrics::counter!(telemetry::BATCHES_TOTAL, "status" => status).increment(1);

    let missing = expected - received;
    if missing > 0 {
        metrics::counter!(telemetry::BATCH_INCOMPLETE_TOTAL).increment(missing as u64);
        warn!(
            expected,
            received,
            timed_out,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "returning partial batch"
        );
    } else {
        info!(
            expected,
            succeeded = result.results.len(),
            failed = result.errors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch complete"
        );
    }

    result
}
