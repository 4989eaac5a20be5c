//! Concurrent execution of one operation against several endpoints.
//!
//! Every endpoint call runs as its own task in a [`JoinSet`] under an independent
//! timeout. Both completion strategies honor the call context: on cancellation or
//! deadline they abort every task and wait for all of them to finish before
//! returning, so no call outlives the operation that issued it.

use crate::{
    node::{BeaconNode, NodeError, NodeResult},
    upstream::{context::CallContext, endpoint::Endpoint, errors::ClusterError},
};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::task::JoinSet;
use tracing::warn;

type Outcomes<T> = Vec<Option<NodeResult<T>>>;

/// Result of a first-success fan-out.
pub(super) enum FirstSuccess<T> {
    /// `index` is the winning position; `failures` are the lower positions (and any
    /// higher ones that had already failed).
    Won { index: usize, value: T, failures: Vec<(usize, NodeError)> },
    AllFailed(Vec<(usize, NodeError)>),
}

/// Awaits `call`, mapping an elapsed `timeout` to [`NodeError::Timeout`].
pub(super) async fn call_one<T, Fut>(call: Fut, timeout: Duration) -> NodeResult<T>
where
    Fut: Future<Output = NodeResult<T>>,
{
    tokio::time::timeout(timeout, call).await.unwrap_or(Err(NodeError::Timeout))
}

/// Starts `op` against every endpoint. Task outputs carry the endpoint's position.
pub(super) fn spawn_all<T, F, Fut>(
    endpoints: &[Arc<Endpoint>],
    op: &F,
    timeout: Duration,
) -> JoinSet<(usize, NodeResult<T>)>
where
    T: Send + 'static,
    F: Fn(Arc<dyn BeaconNode>) -> Fut,
    Fut: Future<Output = NodeResult<T>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for (index, endpoint) in endpoints.iter().enumerate() {
        let call = op(endpoint.node());
        set.spawn(async move { (index, call_one(call, timeout).await) });
    }
    set
}

fn empty_outcomes<T>(len: usize) -> Outcomes<T> {
    std::iter::repeat_with(|| None).take(len).collect()
}

/// Waits for every task. Positions whose task died without output stay `None`.
pub(super) async fn collect_all<T: Send + 'static>(
    ctx: &CallContext,
    mut set: JoinSet<(usize, NodeResult<T>)>,
    len: usize,
) -> Result<Outcomes<T>, ClusterError> {
    let mut outcomes = empty_outcomes(len);

    loop {
        tokio::select! {
            biased;
            err = ctx.done() => {
                set.shutdown().await;
                return Err(err);
            }
            joined = set.join_next() => match joined {
                Some(Ok((index, result))) => outcomes[index] = Some(result),
                Some(Err(e)) => warn!(error = %e, "endpoint call task failed"),
                None => return Ok(outcomes),
            }
        }
    }
}

/// Waits until the lowest-position success is known, then returns it.
///
/// A success at position `i` is only final once every position below `i` has
/// failed, so the result is the same as trying the endpoints one by one. Tasks
/// still running at that point are aborted and reaped in the background.
pub(super) async fn first_success<T: Send + 'static>(
    ctx: &CallContext,
    mut set: JoinSet<(usize, NodeResult<T>)>,
    len: usize,
) -> Result<FirstSuccess<T>, ClusterError> {
    let mut outcomes = empty_outcomes(len);

    loop {
        if let Some(index) = settled_winner(&outcomes, false) {
            if !set.is_empty() {
                tokio::spawn(async move { set.shutdown().await });
            }
            return Ok(finish(outcomes, Some(index)));
        }

        tokio::select! {
            biased;
            err = ctx.done() => {
                set.shutdown().await;
                return Err(err);
            }
            joined = set.join_next() => match joined {
                Some(Ok((index, result))) => outcomes[index] = Some(result),
                Some(Err(e)) => warn!(error = %e, "endpoint call task failed"),
                None => break,
            }
        }
    }

    let winner = settled_winner(&outcomes, true);
    Ok(finish(outcomes, winner))
}

/// Position of the lowest success if no unfinished position precedes it.
/// With `exhausted`, unfinished positions count as failed.
fn settled_winner<T>(outcomes: &[Option<NodeResult<T>>], exhausted: bool) -> Option<usize> {
    for (index, outcome) in outcomes.iter().enumerate() {
        match outcome {
            Some(Ok(_)) => return Some(index),
            Some(Err(_)) => {}
            None if exhausted => {}
            None => return None,
        }
    }
    None
}

fn finish<T>(outcomes: Outcomes<T>, winner: Option<usize>) -> FirstSuccess<T> {
    let mut won = None;
    let mut failures = Vec::new();

    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Some(Ok(value)) if winner == Some(index) => won = Some((index, value)),
            Some(Err(error)) => failures.push((index, error)),
            _ => {}
        }
    }

    match won {
        Some((index, value)) => FirstSuccess::Won { index, value, failures },
        None => FirstSuccess::AllFailed(failures),
    }
}
