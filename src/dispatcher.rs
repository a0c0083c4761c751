//! Per-driver request coordination.
//!
//! Each driver has at most one computing request. A newer request either
//! cancels the in-flight one or waits for it, as chosen by the caller.
//! Waiting requests run in submission order. Drivers share only the
//! optimizer, which is read-only.
//!
//! A driver's lane is dropped once it has nothing pending. Terminal request
//! statuses stay queryable until collected with
//! [`RouteDispatcher::take_status`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::budget::{CancellationToken, SearchBudget};
use crate::error::OptimizeError;
use crate::model::{DriverId, Route, RouteStatus, Stop, StopId};
use crate::solver::{OptimizeRequest, RouteOptimizer};
use crate::traits::CostModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Lifecycle of one optimization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    Requested,
    Computing,
    Completed,
    Infeasible,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot move request from {from:?} to {to:?}")]
pub struct TransitionError {
    pub from: RequestStatus,
    pub to: RequestStatus,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Requested | RequestStatus::Computing)
    }

    pub fn transition(self, to: RequestStatus) -> Result<RequestStatus, TransitionError> {
        use RequestStatus::*;
        match (self, to) {
            (Requested, Computing)
            | (Requested, Cancelled)
            | (Computing, Completed | Infeasible | Failed | Cancelled) => Ok(to),
            _ => Err(TransitionError { from: self, to }),
        }
    }

    fn for_result(result: &Result<Route, OptimizeError>) -> RequestStatus {
        match result {
            Ok(route) => match route.status() {
                RouteStatus::Completed => RequestStatus::Completed,
                RouteStatus::Infeasible => RequestStatus::Infeasible,
                RouteStatus::Cancelled => RequestStatus::Cancelled,
            },
            Err(OptimizeError::Cancelled) => RequestStatus::Cancelled,
            Err(_) => RequestStatus::Failed,
        }
    }
}

/// What to do when a driver already has a request computing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyPolicy {
    /// Cancel the in-flight request; it returns its best tour so far.
    #[default]
    CancelPrevious,
    /// Wait until the in-flight request finishes.
    Queue,
}

#[derive(Debug, Default)]
struct TurnState {
    issued: u64,
    serving: u64,
}

/// Ticket gate: holders run one at a time, in the order tickets were issued.
#[derive(Debug, Default)]
struct Turnstile {
    state: Mutex<TurnState>,
    ready: Condvar,
}

impl Turnstile {
    fn issue(&self) -> u64 {
        let mut state = lock(&self.state);
        let ticket = state.issued;
        state.issued += 1;
        ticket
    }

    /// Block until `ticket` is served. Every issued ticket must be waited
    /// for, or later tickets never run.
    fn wait_for(&self, ticket: u64) -> Turn<'_> {
        let mut state = lock(&self.state);
        while state.serving != ticket {
            state = self.ready.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        Turn { turnstile: self }
    }
}

/// Passes the turnstile to the next ticket when dropped.
struct Turn<'a> {
    turnstile: &'a Turnstile,
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        lock(&self.turnstile.state).serving += 1;
        self.turnstile.ready.notify_all();
    }
}

#[derive(Debug, Default)]
struct DriverLane {
    turnstile: Arc<Turnstile>,
    /// Requests submitted and not yet finished, oldest first.
    pending: Vec<(RequestId, CancellationToken)>,
}

/// A registered request waiting for its turn.
struct Submission {
    id: RequestId,
    token: CancellationToken,
    ticket: u64,
    turnstile: Arc<Turnstile>,
}

#[derive(Debug)]
pub struct RouteDispatcher<C> {
    optimizer: Arc<RouteOptimizer<C>>,
    lanes: Mutex<HashMap<DriverId, DriverLane>>,
    statuses: Mutex<HashMap<RequestId, RequestStatus>>,
    next_id: AtomicU64,
}

impl<C: CostModel> RouteDispatcher<C> {
    pub fn new(optimizer: Arc<RouteOptimizer<C>>) -> Self {
        Self {
            optimizer,
            lanes: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn optimizer(&self) -> &RouteOptimizer<C> {
        &self.optimizer
    }

    pub fn status(&self, id: RequestId) -> Option<RequestStatus> {
        lock(&self.statuses).get(&id).copied()
    }

    /// Remove and return the status of a finished request.
    ///
    /// Requests still waiting or computing are left in place and yield `None`.
    pub fn take_status(&self, id: RequestId) -> Option<RequestStatus> {
        let mut statuses = lock(&self.statuses);
        match statuses.get(&id) {
            Some(status) if status.is_terminal() => statuses.remove(&id),
            _ => None,
        }
    }

    /// Unfinished requests for `driver`, in submission order.
    pub fn pending(&self, driver: &DriverId) -> Vec<RequestId> {
        lock(&self.lanes)
            .get(driver)
            .map(|lane| lane.pending.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }

    /// Drivers with at least one unfinished request.
    pub fn tracked_drivers(&self) -> usize {
        lock(&self.lanes).len()
    }

    /// Requests for `driver` currently in the `Computing` state.
    pub fn computing(&self, driver: &DriverId) -> Vec<RequestId> {
        let statuses = lock(&self.statuses);
        lock(&self.lanes)
            .get(driver)
            .map(|lane| {
                lane.pending
                    .iter()
                    .map(|(id, _)| *id)
                    .filter(|id| statuses.get(id) == Some(&RequestStatus::Computing))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Register a request, applying `policy` to the driver's pending ones.
    fn submit(&self, driver: &DriverId, policy: ConcurrencyPolicy) -> Submission {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();
        lock(&self.statuses).insert(id, RequestStatus::Requested);

        let mut lanes = lock(&self.lanes);
        let lane = lanes.entry(driver.clone()).or_default();
        if policy == ConcurrencyPolicy::CancelPrevious {
            for (previous, previous_token) in &lane.pending {
                tracing::info!(driver = %driver, request = previous.0, "cancelling superseded request");
                previous_token.cancel();
            }
        }
        // Issued under the lanes lock so ticket order matches `pending`.
        let ticket = lane.turnstile.issue();
        lane.pending.push((id, token.clone()));
        tracing::debug!(driver = %driver, request = id.0, ticket, queued = lane.pending.len() - 1, "request submitted");
        Submission {
            id,
            token,
            ticket,
            turnstile: lane.turnstile.clone(),
        }
    }

    /// Submit and run an optimization on the calling thread.
    #[tracing::instrument(skip_all, fields(driver = %request.driver.driver_id, policy = ?policy))]
    pub fn optimize(&self, request: &OptimizeRequest, policy: ConcurrencyPolicy) -> (RequestId, Result<Route, OptimizeError>) {
        let driver = request.driver.driver_id.clone();
        let submission = self.submit(&driver, policy);
        let id = submission.id;
        let result = self.run(submission, &driver, |budget| self.optimizer.optimize(request, budget));
        (id, result)
    }

    /// Re-optimize `current` under the same per-driver rules as [`Self::optimize`].
    pub fn reoptimize(
        &self,
        current: &Route,
        added: &[Stop],
        removed: &[StopId],
        time_budget: Option<Duration>,
        policy: ConcurrencyPolicy,
    ) -> (RequestId, Result<Route, OptimizeError>) {
        let driver = current.driver_id().clone();
        let submission = self.submit(&driver, policy);
        let id = submission.id;
        let result = self.run(submission, &driver, |budget| {
            let budget = budget.clone().limited_to(time_budget);
            self.optimizer.reoptimize(current, added, removed, &budget)
        });
        (id, result)
    }

    fn run(
        &self,
        submission: Submission,
        driver: &DriverId,
        work: impl FnOnce(&SearchBudget) -> Result<Route, OptimizeError>,
    ) -> Result<Route, OptimizeError> {
        let Submission {
            id,
            token,
            ticket,
            turnstile,
        } = submission;

        let result = {
            let _turn = turnstile.wait_for(ticket);
            if token.is_cancelled() {
                // Superseded while waiting; never started computing.
                self.set_status(id, RequestStatus::Cancelled);
                Err(OptimizeError::Cancelled)
            } else {
                self.set_status(id, RequestStatus::Computing);
                let budget = SearchBudget::unlimited().with_token(token.clone());
                let result = work(&budget);
                self.set_status(id, RequestStatus::for_result(&result));
                result
            }
        };

        // The turn is released before the lane can be dropped, so a fresh
        // lane for this driver never overlaps a running request.
        let mut lanes = lock(&self.lanes);
        if let Some(lane) = lanes.get_mut(driver) {
            lane.pending.retain(|(pending, _)| *pending != id);
            if lane.pending.is_empty() {
                lanes.remove(driver);
            }
        }
        result
    }

    fn set_status(&self, id: RequestId, next: RequestStatus) {
        let mut statuses = lock(&self.statuses);
        let current = statuses.get(&id).copied().unwrap_or(RequestStatus::Requested);
        match current.transition(next) {
            Ok(status) => {
                statuses.insert(id, status);
            }
            Err(err) => tracing::warn!(request = id.0, %err, "ignoring invalid status change"),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
