//! One pass of the reconciliation timer
//!
//! Each tick makes two independent decisions:
//! 1. whether to force an authoritative pick (per strategy)
//! 2. whether the rotation queue must be replaced by the registry's member list

use std::collections::{HashSet, VecDeque};

use tracing::{debug, info};

use crate::domain::{Strategy, WorkerHandle};
use crate::error::{PickError, Selection};
use crate::pool::PoolServices;

use super::authoritative::pick_authoritative;
use super::state::CoordinatorState;

/// What a reconciliation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Outcome of the forced pick, if one was made
    pub forced_pick: Option<Selection>,
    /// Whether the worker queue membership was replaced
    pub queue_refreshed: bool,
}

/// Whether this tick must re-derive the current worker from the lookup service
pub fn should_force_pick(state: &CoordinatorState) -> bool {
    match state.strategy {
        Strategy::Random | Strategy::StrictRoundRobin => true,
        Strategy::StickyRoundRobin => state.sticky_counter > state.sticky_threshold,
    }
}

/// Replace `queue` with `members` if membership differs
///
/// An empty queue adopts the registry list as-is. Otherwise the queue is kept,
/// rotation position included, unless the two sets differ. Duplicate members
/// are collapsed to their first occurrence.
pub fn refresh_queue(queue: &mut VecDeque<WorkerHandle>, members: Vec<WorkerHandle>) -> bool {
    let mut seen = HashSet::with_capacity(members.len());
    let members: VecDeque<WorkerHandle> = members.into_iter().filter(|m| seen.insert(m.clone())).collect();

    if queue.is_empty() {
        if members.is_empty() {
            return false;
        }
        *queue = members;
        return true;
    }

    let cached: HashSet<&WorkerHandle> = queue.iter().collect();
    let current: HashSet<&WorkerHandle> = members.iter().collect();
    if cached.symmetric_difference(&current).next().is_none() {
        return false;
    }

    *queue = members;
    true
}

/// Run one reconciliation pass against the collaborators
pub async fn reconcile(state: &mut CoordinatorState, services: &PoolServices) -> TickReport {
    let topic = state.topic.clone();
    debug!(%topic, strategy = %state.strategy, sticky_counter = state.sticky_counter, "reconcile: called");

    let mut report = TickReport::default();

    if should_force_pick(state) {
        let result = pick_authoritative(state, services, &topic).await;
        if let Err(PickError::Picking { .. }) = result {
            state.sticky_counter = 0;
        }
        report.forced_pick = Some(result);
    }

    let members = services.registry.members(&topic).await;
    if refresh_queue(&mut state.worker_queue, members) {
        info!(%topic, queue_len = state.worker_queue.len(), "Worker queue refreshed");
        report.queue_refreshed = true;
    }

    report
}
