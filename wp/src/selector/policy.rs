//! Cached selection: answer from known workers without a lookup

use crate::domain::{Strategy, WorkerHandle};

use super::state::CoordinatorState;

/// Choose a worker from cached state, updating rotation and counters
///
/// Returns `None` when the cache cannot answer: no worker assigned yet, or
/// `strict_round_robin` with an empty queue. Callers fall back to the
/// authoritative path in that case.
pub fn select_cached(state: &mut CoordinatorState) -> Option<WorkerHandle> {
    match state.strategy {
        Strategy::StrictRoundRobin => {
            let head = state.worker_queue.pop_front()?;
            state.worker_queue.push_back(head.clone());
            Some(head)
        }
        Strategy::StickyRoundRobin => {
            let worker = state.current_worker()?.clone();
            state.sticky_counter += 1;
            Some(worker)
        }
        // No serialization between callers: publish order may differ from request order
        Strategy::Random => state.current_worker().cloned(),
    }
}
