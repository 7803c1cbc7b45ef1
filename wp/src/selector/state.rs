//! Per-topic coordinator state

use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use tracing::info;

use crate::domain::{Assignment, Strategy, Topic, WorkerHandle};

/// Everything a coordinator knows about its topic
///
/// Owned exclusively by one coordinator task and never persisted.
#[derive(Debug, Clone)]
pub struct CoordinatorState {
    pub topic: Topic,
    pub strategy: Strategy,
    pub assignment: Assignment,
    /// Rotation order for `strict_round_robin`; head is served next
    pub worker_queue: VecDeque<WorkerHandle>,
    /// Selections served since the current worker was chosen
    pub sticky_counter: u64,
    /// Configured as `max_buffer_size`
    pub sticky_threshold: u64,
    /// Consecutive "pool not registered" outcomes per topic name
    pub error_tally: HashMap<String, u64>,
}

impl CoordinatorState {
    pub fn new(topic: Topic, strategy: Strategy, sticky_threshold: u64) -> Self {
        Self {
            topic,
            strategy,
            assignment: Assignment::Unassigned,
            worker_queue: VecDeque::new(),
            sticky_counter: 0,
            sticky_threshold,
            error_tally: HashMap::new(),
        }
    }

    pub fn current_worker(&self) -> Option<&WorkerHandle> {
        self.assignment.worker()
    }

    /// Adopt `worker` as the current worker, resetting the sticky counter
    ///
    /// Returns true if the worker changed.
    pub fn adopt(&mut self, worker: WorkerHandle) -> bool {
        self.sticky_counter = 0;
        if self.assignment.worker() == Some(&worker) {
            return false;
        }
        info!(topic = %self.topic, %worker, "Adopted worker");
        self.assignment = Assignment::Assigned(worker);
        true
    }

    /// Explicit external assignment; only takes effect while unassigned
    pub fn assign_if_unset(&mut self, worker: WorkerHandle) -> bool {
        if self.assignment.is_assigned() {
            return false;
        }
        self.adopt(worker)
    }

    pub fn tally_not_registered(&mut self, topic: &Topic) -> u64 {
        let count = self.error_tally.entry(topic.as_str().to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

/// Counters for observability
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoordinatorMetrics {
    pub fast_picks: u64,
    pub authoritative_picks: u64,
    pub picking_errors: u64,
    pub bootstrapping_errors: u64,
    pub malformed_requests: u64,
    pub ticks: u64,
    pub queue_refreshes: u64,
}

/// Diagnostics snapshot returned by the `info` query
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorInfo {
    pub topic: String,
    pub strategy: Strategy,
    #[serde(rename = "current-worker")]
    pub current_worker: Option<WorkerHandle>,
    #[serde(rename = "worker-queue")]
    pub worker_queue: Vec<WorkerHandle>,
    #[serde(rename = "sticky-counter")]
    pub sticky_counter: u64,
    #[serde(rename = "max-buffer-size")]
    pub sticky_threshold: u64,
    #[serde(rename = "error-tally")]
    pub error_tally: HashMap<String, u64>,
    #[serde(rename = "timer-armed")]
    pub timer_armed: bool,
    pub metrics: CoordinatorMetrics,
}

impl CoordinatorInfo {
    pub fn snapshot(state: &CoordinatorState, timer_armed: bool, metrics: &CoordinatorMetrics) -> Self {
        Self {
            topic: state.topic.to_string(),
            strategy: state.strategy,
            current_worker: state.current_worker().cloned(),
            worker_queue: state.worker_queue.iter().cloned().collect(),
            sticky_counter: state.sticky_counter,
            sticky_threshold: state.sticky_threshold,
            error_tally: state.error_tally.clone(),
            timer_armed,
            metrics: metrics.clone(),
        }
    }
}
