//! Main Coordinator task implementation

use std::panic::{AssertUnwindSafe, catch_unwind};

use eyre::{Context, Result};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::CoordinatorConfig;
use super::handle::CoordinatorHandle;
use super::messages::{CoordRequest, PickCallback, Setting};
use crate::config::TopicSettings;
use crate::domain::Topic;
use crate::error::{PickError, Selection};
use crate::pool::PoolServices;
use crate::selector::{
    CoordinatorInfo, CoordinatorMetrics, CoordinatorState, pick_authoritative, reconcile, select_cached,
};

/// Selects workers for one topic
///
/// All state lives in the coordinator task and is only touched between
/// messages, so callers never need locks. Multiple topics run as independent
/// tasks.
pub struct Coordinator {
    config: CoordinatorConfig,
    tx: mpsc::Sender<CoordRequest>,
    rx: mpsc::Receiver<CoordRequest>,
    state: CoordinatorState,
    services: PoolServices,
}

impl Coordinator {
    /// Create a new Coordinator for `topic`
    ///
    /// Fails if the configuration cannot be used to start a coordinator.
    pub fn new(
        topic: Topic,
        settings: TopicSettings,
        services: PoolServices,
        config: CoordinatorConfig,
    ) -> Result<Self> {
        config
            .validate()
            .context(format!("Invalid coordinator config for topic {}", topic))?;

        let (tx, rx) = mpsc::channel(config.channel_buffer);
        Ok(Self {
            state: CoordinatorState::new(topic, settings.strategy, settings.max_buffer_size),
            config,
            tx,
            rx,
            services,
        })
    }

    /// Create a Coordinator and run it on a new task
    pub fn spawn(
        topic: Topic,
        settings: TopicSettings,
        services: PoolServices,
        config: CoordinatorConfig,
    ) -> Result<CoordinatorHandle> {
        let coordinator = Self::new(topic, settings, services, config)?;
        let handle = coordinator.handle();
        tokio::spawn(coordinator.run());
        Ok(handle)
    }

    /// Get a sender for creating handles
    pub fn sender(&self) -> mpsc::Sender<CoordRequest> {
        self.tx.clone()
    }

    /// Create a handle bound to this coordinator's topic
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle::new(self.tx.clone(), self.state.topic.clone())
    }

    /// Run the Coordinator task
    ///
    /// This consumes the Coordinator and runs until shutdown is requested or
    /// every handle has been dropped.
    pub async fn run(self) {
        let Self {
            config,
            tx,
            rx,
            state,
            services,
        } = self;
        // Only handles keep the channel open from here on
        drop(tx);

        let mut actor = Actor {
            config,
            rx,
            state,
            services,
            metrics: CoordinatorMetrics::default(),
            next_tick: None,
        };

        info!(
            topic = %actor.state.topic,
            strategy = %actor.state.strategy,
            max_buffer_size = actor.state.sticky_threshold,
            "Coordinator started"
        );

        actor.run().await;

        info!(topic = %actor.state.topic, "Coordinator stopped");
    }
}

/// The running coordinator; owns the state exclusively
struct Actor {
    config: CoordinatorConfig,
    rx: mpsc::Receiver<CoordRequest>,
    state: CoordinatorState,
    services: PoolServices,
    metrics: CoordinatorMetrics,
    /// Next reconciliation deadline; `None` until the first worker is assigned
    next_tick: Option<Instant>,
}

impl Actor {
    async fn run(&mut self) {
        loop {
            let req = match self.next_tick {
                Some(deadline) => {
                    tokio::select! {
                        req = self.rx.recv() => req,
                        _ = tokio::time::sleep_until(deadline) => {
                            self.on_tick().await;
                            continue;
                        }
                    }
                }
                None => self.rx.recv().await,
            };

            let Some(req) = req else {
                debug!(topic = %self.state.topic, "All handles dropped");
                break;
            };

            if !self.handle_request(req).await {
                info!(topic = %self.state.topic, "Coordinator shutting down");
                break;
            }
        }
    }

    /// Returns false when the coordinator should stop
    async fn handle_request(&mut self, req: CoordRequest) -> bool {
        match req {
            CoordRequest::PickSync { topic, reply_tx } => {
                let result = self.pick_sync(&topic).await;
                let _ = reply_tx.send(result);
            }

            CoordRequest::PickAsync { topic, callback } => {
                self.pick_async(&topic, callback).await;
            }

            CoordRequest::Set { setting, ack_tx } => {
                self.apply(setting);
                if let Some(ack_tx) = ack_tx {
                    let _ = ack_tx.send(());
                }
            }

            CoordRequest::Info { reply_tx } => {
                let _ = reply_tx.send(CoordinatorInfo::snapshot(
                    &self.state,
                    self.next_tick.is_some(),
                    &self.metrics,
                ));
            }

            CoordRequest::Shutdown => return false,
        }
        true
    }

    async fn pick_sync(&mut self, topic: &Topic) -> Selection {
        debug!(%topic, "pick_sync: called");
        self.check_topic(topic)?;
        self.authoritative(topic).await
    }

    async fn pick_async(&mut self, topic: &Topic, callback: PickCallback) {
        debug!(%topic, "pick_async: called");
        if let Err(e) = self.check_topic(topic) {
            deliver(topic, callback, Err(e));
            return;
        }

        // The catch-all serves many topics from one slot, so its cache is never trusted
        let cached = match self.state.topic {
            Topic::Any => None,
            Topic::Named(_) => select_cached(&mut self.state),
        };

        match cached {
            Some(worker) => {
                self.metrics.fast_picks += 1;
                deliver(topic, callback, Ok(worker));
            }
            None => {
                debug!(%topic, strategy = %self.state.strategy, "pick_async: no cached worker");
                let result = self.authoritative(topic).await;
                deliver(topic, callback, result);
            }
        }
    }

    async fn authoritative(&mut self, topic: &Topic) -> Selection {
        self.metrics.authoritative_picks += 1;
        let result = pick_authoritative(&mut self.state, &self.services, topic).await;
        self.record_outcome(&result);
        self.arm_timer_if_assigned();
        result
    }

    fn check_topic(&mut self, topic: &Topic) -> Result<(), PickError> {
        let reason = match topic {
            Topic::Named(name) if name.is_empty() => Some("empty topic name".to_string()),
            _ if !self.state.topic.accepts(topic) => Some(format!(
                "pick for topic {} sent to coordinator for {}",
                topic, self.state.topic
            )),
            _ => None,
        };

        match reason {
            Some(reason) => {
                warn!(%topic, %reason, "Rejecting malformed pick request");
                self.metrics.malformed_requests += 1;
                Err(PickError::Malformed(reason))
            }
            None => Ok(()),
        }
    }

    fn apply(&mut self, setting: Setting) {
        debug!(topic = %self.state.topic, ?setting, "apply: called");
        match setting {
            Setting::Worker(worker) => {
                if self.state.assign_if_unset(worker.clone()) {
                    self.arm_timer_if_assigned();
                } else {
                    debug!(topic = %self.state.topic, %worker, "Worker already assigned, ignoring");
                }
            }
            Setting::Strategy(strategy) => {
                self.state.strategy = strategy;
            }
            Setting::MaxBufferSize(max) => {
                self.state.sticky_threshold = max;
            }
            Setting::Unrecognized { key } => {
                debug!(topic = %self.state.topic, %key, "Ignoring unrecognized setting");
            }
        }
    }

    async fn on_tick(&mut self) {
        self.metrics.ticks += 1;
        let report = reconcile(&mut self.state, &self.services).await;

        if let Some(result) = &report.forced_pick {
            self.metrics.authoritative_picks += 1;
            self.record_outcome(result);
        }
        if report.queue_refreshed {
            self.metrics.queue_refreshes += 1;
        }

        // Re-arm after the pass completes; drift under load is fine
        self.next_tick = Some(Instant::now() + self.config.tick_interval());
    }

    /// The catch-all coordinator has no pool of its own and never reconciles
    fn arm_timer_if_assigned(&mut self) {
        if self.next_tick.is_none() && self.state.assignment.is_assigned() && self.state.topic != Topic::Any {
            debug!(topic = %self.state.topic, "Arming reconciliation timer");
            self.next_tick = Some(Instant::now() + self.config.tick_interval());
        }
    }

    fn record_outcome(&mut self, result: &Selection) {
        match result {
            Err(PickError::Picking { .. }) => self.metrics.picking_errors += 1,
            Err(PickError::Bootstrapping { .. }) => self.metrics.bootstrapping_errors += 1,
            _ => {}
        }
    }
}

/// Run a caller's callback; a panic inside it is logged, not propagated
fn deliver(topic: &Topic, callback: PickCallback, result: Selection) {
    if catch_unwind(AssertUnwindSafe(|| callback(result))).is_err() {
        warn!(%topic, "Pick callback panicked");
    }
}
