//! TopicRouter - one coordinator per topic
//!
//! Coordinators are spawned lazily on first reference, configured from the
//! topic's settings. `Topic::Any` maps to a single catch-all coordinator for
//! unscoped lookups.

use std::collections::HashMap;

use eyre::Result;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::coordinator::{Coordinator, CoordinatorHandle};
use crate::domain::Topic;
use crate::error::{PickError, Selection};
use crate::pool::PoolServices;

/// Owns the coordinator handles for every topic seen so far
pub struct TopicRouter {
    config: Config,
    services: PoolServices,
    coordinators: HashMap<Topic, CoordinatorHandle>,
}

impl TopicRouter {
    pub fn new(config: Config, services: PoolServices) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            services,
            coordinators: HashMap::new(),
        })
    }

    /// Coordinator for `topic`, spawning it if needed
    ///
    /// A coordinator that has stopped is replaced by a fresh one.
    pub fn handle_for(&mut self, topic: &Topic) -> Result<CoordinatorHandle> {
        if let Some(handle) = self.coordinators.get(topic) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
            info!(%topic, "Coordinator stopped, respawning");
        }

        debug!(%topic, "handle_for: spawning coordinator");
        let settings = self.config.topic_settings(topic);
        let handle = Coordinator::spawn(
            topic.clone(),
            settings,
            self.services.clone(),
            self.config.coordinator.clone(),
        )?;
        self.coordinators.insert(topic.clone(), handle.clone());
        Ok(handle)
    }

    /// Authoritative pick through the topic's coordinator
    ///
    /// Retries once on a fresh coordinator if the current one stops mid-request.
    pub async fn pick_sync(&mut self, topic: &Topic) -> Result<Selection> {
        let handle = self.handle_for(topic)?;
        match handle.pick_sync(topic).await {
            Err(PickError::ChannelClosed) => {
                warn!(%topic, "Coordinator closed during pick, retrying");
                self.coordinators.remove(topic);
                let handle = self.handle_for(topic)?;
                Ok(handle.pick_sync(topic).await)
            }
            result => Ok(result),
        }
    }

    /// Topics with a running coordinator
    pub fn topics(&self) -> Vec<Topic> {
        self.coordinators.keys().cloned().collect()
    }

    /// Stop every coordinator
    pub async fn shutdown_all(&mut self) {
        info!(count = self.coordinators.len(), "Shutting down coordinators");
        for (topic, handle) in self.coordinators.drain() {
            if let Err(e) = handle.shutdown().await {
                warn!(%topic, error = %e, "Coordinator already stopped");
            }
        }
    }
}
