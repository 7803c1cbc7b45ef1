//! Authoritative selection through the lookup service

use tracing::{debug, warn};

use crate::domain::{Resolution, Topic};
use crate::error::{PickError, Selection};
use crate::pool::PoolServices;

use super::state::CoordinatorState;

/// Ask the lookup service for a worker for `topic` and fold the answer into `state`
///
/// - `NotRegistered`: tally it, trigger bootstrap, return `Picking`
/// - `Selected`: adopt the worker (resetting the sticky counter)
/// - anything else: `Bootstrapping`, no state change
///
/// This is the only place `current_worker` is replaced from lookup results.
pub async fn pick_authoritative(state: &mut CoordinatorState, services: &PoolServices, topic: &Topic) -> Selection {
    debug!(%topic, strategy = %state.strategy, "pick_authoritative: called");

    match services.lookup.resolve(topic, state.strategy).await {
        Resolution::Selected(worker) => {
            debug!(%topic, %worker, "pick_authoritative: selected");
            state.adopt(worker.clone());
            Ok(worker)
        }
        Resolution::NotRegistered => {
            let tally = state.tally_not_registered(topic);
            warn!(%topic, %tally, "No worker pool registered, triggering bootstrap");
            services.bootstrap.provision(topic);
            Err(PickError::Picking {
                topic: topic.to_string(),
            })
        }
        Resolution::NotReady => {
            debug!(%topic, "pick_authoritative: pool not ready");
            Err(PickError::Bootstrapping {
                topic: topic.to_string(),
            })
        }
    }
}
