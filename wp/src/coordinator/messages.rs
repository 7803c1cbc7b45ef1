//! Message types for the Coordinator

use std::fmt;

use tokio::sync::oneshot;
use tracing::debug;

use crate::domain::{Strategy, Topic, WorkerHandle};
use crate::error::{PickError, Selection};
use crate::selector::CoordinatorInfo;

/// Receives the result of an asynchronous pick
///
/// Runs on the coordinator task, so it should hand the result off quickly.
/// A panic inside the callback is caught and logged; the coordinator keeps running.
pub type PickCallback = Box<dyn FnOnce(Selection) + Send + 'static>;

/// How a pick is served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickMode {
    /// Always authoritative; the caller waits for the lookup service
    Sync,
    /// Served from cached state when possible, result delivered to the callback
    Async,
}

/// Runtime configuration change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    /// Assign the first worker; ignored once a worker is assigned
    Worker(WorkerHandle),
    Strategy(Strategy),
    /// Sticky threshold
    MaxBufferSize(u64),
    /// Any other key; acknowledged and ignored
    Unrecognized { key: String },
}

impl Setting {
    /// Build a setting from a key/value pair
    pub fn from_key_value(key: &str, value: &str) -> Result<Self, PickError> {
        debug!(%key, %value, "Setting::from_key_value: called");
        match key {
            "worker" => Ok(Setting::Worker(WorkerHandle::new(value))),
            "strategy" => Ok(Setting::Strategy(Strategy::parse_lenient(value))),
            "max_buffer_size" => value
                .trim()
                .parse()
                .map(Setting::MaxBufferSize)
                .map_err(|_| PickError::Malformed(format!("max_buffer_size must be an integer, got '{}'", value))),
            other => Ok(Setting::Unrecognized { key: other.to_string() }),
        }
    }
}

/// Internal requests to the Coordinator task
pub enum CoordRequest {
    /// Authoritative pick; reply goes straight back to the caller
    PickSync {
        topic: Topic,
        reply_tx: oneshot::Sender<Selection>,
    },

    /// Cached pick, result delivered through the callback
    PickAsync { topic: Topic, callback: PickCallback },

    /// Apply a setting; `ack_tx` is signalled once applied
    Set {
        setting: Setting,
        ack_tx: Option<oneshot::Sender<()>>,
    },

    /// Get a diagnostics snapshot
    Info {
        reply_tx: oneshot::Sender<CoordinatorInfo>,
    },

    /// Shutdown the coordinator
    Shutdown,
}

impl fmt::Debug for CoordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordRequest::PickSync { topic, .. } => f.debug_struct("PickSync").field("topic", topic).finish(),
            CoordRequest::PickAsync { topic, .. } => f.debug_struct("PickAsync").field("topic", topic).finish(),
            CoordRequest::Set { setting, ack_tx } => f
                .debug_struct("Set")
                .field("setting", setting)
                .field("acked", &ack_tx.is_some())
                .finish(),
            CoordRequest::Info { .. } => f.write_str("Info"),
            CoordRequest::Shutdown => f.write_str("Shutdown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setting_from_key_value() {
        assert_eq!(
            Setting::from_key_value("worker", "w1").unwrap(),
            Setting::Worker(WorkerHandle::new("w1"))
        );
        assert_eq!(
            Setting::from_key_value("strategy", "strict_round_robin").unwrap(),
            Setting::Strategy(Strategy::StrictRoundRobin)
        );
        assert_eq!(
            Setting::from_key_value("max_buffer_size", " 42 ").unwrap(),
            Setting::MaxBufferSize(42)
        );
        assert_eq!(
            Setting::from_key_value("linger_ms", "5").unwrap(),
            Setting::Unrecognized {
                key: "linger_ms".to_string()
            }
        );
    }

    #[test]
    fn test_setting_bad_value_is_malformed() {
        let err = Setting::from_key_value("max_buffer_size", "lots").unwrap_err();
        assert!(matches!(err, PickError::Malformed(_)));
    }

    #[test]
    fn test_request_debug_hides_channels() {
        let (reply_tx, _reply_rx) = oneshot::channel();
        let req = CoordRequest::PickSync {
            topic: Topic::named("t"),
            reply_tx,
        };
        assert!(format!("{:?}", req).contains("PickSync"));
    }
}
