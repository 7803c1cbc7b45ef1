//! CoordinatorHandle - Client interface for worker selection

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::messages::{CoordRequest, PickMode, Setting};
use crate::domain::{Strategy, Topic, WorkerHandle};
use crate::error::{PickError, Selection};
use crate::selector::CoordinatorInfo;

/// Handle for publish paths to ask a Coordinator which worker to use
///
/// This handle is cloneable. The coordinator stops once every handle is dropped.
#[derive(Clone)]
pub struct CoordinatorHandle {
    /// Sender to the Coordinator task
    tx: mpsc::Sender<CoordRequest>,

    /// Topic the coordinator is bound to
    topic: Topic,
}

impl CoordinatorHandle {
    pub(crate) fn new(tx: mpsc::Sender<CoordRequest>, topic: Topic) -> Self {
        debug!(%topic, "CoordinatorHandle::new: called");
        Self { tx, topic }
    }

    /// Topic the coordinator is bound to
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Whether the coordinator task has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Authoritative pick; waits for the lookup service
    pub async fn pick_sync(&self, topic: &Topic) -> Selection {
        debug!(bound = %self.topic, %topic, "CoordinatorHandle::pick_sync: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(CoordRequest::PickSync {
                topic: topic.clone(),
                reply_tx,
            })
            .await
            .map_err(|_| PickError::ChannelClosed)?;

        debug!("CoordinatorHandle::pick_sync: waiting for reply");
        reply_rx.await.map_err(|_| PickError::ChannelClosed)?
    }

    /// Cached pick; `callback` receives the result on the coordinator task
    ///
    /// Returns once the request is queued.
    pub async fn pick_async<F>(&self, topic: &Topic, callback: F) -> Result<(), PickError>
    where
        F: FnOnce(Selection) + Send + 'static,
    {
        debug!(bound = %self.topic, %topic, "CoordinatorHandle::pick_async: called");
        self.tx
            .send(CoordRequest::PickAsync {
                topic: topic.clone(),
                callback: Box::new(callback),
            })
            .await
            .map_err(|_| PickError::ChannelClosed)
    }

    /// Pick in the given mode, delivering the result to `callback`
    ///
    /// In `Sync` mode the callback has run by the time this returns.
    pub async fn pick<F>(&self, topic: &Topic, mode: PickMode, callback: F) -> Result<(), PickError>
    where
        F: FnOnce(Selection) + Send + 'static,
    {
        match mode {
            PickMode::Sync => {
                let result = self.pick_sync(topic).await;
                if let Err(PickError::ChannelClosed) = result {
                    return Err(PickError::ChannelClosed);
                }
                callback(result);
                Ok(())
            }
            PickMode::Async => self.pick_async(topic, callback).await,
        }
    }

    /// Apply a setting and wait until the coordinator has done so
    pub async fn set(&self, setting: Setting) -> Result<(), PickError> {
        debug!(bound = %self.topic, ?setting, "CoordinatorHandle::set: called");
        let (ack_tx, ack_rx) = oneshot::channel();

        self.tx
            .send(CoordRequest::Set {
                setting,
                ack_tx: Some(ack_tx),
            })
            .await
            .map_err(|_| PickError::ChannelClosed)?;

        ack_rx.await.map_err(|_| PickError::ChannelClosed)
    }

    /// Apply a setting without waiting for acknowledgement
    pub async fn notify(&self, setting: Setting) -> Result<(), PickError> {
        debug!(bound = %self.topic, ?setting, "CoordinatorHandle::notify: called");
        self.tx
            .send(CoordRequest::Set { setting, ack_tx: None })
            .await
            .map_err(|_| PickError::ChannelClosed)
    }

    pub async fn set_worker(&self, worker: WorkerHandle) -> Result<(), PickError> {
        self.set(Setting::Worker(worker)).await
    }

    pub async fn set_strategy(&self, strategy: Strategy) -> Result<(), PickError> {
        self.set(Setting::Strategy(strategy)).await
    }

    pub async fn set_max_buffer_size(&self, max: u64) -> Result<(), PickError> {
        self.set(Setting::MaxBufferSize(max)).await
    }

    /// Get a snapshot of the coordinator state
    pub async fn info(&self) -> Result<CoordinatorInfo, PickError> {
        debug!(bound = %self.topic, "CoordinatorHandle::info: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(CoordRequest::Info { reply_tx })
            .await
            .map_err(|_| PickError::ChannelClosed)?;

        reply_rx.await.map_err(|_| PickError::ChannelClosed)
    }

    /// Request shutdown of the Coordinator
    pub async fn shutdown(&self) -> Result<(), PickError> {
        debug!(bound = %self.topic, "CoordinatorHandle::shutdown: called");
        self.tx
            .send(CoordRequest::Shutdown)
            .await
            .map_err(|_| PickError::ChannelClosed)
    }
}
