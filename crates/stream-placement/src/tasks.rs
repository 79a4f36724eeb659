//! Background tasks: membership feed watcher and periodic reseed.

use crate::domain::{PlacementError, RegistryError};
use crate::ports::outbound::{NodeRegistry, OnChainConfig, RegistryEventStream};
use crate::service::StreamsDistributor;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

/// Handles of the distributor's background tasks. Dropping aborts them.
#[derive(Default)]
pub struct DistributorTasks {
    handles: Vec<JoinHandle<()>>,
}

impl DistributorTasks {
    /// Number of running tasks.
    pub fn len(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Check if no task is running.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abort all tasks.
    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }

    fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }
}

impl Drop for DistributorTasks {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Create a distributor, subscribe to the registry feed, bootstrap, and spawn
/// the background tasks the configuration asks for.
///
/// The feed is subscribed before the bootstrap load so no event between the
/// two is lost.
pub async fn start<R, C>(
    distributor: StreamsDistributor<R, C>,
) -> Result<(Arc<StreamsDistributor<R, C>>, DistributorTasks), PlacementError>
where
    R: NodeRegistry + 'static,
    C: OnChainConfig + 'static,
{
    let distributor = Arc::new(distributor);
    let feed = distributor.registry().subscribe();

    distributor.bootstrap().await?;

    let mut tasks = DistributorTasks::default();
    tasks.push(spawn_membership_watcher(Arc::clone(&distributor), feed));
    if let Some(period) = distributor.config().reseed_interval() {
        tasks.push(spawn_periodic_reseed(Arc::clone(&distributor), period));
    }

    info!(tasks = tasks.len(), "Stream distributor started");
    Ok((distributor, tasks))
}

/// Spawn a task applying `feed` events to the distributor.
pub fn spawn_membership_watcher<R, C>(
    distributor: Arc<StreamsDistributor<R, C>>,
    feed: RegistryEventStream,
) -> JoinHandle<()>
where
    R: NodeRegistry + 'static,
    C: OnChainConfig + 'static,
{
    tokio::spawn(watch_membership(distributor, feed))
}

/// Apply feed events until the feed ends.
///
/// A lagged feed has lost events, so the view is reloaded at the current
/// block when `reload_on_feed_lag` is set.
pub async fn watch_membership<R, C>(
    distributor: Arc<StreamsDistributor<R, C>>,
    mut feed: RegistryEventStream,
) where
    R: NodeRegistry,
    C: OnChainConfig,
{
    while let Some(item) = feed.next().await {
        match item {
            Ok(event) => {
                distributor.apply_event(&event);
            }
            Err(RegistryError::FeedLagged(missed)) => {
                warn!(missed, "Registry feed lagged");
                if distributor.config().reload_on_feed_lag {
                    if let Err(e) = distributor.reload_latest().await {
                        error!(error = %e, "Reload after feed lag failed");
                    }
                }
            }
            Err(RegistryError::FeedClosed) => break,
            Err(e) => {
                warn!(error = %e, "Registry feed error");
            }
        }
    }
    info!("Registry feed closed, membership watcher stopped");
}

/// Spawn a task reseeding loads every `period`.
pub fn spawn_periodic_reseed<R, C>(
    distributor: Arc<StreamsDistributor<R, C>>,
    period: Duration,
) -> JoinHandle<()>
where
    R: NodeRegistry + 'static,
    C: OnChainConfig + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // First tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let result = match distributor.registry().block_number().await {
                Ok(block) => distributor.reseed(block).await.map(|_| ()),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                error!(error = %e, "Periodic reseed failed");
            }
        }
    })
}
