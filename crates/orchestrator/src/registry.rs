use crate::commands::{ViewCommand, ViewConfig};
use crate::handle::ViewHandle;
use crate::snapshot::ViewSnapshot;
use crate::view_actor::ViewActor;
use anyhow::{anyhow, Result};
use quant_dash_core::config::PipelineConfig;
use quant_dash_core::traits::SourceFetcher;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};

/// Spawns and tracks one actor per view.
pub struct ViewRegistry {
    views: Arc<RwLock<HashMap<String, ViewHandle>>>,
    fetcher: Arc<dyn SourceFetcher>,
    pipeline: PipelineConfig,
}

impl ViewRegistry {
    #[must_use]
    pub fn new(fetcher: Arc<dyn SourceFetcher>, pipeline: PipelineConfig) -> Self {
        Self {
            views: Arc::new(RwLock::new(HashMap::new())),
            fetcher,
            pipeline,
        }
    }

    /// Spawns an actor for the view and returns its handle. The actor's
    /// first cycle starts immediately.
    ///
    /// # Errors
    /// Returns an error if a view with the same id is already registered.
    pub async fn spawn_view(&self, config: ViewConfig) -> Result<ViewHandle> {
        let mut views = self.views.write().await;
        if views.contains_key(&config.view_id) {
            return Err(anyhow!("view {} already registered", config.view_id));
        }

        let (tx, rx) = mpsc::channel::<ViewCommand>(32);
        let (snapshot_tx, snapshot_rx) =
            watch::channel(Arc::new(ViewSnapshot::initial(config.view_id.clone())));
        let handle = ViewHandle::new(tx, snapshot_rx);

        let actor = ViewActor::new(
            config.clone(),
            self.pipeline.clone(),
            Arc::clone(&self.fetcher),
            rx,
            snapshot_tx,
        );
        tokio::spawn(actor.run());
        tracing::info!(view_id = %config.view_id, "view spawned");

        views.insert(config.view_id, handle.clone());
        Ok(handle)
    }

    pub async fn get(&self, view_id: &str) -> Option<ViewHandle> {
        self.views.read().await.get(view_id).cloned()
    }

    pub async fn list(&self) -> Vec<String> {
        self.views.read().await.keys().cloned().collect()
    }

    /// Shuts the view down and forgets it; its timer stops and any in-flight
    /// cycle result is ignored.
    ///
    /// # Errors
    /// Returns an error if the view is unknown.
    pub async fn shutdown_view(&self, view_id: &str) -> Result<()> {
        let handle = self
            .views
            .write()
            .await
            .remove(view_id)
            .ok_or_else(|| anyhow!("view {view_id} not registered"))?;
        handle.shutdown().await
    }

    /// Shuts down every registered view.
    ///
    /// # Errors
    /// Returns the first send failure encountered, after attempting all.
    pub async fn shutdown_all(&self) -> Result<()> {
        let mut views = self.views.write().await;
        let mut first_error = None;
        for (view_id, handle) in views.drain() {
            if let Err(error) = handle.shutdown().await {
                tracing::warn!(%view_id, %error, "failed to shut view down");
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
