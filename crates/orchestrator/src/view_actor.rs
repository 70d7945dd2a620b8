use crate::commands::{ViewCommand, ViewConfig, ViewState};
use crate::snapshot::{SourcePane, ViewSnapshot};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use quant_dash_core::config::PipelineConfig;
use quant_dash_core::error::SourceError;
use quant_dash_core::traits::{SourceFetcher, SourceKind};
use quant_dash_pipeline::normalize::{normalize_source, SourceChunk};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// Result of one full refresh cycle: every configured source settled,
/// success or failure. Partial results are never reported mid-cycle.
struct CycleOutcome {
    started_at: DateTime<Utc>,
    results: Vec<(SourceKind, Result<SourceChunk, SourceError>)>,
}

/// Actor owning one view's snapshot slot.
///
/// Only this actor writes the slot, and it writes by replacing the whole
/// `Arc<ViewSnapshot>` through the watch channel, so consumers never observe
/// a torn snapshot.
pub struct ViewActor {
    config: ViewConfig,
    pipeline: PipelineConfig,
    fetcher: Arc<dyn SourceFetcher>,
    rx: mpsc::Receiver<ViewCommand>,
    snapshot_tx: watch::Sender<Arc<ViewSnapshot>>,
    cycle: u64,
    in_flight: bool,
}

impl ViewActor {
    #[must_use]
    pub fn new(
        config: ViewConfig,
        pipeline: PipelineConfig,
        fetcher: Arc<dyn SourceFetcher>,
        rx: mpsc::Receiver<ViewCommand>,
        snapshot_tx: watch::Sender<Arc<ViewSnapshot>>,
    ) -> Self {
        Self {
            config,
            pipeline,
            fetcher,
            rx,
            snapshot_tx,
            cycle: 0,
            in_flight: false,
        }
    }

    /// Runs the actor until `Shutdown` or the command channel closes.
    ///
    /// The first interval tick fires immediately, so a freshly spawned view
    /// starts its first cycle without waiting a full period.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let (done_tx, mut done_rx) = mpsc::channel::<CycleOutcome>(1);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.maybe_begin_cycle(&done_tx),
                Some(outcome) = done_rx.recv() => self.publish_cycle(&outcome),
                command = self.rx.recv() => match command {
                    Some(ViewCommand::Refresh) => self.maybe_begin_cycle(&done_tx),
                    Some(ViewCommand::GetSnapshot(reply)) => {
                        let _ = reply.send(Arc::clone(&self.snapshot_tx.borrow()));
                    }
                    Some(ViewCommand::Shutdown) | None => break,
                },
            }
        }
        // Dropping done_rx here makes any still-in-flight cycle's result
        // unsendable; the late arrival is ignored, per the cancellation rule.
        tracing::info!(view_id = %self.config.view_id, "view actor stopped");
    }

    /// Enters `Fetching` unless a cycle is already outstanding, in which case
    /// the trigger is suppressed — not queued, not restarted.
    fn maybe_begin_cycle(&mut self, done_tx: &mpsc::Sender<CycleOutcome>) {
        if self.in_flight {
            tracing::debug!(
                view_id = %self.config.view_id,
                "refresh suppressed: cycle already in flight"
            );
            return;
        }
        self.in_flight = true;
        self.mark_fetching();

        let fetcher = Arc::clone(&self.fetcher);
        let sources = self.config.sources.clone();
        let symbol = self.config.symbol.clone();
        let pipeline = self.pipeline.clone();
        let view_id = self.config.view_id.clone();
        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let started_at = Utc::now();
            let worker = tokio::spawn({
                let sources = sources.clone();
                async move { run_cycle(&*fetcher, &sources, symbol.as_deref(), &pipeline).await }
            });
            // A cycle that dies mid-flight must still settle, otherwise the
            // in-flight flag wedges the view and suppresses every later
            // trigger. Every source in a dead cycle reports as failed.
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::error!(%view_id, %error, "refresh cycle task died");
                    let message = error.to_string();
                    CycleOutcome {
                        started_at,
                        results: sources
                            .iter()
                            .map(|&kind| (kind, Err(SourceError::Aborted(message.clone()))))
                            .collect(),
                    }
                }
            };
            let _ = done_tx.send(outcome).await;
        });
    }

    fn mark_fetching(&self) {
        self.snapshot_tx.send_modify(|snapshot| {
            let mut next = (**snapshot).clone();
            next.state = ViewState::Fetching;
            *snapshot = Arc::new(next);
        });
    }

    /// Folds a settled cycle into a brand-new snapshot and publishes it
    /// atomically.
    fn publish_cycle(&mut self, outcome: &CycleOutcome) {
        self.in_flight = false;
        self.cycle += 1;

        let previous = Arc::clone(&self.snapshot_tx.borrow());
        let mut next = (*previous).clone();
        next.cycle = self.cycle;
        next.fetched_at = outcome.started_at;

        let mut all_succeeded = true;
        for (kind, result) in &outcome.results {
            match result {
                Ok(chunk) => next.apply_fresh(chunk.clone()),
                Err(error) => {
                    all_succeeded = false;
                    tracing::warn!(
                        view_id = %self.config.view_id,
                        source = kind.name(),
                        %error,
                        "source fetch failed; retaining last-known-good data"
                    );
                    next.apply_failure(*kind, error.to_string());
                }
            }
        }

        next.state = if all_succeeded {
            ViewState::Ready
        } else if next.has_any_data() {
            ViewState::PartiallyFailed
        } else {
            ViewState::Failed
        };
        next.derived = Some(next.compute_derived(&self.pipeline));

        tracing::info!(
            view_id = %self.config.view_id,
            cycle = next.cycle,
            state = ?next.state,
            "refresh cycle settled"
        );
        self.snapshot_tx.send_replace(Arc::new(next));
    }
}

impl ViewSnapshot {
    fn apply_fresh(&mut self, chunk: SourceChunk) {
        match chunk {
            SourceChunk::Bars(bars) => self.bars = SourcePane::fresh(bars),
            SourceChunk::Forecast(rows) => self.forecast = SourcePane::fresh(rows),
            SourceChunk::Scorecards(cards) => self.scorecards = SourcePane::fresh(cards),
            SourceChunk::Circuit(metrics) => self.circuit = SourcePane::fresh(metrics),
            SourceChunk::LastUpdate(stamp) => self.last_update = SourcePane::fresh(stamp),
        }
    }

    fn apply_failure(&mut self, kind: SourceKind, error: String) {
        match kind {
            SourceKind::IndexHistory => self.bars = SourcePane::carry_over(&self.bars, error),
            SourceKind::Forecast => self.forecast = SourcePane::carry_over(&self.forecast, error),
            SourceKind::ModelScorecards => {
                self.scorecards = SourcePane::carry_over(&self.scorecards, error);
            }
            SourceKind::CircuitMetrics => {
                self.circuit = SourcePane::carry_over(&self.circuit, error);
            }
            SourceKind::LastUpdate => {
                self.last_update = SourcePane::carry_over(&self.last_update, error);
            }
        }
    }
}

/// Issues every source fetch before awaiting any of them, then normalizes
/// each settled payload. Returns only once all sources have settled.
async fn run_cycle(
    fetcher: &dyn SourceFetcher,
    sources: &[SourceKind],
    symbol: Option<&str>,
    pipeline: &PipelineConfig,
) -> CycleOutcome {
    let started_at = Utc::now();
    let fetches = sources.iter().map(|&kind| async move {
        let result = match fetcher.fetch(kind, symbol).await {
            Ok(payload) => {
                normalize_source(kind, &payload, pipeline).map_err(SourceError::from)
            }
            Err(error) => Err(SourceError::from(error)),
        };
        (kind, result)
    });
    let results = join_all(fetches).await;
    CycleOutcome {
        started_at,
        results,
    }
}
