//! Refresh coordinator.
//!
//! Owns the current selection and the published report. Every cycle takes a
//! generation number when it starts; a publish is accepted only while that
//! generation is still the newest, so a slow cycle can never overwrite the
//! result of a cycle that started after it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::annotation::{annotate_or_placeholder, Annotator};
use crate::data::{ChainRequest, ChainSource};
use crate::pipeline::{AnalyticsConfig, GexAnalyzer, ProfileOutcome};

/// Refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds between periodic cycles.
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// A report as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedReport {
    pub generation: u64,
    pub request: ChainRequest,
    pub computed_at: DateTime<Utc>,
    pub outcome: ProfileOutcome,
}

/// How a single cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Published(u64),
    /// A newer cycle or selection started first; the result was dropped.
    Superseded(u64),
    /// The source failed; the previous report stays current.
    SourceUnavailable(String),
    Failed(String),
}

pub type ReportReceiver = watch::Receiver<Option<Arc<PublishedReport>>>;

pub struct RefreshCoordinator {
    source: Arc<dyn ChainSource>,
    annotator: Option<Arc<dyn Annotator>>,
    annotation_timeout: Duration,
    analyzer: GexAnalyzer,
    config: RefreshConfig,
    selection: RwLock<ChainRequest>,
    generation: AtomicU64,
    trigger: Notify,
    reports: watch::Sender<Option<Arc<PublishedReport>>>,
}

impl RefreshCoordinator {
    pub fn new(
        source: Arc<dyn ChainSource>,
        analytics: &AnalyticsConfig,
        config: RefreshConfig,
        initial: ChainRequest,
    ) -> Self {
        let (reports, _) = watch::channel(None);
        Self {
            source,
            annotator: None,
            annotation_timeout: Duration::from_secs(15),
            analyzer: GexAnalyzer::new(analytics),
            config,
            selection: RwLock::new(initial),
            generation: AtomicU64::new(0),
            trigger: Notify::new(),
            reports,
        }
    }

    /// Attach commentary, bounded by `timeout` per cycle. The numeric
    /// report is published before commentary is requested.
    pub fn with_annotator(mut self, annotator: Arc<dyn Annotator>, timeout: Duration) -> Self {
        self.annotator = Some(annotator);
        self.annotation_timeout = timeout;
        self
    }

    /// Change the selection. In-flight cycles for the old selection are
    /// superseded and a new cycle is requested.
    pub fn select(&self, request: ChainRequest) {
        info!(ticker = %request.ticker, expiration = %request.expiration, "Selection changed");
        *self.selection.write() = request;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.trigger.notify_one();
    }

    pub fn selection(&self) -> ChainRequest {
        self.selection.read().clone()
    }

    /// Request a cycle without changing the selection.
    pub fn refresh(&self) {
        self.trigger.notify_one();
    }

    pub fn subscribe(&self) -> ReportReceiver {
        self.reports.subscribe()
    }

    /// Most recently published report.
    pub fn current(&self) -> Option<Arc<PublishedReport>> {
        self.reports.borrow().clone()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Fetch, compute and publish once, then attach commentary if an
    /// annotator is configured.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request = self.selection();
        debug!(generation, ticker = %request.ticker, "Cycle started");

        let snapshot = match self.source.fetch(&request).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(generation, ticker = %request.ticker, "Source unavailable: {}", e);
                return CycleOutcome::SourceUnavailable(e.to_string());
            }
        };

        if !self.is_current(generation) {
            debug!(generation, "Cycle superseded after fetch");
            return CycleOutcome::Superseded(generation);
        }

        let outcome = match self.analyzer.outcome(&snapshot) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(generation, ticker = %request.ticker, "Compute failed: {}", e);
                return CycleOutcome::Failed(e.to_string());
            }
        };

        // Numbers go out first; commentary follows as a re-send of the same generation.
        let published = match self.publish(generation, request, outcome) {
            Ok(published) => published,
            Err(superseded) => return superseded,
        };

        if let (Some(annotator), Some(report)) = (&self.annotator, published.outcome.report()) {
            let commentary = annotate_or_placeholder(&**annotator, report, self.annotation_timeout).await;
            let annotated = ProfileOutcome::Ready(Box::new(report.clone().with_commentary(commentary)));
            self.attach_commentary(&published, annotated);
        }

        CycleOutcome::Published(generation)
    }

    fn publish(
        &self,
        generation: u64,
        request: ChainRequest,
        outcome: ProfileOutcome,
    ) -> Result<Arc<PublishedReport>, CycleOutcome> {
        let published = Arc::new(PublishedReport {
            generation,
            request,
            computed_at: Utc::now(),
            outcome,
        });

        let accepted = self.reports.send_if_modified(|current| {
            let newer_published = current.as_ref().is_some_and(|c| c.generation >= generation);
            if !self.is_current(generation) || newer_published {
                return false;
            }
            *current = Some(Arc::clone(&published));
            true
        });

        if accepted {
            info!(
                generation,
                ticker = %published.outcome.ticker(),
                ready = published.outcome.report().is_some(),
                "Report published"
            );
            Ok(published)
        } else {
            debug!(generation, "Cycle superseded before publish");
            Err(CycleOutcome::Superseded(generation))
        }
    }

    /// Replace the report of `numeric`'s generation with its annotated
    /// version. Dropped if anything newer started or was published meanwhile.
    fn attach_commentary(&self, numeric: &PublishedReport, annotated: ProfileOutcome) {
        let generation = numeric.generation;
        let updated = Arc::new(PublishedReport {
            generation,
            request: numeric.request.clone(),
            computed_at: numeric.computed_at,
            outcome: annotated,
        });

        let accepted = self.reports.send_if_modified(|current| {
            let same_generation = current.as_ref().is_some_and(|c| c.generation == generation);
            if !self.is_current(generation) || !same_generation {
                return false;
            }
            *current = Some(Arc::clone(&updated));
            true
        });

        if accepted {
            debug!(generation, "Commentary attached");
        } else {
            debug!(generation, "Commentary dropped, cycle superseded");
        }
    }

    /// Run periodic and triggered cycles until `cancel` fires. Each cycle
    /// runs on its own task so a slow fetch never delays a newer trigger.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(interval_secs = self.config.interval().as_secs(), "Refresh coordinator started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Refresh coordinator stopped");
                    break;
                }
                _ = ticker.tick() => {}
                () = self.trigger.notified() => {
                    ticker.reset();
                }
            }

            let this = Arc::clone(&self);
            let cancel = cancel.child_token();
            tokio::spawn(async move {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    outcome = this.run_cycle() => {
                        debug!(?outcome, "Cycle finished");
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ChainSnapshot, ExpirationPreference, OptionContract, OptionType, SourceError};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    struct FixedSource;

    #[async_trait]
    impl ChainSource for FixedSource {
        async fn fetch(&self, request: &ChainRequest) -> Result<ChainSnapshot, SourceError> {
            if request.ticker == "NONE" {
                return Err(SourceError::NoData {
                    ticker: request.ticker.clone(),
                    detail: "unknown symbol".to_string(),
                });
            }
            let contract = OptionContract {
                strike: dec!(100),
                option_type: OptionType::Call,
                gamma: Some(0.05),
                open_interest: 1000,
                volume: 10,
                bid: dec!(1.0),
                ask: dec!(1.1),
                delta: 0.5,
                implied_vol: 0.2,
            };
            Ok(
                ChainSnapshot::new(&request.ticker, NaiveDate::from_ymd_opt(2024, 1, 19).unwrap(), dec!(100))
                    .with_contracts(vec![contract]),
            )
        }
    }

    fn coordinator(ticker: &str) -> RefreshCoordinator {
        RefreshCoordinator::new(
            Arc::new(FixedSource),
            &AnalyticsConfig::default(),
            RefreshConfig::default(),
            ChainRequest::new(ticker, ExpirationPreference::ZeroDte),
        )
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = RefreshConfig { interval_secs: 0 };
        assert_eq!(config.interval(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_cycle_publishes() {
        let c = coordinator("spy");
        assert!(c.current().is_none());

        assert_eq!(c.run_cycle().await, CycleOutcome::Published(1));
        let current = c.current().unwrap();
        assert_eq!(current.generation, 1);
        assert_eq!(current.outcome.ticker(), "SPY");
        assert_eq!(current.outcome.report().unwrap().flip_strike, 100.0);
    }

    #[tokio::test]
    async fn test_select_changes_selection() {
        let c = coordinator("SPY");
        c.select(ChainRequest::new("qqq", ExpirationPreference::Week));
        assert_eq!(c.selection().ticker, "QQQ");
        assert_eq!(c.selection().expiration, ExpirationPreference::Week);

        c.run_cycle().await;
        assert_eq!(c.current().unwrap().request.ticker, "QQQ");
    }

    #[tokio::test]
    async fn test_source_failure_reports_unavailable() {
        let c = coordinator("NONE");
        assert!(matches!(c.run_cycle().await, CycleOutcome::SourceUnavailable(_)));
        assert!(c.current().is_none());
    }

    #[tokio::test]
    async fn test_subscriber_sees_publish() {
        let c = coordinator("SPY");
        let mut rx = c.subscribe();
        c.run_cycle().await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().generation, 1);
    }
}
