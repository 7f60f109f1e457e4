use std::sync::LazyLock;
use std::time::{Duration, Instant};

use scraper::Selector;
use tracing::{debug, info};

use crate::batch::{BatchGrouper, is_batch_eligible};
use crate::dom::{Document, MutationRecord};
use crate::error::ConfigError;
use crate::models::{BatchTableDetectionResult, Source};
use crate::options::DetectorConfig;
use crate::registry::{DetectionRegistry, PageContext, ScanContext, ScanReport, ScanTrigger};
use crate::source::classify_source;
use crate::table_detect::{TableDetector, detector_for};

static TABLE_OR_PRE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table, pre").expect("hardcoded table/pre selector is valid"));

#[derive(Debug, Clone)]
pub struct RescanScheduler {
    debounce: Duration,
    interval: Duration,
    pending_debounce: Option<Instant>,
    next_periodic: Option<Instant>,
}

impl RescanScheduler {
    pub fn new(debounce: Duration, interval: Duration) -> Self {
        Self {
            debounce,
            interval,
            pending_debounce: None,
            next_periodic: None,
        }
    }

    pub fn connect(&mut self, now: Instant) {
        self.pending_debounce = None;
        self.next_periodic = Some(now + self.interval);
    }

    pub fn is_connected(&self) -> bool {
        self.next_periodic.is_some()
    }

    pub fn notify(&mut self, now: Instant) {
        if self.is_connected() {
            self.pending_debounce = Some(now + self.debounce);
        }
    }

    pub fn pending_debounce(&self) -> Option<Instant> {
        self.pending_debounce
    }

    // A due debounce wins over a due periodic tick; the other stays armed.
    pub fn poll(&mut self, now: Instant) -> Option<ScanTrigger> {
        let next_periodic = self.next_periodic?;

        if self.pending_debounce.is_some_and(|deadline| now >= deadline) {
            self.pending_debounce = None;
            return Some(ScanTrigger::Mutation);
        }

        if now >= next_periodic {
            self.next_periodic = Some(now + self.interval);
            return Some(ScanTrigger::Periodic);
        }

        None
    }

    pub fn disconnect(&mut self) {
        self.pending_debounce = None;
        self.next_periodic = None;
    }
}

pub fn mutation_adds_table(document: &Document, record: &MutationRecord) -> bool {
    record.added.iter().any(|id| {
        document.element(*id).is_some_and(|element| {
            matches!(element.value().name(), "table" | "pre")
                || element.select(&TABLE_OR_PRE).next().is_some()
        })
    })
}

pub struct TableWatcher {
    config: DetectorConfig,
    detector: Box<dyn TableDetector>,
    registry: DetectionRegistry,
    scheduler: RescanScheduler,
}

impl TableWatcher {
    pub fn new(page_url: &str, config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let source = classify_source(page_url);
        let detector = detector_for(source, &config)?;
        let scheduler = RescanScheduler::new(config.debounce(), config.periodic_interval());
        let registry = DetectionRegistry::new(PageContext {
            source,
            url: page_url.to_string(),
            chat_title: None,
        });

        Ok(Self {
            config,
            detector,
            registry,
            scheduler,
        })
    }

    #[must_use]
    pub fn with_chat_title(mut self, chat_title: impl Into<String>) -> Self {
        self.registry.set_chat_title(Some(chat_title.into()));
        self
    }

    pub fn source(&self) -> Source {
        self.registry.page().source
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_connected()
    }

    pub fn start(&mut self, document: &mut Document, now: Instant) -> ScanReport {
        document.take_mutations();
        self.scheduler.connect(now);
        info!(
            source = self.source().as_str(),
            detector = self.detector.name(),
            "table watcher started"
        );
        self.rescan(document, ScanTrigger::Initial)
    }

    pub fn observe(&mut self, document: &mut Document, now: Instant) -> bool {
        let records = document.take_mutations();
        if !self.scheduler.is_connected() {
            return false;
        }

        let relevant = records
            .iter()
            .any(|record| mutation_adds_table(document, record));
        if relevant {
            debug!(mutations = records.len(), "table-like nodes added, debouncing rescan");
            self.scheduler.notify(now);
        }
        relevant
    }

    pub fn tick(&mut self, document: &mut Document, now: Instant) -> Option<ScanReport> {
        self.observe(document, now);
        let trigger = self.scheduler.poll(now)?;
        Some(self.rescan(document, trigger))
    }

    pub fn rescan(&mut self, document: &Document, trigger: ScanTrigger) -> ScanReport {
        self.registry
            .rescan(document, self.detector.as_ref(), ScanContext::now(trigger))
    }

    pub fn shutdown(&mut self) {
        self.scheduler.disconnect();
        info!(tracked = self.registry.len(), "table watcher stopped");
    }

    pub fn registry(&self) -> &DetectionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DetectionRegistry {
        &mut self.registry
    }

    pub fn scheduler(&self) -> &RescanScheduler {
        &self.scheduler
    }

    pub fn batch(&self) -> BatchTableDetectionResult {
        BatchGrouper::group(&self.registry)
    }

    pub fn batch_eligible(&self) -> bool {
        is_batch_eligible(&self.batch(), self.config.min_batch_count)
    }
}
