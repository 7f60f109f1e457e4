use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::dom::{Document, NodeId};
use crate::models::{Source, TableData, TableDetectionResult};
use crate::table_detect::{Detection, TableDetector};
use crate::table_parse::ParserStrategy;
use crate::warning::{IssueCode, ScanIssue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub source: Source,
    pub url: String,
    pub chat_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedTable {
    pub element: NodeId,
    pub table: TableData,
    pub strategy: ParserStrategy,
    pub anchor: usize,
    pub has_overlay: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Untracked,
    Tracked { has_overlay: bool },
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Detached,
    Hidden,
    Superseded,
    Unparsable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Added {
        element: NodeId,
        table_id: String,
    },
    Updated {
        element: NodeId,
        previous_id: String,
        table_id: String,
    },
    Removed {
        element: NodeId,
        table_id: String,
        reason: RemovalReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTrigger {
    Initial,
    Mutation,
    Periodic,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanContext {
    pub trigger: ScanTrigger,
    pub captured_at: DateTime<Utc>,
}

impl ScanContext {
    pub fn now(trigger: ScanTrigger) -> Self {
        Self {
            trigger,
            captured_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub trigger: ScanTrigger,
    pub detector: &'static str,
    pub events: Vec<RegistryEvent>,
    pub issues: Vec<ScanIssue>,
    pub tracked: usize,
}

impl ScanReport {
    pub fn changed(&self) -> bool {
        !self.events.is_empty()
    }
}

// Rescan keeps (tracked + detected) minus detached, hidden, superseded and unparsable entries.
#[derive(Debug, Clone)]
pub struct DetectionRegistry {
    page: PageContext,
    entries: Vec<TrackedTable>,
    removed: HashSet<NodeId>,
}

impl DetectionRegistry {
    pub fn new(page: PageContext) -> Self {
        Self {
            page,
            entries: Vec::new(),
            removed: HashSet::new(),
        }
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    pub fn set_chat_title(&mut self, chat_title: Option<String>) {
        self.page.chat_title = chat_title;
    }

    pub fn rescan(
        &mut self,
        document: &Document,
        detector: &dyn TableDetector,
        context: ScanContext,
    ) -> ScanReport {
        let ScanContext {
            trigger,
            captured_at,
        } = context;
        let mut events = Vec::new();
        let mut issues = Vec::new();

        self.drop_stale(document, &mut events, &mut issues);

        let mut detections = detector.detect(document, &mut issues);
        self.reconcile(document, detector, &mut detections, &mut events);

        let positions = document.positions();
        for detection in detections {
            let anchor = positions
                .get(&detection.element)
                .copied()
                .unwrap_or(usize::MAX);
            let table = build_table(&detection, &self.page, captured_at, anchor);
            self.upsert(detection, table, anchor, &mut events);
        }

        for entry in &mut self.entries {
            if let Some(position) = positions.get(&entry.element) {
                entry.anchor = *position;
            }
        }
        self.entries.sort_by_key(|entry| entry.anchor);

        if events.is_empty() {
            debug!(
                detector = detector.name(),
                tracked = self.entries.len(),
                "rescan found no changes"
            );
        } else {
            info!(
                detector = detector.name(),
                ?trigger,
                changes = events.len(),
                tracked = self.entries.len(),
                "table registry updated"
            );
        }

        ScanReport {
            trigger,
            detector: detector.name(),
            events,
            issues,
            tracked: self.entries.len(),
        }
    }

    fn drop_stale(
        &mut self,
        document: &Document,
        events: &mut Vec<RegistryEvent>,
        issues: &mut Vec<ScanIssue>,
    ) {
        let removed = &mut self.removed;
        self.entries.retain(|entry| {
            let reason = if !document.contains(entry.element) {
                RemovalReason::Detached
            } else if !document.is_rendered(entry.element) {
                RemovalReason::Hidden
            } else {
                return true;
            };

            if reason == RemovalReason::Detached {
                issues.push(
                    ScanIssue::new(IssueCode::DetachedElement, "tracked element left the document")
                        .with_element(entry.element)
                        .with_strategy(entry.strategy),
                );
            }
            removed.insert(entry.element);
            events.push(RegistryEvent::Removed {
                element: entry.element,
                table_id: entry.table.id.clone(),
                reason,
            });
            false
        });
    }

    // Entries missing from this scan are dropped when an accepted element
    // overlaps them or they stop parsing. Otherwise they are re-extracted.
    fn reconcile(
        &mut self,
        document: &Document,
        detector: &dyn TableDetector,
        detections: &mut Vec<Detection>,
        events: &mut Vec<RegistryEvent>,
    ) {
        let accepted = detections
            .iter()
            .map(|detection| detection.element)
            .collect::<Vec<_>>();
        let mut reparsed = Vec::new();
        let removed = &mut self.removed;

        self.entries.retain(|entry| {
            if accepted.contains(&entry.element) {
                return true;
            }

            let reason = if accepted
                .iter()
                .any(|element| document.overlaps(*element, entry.element))
            {
                RemovalReason::Superseded
            } else {
                let parsed = document
                    .element(entry.element)
                    .and_then(|element| entry.strategy.parse(element, detector.config()));
                match parsed {
                    Some(parsed) => {
                        reparsed.push(Detection {
                            element: entry.element,
                            strategy: entry.strategy,
                            parsed,
                        });
                        return true;
                    }
                    None => RemovalReason::Unparsable,
                }
            };

            debug!(?reason, table_id = %entry.table.id, "dropping tracked table");
            removed.insert(entry.element);
            events.push(RegistryEvent::Removed {
                element: entry.element,
                table_id: entry.table.id.clone(),
                reason,
            });
            false
        });

        detections.extend(reparsed);
    }

    fn upsert(
        &mut self,
        detection: Detection,
        table: TableData,
        anchor: usize,
        events: &mut Vec<RegistryEvent>,
    ) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.element == detection.element)
        {
            if entry.table.same_content(&table) {
                return;
            }
            let previous_id = std::mem::replace(&mut entry.table, table).id;
            entry.strategy = detection.strategy;
            events.push(RegistryEvent::Updated {
                element: entry.element,
                previous_id,
                table_id: entry.table.id.clone(),
            });
            return;
        }

        self.removed.remove(&detection.element);
        events.push(RegistryEvent::Added {
            element: detection.element,
            table_id: table.id.clone(),
        });
        self.entries.push(TrackedTable {
            element: detection.element,
            table,
            strategy: detection.strategy,
            anchor,
            has_overlay: false,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tables(&self) -> &[TrackedTable] {
        &self.entries
    }

    pub fn has_table(&self, element: NodeId) -> bool {
        self.entry(element).is_some()
    }

    pub fn table_for(&self, element: NodeId) -> Option<&TableData> {
        self.entry(element).map(|entry| &entry.table)
    }

    pub fn state_of(&self, element: NodeId) -> TrackingState {
        if let Some(entry) = self.entry(element) {
            TrackingState::Tracked {
                has_overlay: entry.has_overlay,
            }
        } else if self.removed.contains(&element) {
            TrackingState::Removed
        } else {
            TrackingState::Untracked
        }
    }

    pub fn mark_overlay(&mut self, element: NodeId) -> bool {
        match self.entries.iter_mut().find(|entry| entry.element == element) {
            Some(entry) => {
                entry.has_overlay = true;
                true
            }
            None => false,
        }
    }

    pub fn detection_results(&self) -> Vec<TableDetectionResult> {
        self.entries
            .iter()
            .map(|entry| TableDetectionResult {
                table: entry.table.clone(),
                element: entry.element,
                anchor: entry.anchor,
            })
            .collect()
    }

    fn entry(&self, element: NodeId) -> Option<&TrackedTable> {
        self.entries.iter().find(|entry| entry.element == element)
    }
}

fn build_table(
    detection: &Detection,
    page: &PageContext,
    captured_at: DateTime<Utc>,
    anchor: usize,
) -> TableData {
    TableData {
        id: format!("table-{}-{anchor}", captured_at.timestamp_millis()),
        headers: detection.parsed.headers.clone(),
        rows: detection.parsed.rows.clone(),
        source: page.source,
        timestamp: captured_at,
        url: page.url.clone(),
        chat_title: page.chat_title.clone(),
    }
}
