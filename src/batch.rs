use tracing::debug;

use crate::dom::Document;
use crate::error::ConfigError;
use crate::lifecycle::TableWatcher;
use crate::models::BatchTableDetectionResult;
use crate::options::DetectorConfig;
use crate::registry::{DetectionRegistry, ScanReport, ScanTrigger};

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchGrouper;

impl BatchGrouper {
    pub fn group(registry: &DetectionRegistry) -> BatchTableDetectionResult {
        let tables = registry.detection_results();
        let page = registry.page();
        debug!(count = tables.len(), source = page.source.as_str(), "grouped tables");

        BatchTableDetectionResult {
            count: tables.len(),
            tables,
            source: page.source,
            chat_title: page.chat_title.clone(),
        }
    }
}

pub fn is_batch_eligible(result: &BatchTableDetectionResult, min_count: usize) -> bool {
    result.count >= min_count.max(1)
}

pub fn extract_batch(
    page_url: &str,
    html: &str,
    chat_title: Option<String>,
    config: DetectorConfig,
) -> Result<(BatchTableDetectionResult, ScanReport), ConfigError> {
    let document = Document::parse(html);
    let mut watcher = TableWatcher::new(page_url, config)?;
    if let Some(chat_title) = chat_title {
        watcher = watcher.with_chat_title(chat_title);
    }

    let report = watcher.rescan(&document, ScanTrigger::Manual);
    Ok((watcher.batch(), report))
}
