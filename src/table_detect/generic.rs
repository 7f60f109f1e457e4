use scraper::ElementRef;
use tracing::debug;

use super::{
    CODE_BLOCK_SELECTOR, DIV_SELECTOR, Detection, TABLE_SELECTOR, TableDetector,
    into_document_order, overlaps_accepted, record_accepted, text_allowed,
};
use crate::dom::Document;
use crate::options::DetectorConfig;
use crate::table_parse::{ParserStrategy, is_aria_table};
use crate::warning::{IssueCode, ScanIssue};

#[derive(Debug, Clone)]
pub struct GenericScanner {
    config: DetectorConfig,
}

impl GenericScanner {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    fn consider(
        &self,
        document: &Document,
        element: ElementRef<'_>,
        accepted: &mut Vec<Detection>,
        issues: &mut Vec<ScanIssue>,
    ) {
        let id = element.id();
        if !document.is_rendered(id) || overlaps_accepted(document, accepted, id) {
            return;
        }

        let mut text_verdict = None;
        for strategy in ParserStrategy::PRIORITY
            .into_iter()
            .filter(|strategy| strategy.applies_to(element))
        {
            if strategy.is_text_based()
                && !*text_verdict
                    .get_or_insert_with(|| text_allowed(element, &self.config, false, issues))
            {
                continue;
            }

            if let Some(parsed) = strategy.parse(element, &self.config) {
                let detection = Detection {
                    element: id,
                    strategy,
                    parsed,
                };
                record_accepted(&detection, issues);
                accepted.push(detection);
                return;
            }
        }

        if matches!(element.value().name(), "table" | "pre") {
            issues.push(
                ScanIssue::new(IssueCode::NoTableFound, "candidate failed every parser")
                    .with_element(id),
            );
        }
    }
}

impl TableDetector for GenericScanner {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn detect(&self, document: &Document, issues: &mut Vec<ScanIssue>) -> Vec<Detection> {
        let tables = document.select(&TABLE_SELECTOR).collect::<Vec<_>>();
        let blocks = document.select(&CODE_BLOCK_SELECTOR).collect::<Vec<_>>();
        let (hinted, mut divs): (Vec<_>, Vec<_>) = document
            .select(&DIV_SELECTOR)
            .partition(|div| is_aria_table(*div));
        divs.reverse();

        debug!(
            tables = tables.len(),
            code_blocks = blocks.len(),
            hinted_divs = hinted.len(),
            divs = divs.len(),
            "generic scan candidates"
        );

        let mut accepted = Vec::new();
        for element in tables.into_iter().chain(blocks).chain(hinted).chain(divs) {
            self.consider(document, element, &mut accepted, issues);
        }

        into_document_order(document, accepted)
    }
}
