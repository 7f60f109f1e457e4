use std::collections::HashSet;

use scraper::{ElementRef, Selector};
use tracing::debug;

use super::{
    CODE_BLOCK_SELECTOR, Detection, PROSE_SELECTOR, TABLE_SELECTOR, TableDetector,
    into_document_order, overlaps_accepted, record_accepted, text_allowed,
};
use crate::dom::{Document, NodeId, text_content};
use crate::error::ConfigError;
use crate::models::Source;
use crate::options::{DetectorConfig, parse_selectors};
use crate::table_parse::ParserStrategy;
use crate::warning::{IssueCode, ScanIssue};

#[derive(Debug, Clone)]
pub struct PlatformProfile {
    pub source: Source,
    containers: Vec<Selector>,
    pub fingerprint_dedup: bool,
}

impl PlatformProfile {
    pub fn chatgpt(config: &DetectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            source: Source::ChatGpt,
            containers: parse_selectors(&config.chatgpt_containers)?,
            fingerprint_dedup: false,
        })
    }

    pub fn claude(config: &DetectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            source: Source::Claude,
            containers: parse_selectors(&config.claude_containers)?,
            fingerprint_dedup: true,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PlatformDetector {
    profile: PlatformProfile,
    config: DetectorConfig,
}

#[derive(Default)]
struct PlatformScan {
    accepted: Vec<Detection>,
    fingerprints: HashSet<String>,
}

impl PlatformDetector {
    pub fn new(profile: PlatformProfile, config: DetectorConfig) -> Self {
        Self { profile, config }
    }

    fn containers<'a>(&self, document: &'a Document) -> Vec<ElementRef<'a>> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for selector in &self.profile.containers {
            for container in document.select(selector) {
                if document.is_rendered(container.id()) && seen.insert(container.id()) {
                    found.push(container);
                }
            }
        }

        let ids = found.iter().map(|container| container.id()).collect::<Vec<NodeId>>();
        let positions = document.positions();
        let mut outermost = found
            .into_iter()
            .filter(|container| {
                !ids.iter().any(|other| {
                    *other != container.id()
                        && document.is_ancestor_or_self(*other, container.id())
                })
            })
            .collect::<Vec<_>>();
        outermost.sort_by_key(|container| {
            positions
                .get(&container.id())
                .copied()
                .unwrap_or(usize::MAX)
        });
        outermost
    }

    fn consider(
        &self,
        document: &Document,
        element: ElementRef<'_>,
        strategy: ParserStrategy,
        scan: &mut PlatformScan,
        issues: &mut Vec<ScanIssue>,
    ) {
        let id = element.id();
        if !document.is_rendered(id) || overlaps_accepted(document, &scan.accepted, id) {
            return;
        }
        if strategy.is_text_based() && !text_allowed(element, &self.config, true, issues) {
            return;
        }

        let content_key = self
            .profile
            .fingerprint_dedup
            .then(|| fingerprint(element, self.config.fingerprint_chars));
        if let Some(key) = &content_key {
            if scan.fingerprints.contains(key) {
                debug!(platform = self.profile.source.as_str(), "skipping duplicate content");
                issues.push(
                    ScanIssue::new(
                        IssueCode::DuplicateContent,
                        "leading text matches an already accepted table",
                    )
                    .with_element(id)
                    .with_strategy(strategy),
                );
                return;
            }
        }

        let Some(parsed) = strategy.parse(element, &self.config) else {
            if strategy != ParserStrategy::TextBlock {
                issues.push(
                    ScanIssue::new(IssueCode::NoTableFound, "candidate failed to parse")
                        .with_element(id)
                        .with_strategy(strategy),
                );
            }
            return;
        };

        let detection = Detection {
            element: id,
            strategy,
            parsed,
        };
        record_accepted(&detection, issues);
        scan.accepted.push(detection);
        if let Some(key) = content_key {
            scan.fingerprints.insert(key);
        }
    }
}

impl TableDetector for PlatformDetector {
    fn name(&self) -> &'static str {
        self.profile.source.as_str()
    }

    fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn detect(&self, document: &Document, issues: &mut Vec<ScanIssue>) -> Vec<Detection> {
        let containers = self.containers(document);
        debug!(
            platform = self.profile.source.as_str(),
            containers = containers.len(),
            "platform scan"
        );

        let mut scan = PlatformScan::default();
        for container in containers {
            let tables = container.select(&TABLE_SELECTOR).collect::<Vec<_>>();
            let blocks = container.select(&CODE_BLOCK_SELECTOR).collect::<Vec<_>>();
            let mut prose = std::iter::once(container)
                .chain(container.select(&PROSE_SELECTOR))
                .collect::<Vec<_>>();
            prose.reverse();

            let passes = [
                (ParserStrategy::HtmlTable, tables),
                (ParserStrategy::MarkdownPipe, blocks),
                (ParserStrategy::TextBlock, prose),
            ];
            for (strategy, elements) in passes {
                for element in elements {
                    self.consider(document, element, strategy, &mut scan, issues);
                }
            }
        }

        into_document_order(document, scan.accepted)
    }
}

fn fingerprint(element: ElementRef<'_>, chars: usize) -> String {
    text_content(element).trim().chars().take(chars).collect()
}
