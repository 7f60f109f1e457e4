mod generic;
mod platform;

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use tracing::debug;

use crate::dom::{Document, NodeId, inner_text};
use crate::error::ConfigError;
use crate::models::Source;
use crate::options::DetectorConfig;
use crate::table_parse::{ParsedTable, ParserStrategy, looks_like_pipe_table};
use crate::warning::{IssueCode, ScanIssue};

pub use generic::GenericScanner;
pub use platform::{PlatformDetector, PlatformProfile};

pub(crate) static TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("hardcoded table selector is valid"));

pub(crate) static CODE_BLOCK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("pre, code").expect("hardcoded code selector is valid"));

pub(crate) static DIV_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div").expect("hardcoded div selector is valid"));

pub(crate) static PROSE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p, div").expect("hardcoded prose selector is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub element: NodeId,
    pub strategy: ParserStrategy,
    pub parsed: ParsedTable,
}

pub trait TableDetector {
    fn name(&self) -> &'static str;

    fn config(&self) -> &DetectorConfig;

    fn detect(&self, document: &Document, issues: &mut Vec<ScanIssue>) -> Vec<Detection>;
}

pub fn detector_for(
    source: Source,
    config: &DetectorConfig,
) -> Result<Box<dyn TableDetector>, ConfigError> {
    let detector: Box<dyn TableDetector> = match source {
        Source::ChatGpt => Box::new(PlatformDetector::new(
            PlatformProfile::chatgpt(config)?,
            config.clone(),
        )),
        Source::Claude => Box::new(PlatformDetector::new(
            PlatformProfile::claude(config)?,
            config.clone(),
        )),
        Source::Gemini | Source::Other => Box::new(GenericScanner::new(config.clone())),
    };
    Ok(detector)
}

pub(crate) fn overlaps_accepted(document: &Document, accepted: &[Detection], id: NodeId) -> bool {
    accepted
        .iter()
        .any(|detection| document.overlaps(detection.element, id))
}

pub(crate) fn text_allowed(
    element: ElementRef<'_>,
    config: &DetectorConfig,
    require_pipe: bool,
    issues: &mut Vec<ScanIssue>,
) -> bool {
    let text = inner_text(element);
    let trimmed = text.trim();
    if trimmed.chars().count() < config.min_text_length {
        return false;
    }

    if let Some(marker) = config
        .noise_markers
        .iter()
        .find(|marker| trimmed.contains(marker.as_str()))
    {
        debug!(marker = %marker, "skipping candidate with injected script text");
        issues.push(
            ScanIssue::new(
                IssueCode::NoiseFiltered,
                format!("text contains noise marker '{marker}'"),
            )
            .with_element(element.id()),
        );
        return false;
    }

    let has_pipe = trimmed.contains('|');
    if require_pipe && !has_pipe {
        return false;
    }
    !has_pipe || looks_like_pipe_table(trimmed)
}

pub(crate) fn record_accepted(detection: &Detection, issues: &mut Vec<ScanIssue>) {
    debug!(
        strategy = detection.strategy.name(),
        headers = detection.parsed.headers.len(),
        rows = detection.parsed.rows.len(),
        "accepted table candidate"
    );
    if detection.parsed.adjusted_rows > 0 {
        issues.push(
            ScanIssue::new(
                IssueCode::MalformedRow,
                format!(
                    "{} row(s) padded or truncated to {} column(s)",
                    detection.parsed.adjusted_rows,
                    detection.parsed.headers.len()
                ),
            )
            .with_element(detection.element)
            .with_strategy(detection.strategy),
        );
    }
}

pub(crate) fn into_document_order(
    document: &Document,
    mut detections: Vec<Detection>,
) -> Vec<Detection> {
    let positions = document.positions();
    detections.sort_by_key(|detection| {
        positions
            .get(&detection.element)
            .copied()
            .unwrap_or(usize::MAX)
    });
    detections
}
