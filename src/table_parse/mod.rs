mod aria;
mod html_table;
mod markdown;
mod sibling;
mod text_block;

use scraper::ElementRef;

use crate::dom::inner_text;
use crate::options::DetectorConfig;

pub use aria::{is_aria_table, parse_aria_table};
pub use html_table::parse_html_table;
pub use markdown::{is_separator_line, looks_like_pipe_table, parse_markdown_table, split_pipe_cells};
pub use sibling::parse_sibling_structure;
pub use text_block::{parse_text_block, split_whitespace_cells};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub adjusted_rows: usize,
}

impl ParsedTable {
    pub fn from_parts(headers: Vec<String>, rows: Vec<Vec<String>>) -> Option<Self> {
        let rows = rows
            .into_iter()
            .filter(|row| !row.is_empty())
            .collect::<Vec<_>>();
        let (rows, adjusted_rows) = if headers.is_empty() {
            (rows, 0)
        } else {
            normalize_rows(rows, headers.len())
        };

        if headers.is_empty() && rows.is_empty() {
            return None;
        }

        Some(Self {
            headers,
            rows,
            adjusted_rows,
        })
    }
}

pub fn normalize_rows(rows: Vec<Vec<String>>, width: usize) -> (Vec<Vec<String>>, usize) {
    let mut adjusted = 0_usize;
    let rows = rows
        .into_iter()
        .map(|mut row| {
            if row.len() != width {
                adjusted += 1;
                row.resize(width, String::new());
            }
            row
        })
        .collect();
    (rows, adjusted)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserStrategy {
    HtmlTable,
    MarkdownPipe,
    AriaRole,
    SiblingStructure,
    TextBlock,
}

impl ParserStrategy {
    pub const PRIORITY: [Self; 5] = [
        Self::HtmlTable,
        Self::MarkdownPipe,
        Self::AriaRole,
        Self::SiblingStructure,
        Self::TextBlock,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::HtmlTable => "html_table",
            Self::MarkdownPipe => "markdown_pipe",
            Self::AriaRole => "aria_role",
            Self::SiblingStructure => "sibling_structure",
            Self::TextBlock => "text_block",
        }
    }

    pub const fn is_text_based(self) -> bool {
        matches!(self, Self::MarkdownPipe | Self::TextBlock)
    }

    pub fn applies_to(self, element: ElementRef<'_>) -> bool {
        let name = element.value().name();
        match self {
            Self::HtmlTable => name == "table",
            Self::MarkdownPipe => name == "pre" || name == "code",
            Self::AriaRole => is_aria_table(element),
            Self::SiblingStructure => name == "div",
            Self::TextBlock => name != "table",
        }
    }

    pub fn parse(self, element: ElementRef<'_>, config: &DetectorConfig) -> Option<ParsedTable> {
        match self {
            Self::HtmlTable => parse_html_table(element),
            Self::MarkdownPipe => parse_markdown_table(&inner_text(element)),
            Self::AriaRole => parse_aria_table(element),
            Self::SiblingStructure => parse_sibling_structure(
                element,
                config.sibling_min_children,
                config.sibling_max_children,
            ),
            Self::TextBlock => parse_text_block(&inner_text(element)),
        }
    }
}
