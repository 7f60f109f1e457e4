use crate::dom::NodeId;
use crate::table_parse::ParserStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCode {
    NoTableFound,
    MalformedRow,
    DetachedElement,
    NoiseFiltered,
    DuplicateContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanIssue {
    pub code: IssueCode,
    pub message: String,
    pub element: Option<NodeId>,
    pub strategy: Option<ParserStrategy>,
}

impl ScanIssue {
    #[must_use]
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            element: None,
            strategy: None,
        }
    }

    #[must_use]
    pub fn with_element(mut self, element: NodeId) -> Self {
        self.element = Some(element);
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: ParserStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}
