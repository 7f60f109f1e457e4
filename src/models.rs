use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dom::NodeId;

pub const CHATGPT_HOSTS: &[&str] = &["chatgpt.com", "chat.openai.com"];
pub const CLAUDE_HOSTS: &[&str] = &["claude.ai"];
pub const GEMINI_HOSTS: &[&str] = &["gemini.google.com", "bard.google.com"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    ChatGpt,
    Claude,
    Gemini,
    Other,
}

impl Source {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChatGpt => "chatgpt",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableData {
    pub id: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub source: Source,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_title: Option<String>,
}

impl TableData {
    pub fn same_content(&self, other: &Self) -> bool {
        self.headers == other.headers && self.rows == other.rows
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableDetectionResult {
    pub table: TableData,
    #[serde(skip)]
    pub element: NodeId,
    pub anchor: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchTableDetectionResult {
    pub tables: Vec<TableDetectionResult>,
    pub count: usize,
    pub source: Source,
    pub chat_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    pub url: String,
    pub html: String,
    #[serde(default)]
    pub chat_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceResponse {
    pub url: String,
    pub source: Source,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}
