use std::time::Duration;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_DEBOUNCE_MS: u64 = 100;
pub const DEFAULT_PERIODIC_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_FINGERPRINT_CHARS: usize = 100;
pub const DEFAULT_MIN_TEXT_LENGTH: usize = 12;
pub const DEFAULT_MIN_BATCH_COUNT: usize = 2;

const DEFAULT_CHATGPT_CONTAINERS: &[&str] = &[
    r#"[data-message-author-role="assistant"]"#,
    r#"article[data-testid^="conversation-turn"] .markdown"#,
];

const DEFAULT_CLAUDE_CONTAINERS: &[&str] = &[
    ".font-claude-message",
    ".font-claude-response",
    "[data-is-streaming]",
];

const DEFAULT_NOISE_MARKERS: &[&str] = &[
    "window.__oai",
    "__oai_SSR",
    "__NEXT_DATA__",
    "self.__next_f",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectorConfig {
    pub debounce_ms: u64,
    pub periodic_interval_ms: u64,
    pub fingerprint_chars: usize,
    pub min_text_length: usize,
    pub noise_markers: Vec<String>,
    pub min_batch_count: usize,
    pub sibling_min_children: usize,
    pub sibling_max_children: usize,
    pub chatgpt_containers: Vec<String>,
    pub claude_containers: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            periodic_interval_ms: DEFAULT_PERIODIC_INTERVAL_MS,
            fingerprint_chars: DEFAULT_FINGERPRINT_CHARS,
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
            noise_markers: to_strings(DEFAULT_NOISE_MARKERS),
            min_batch_count: DEFAULT_MIN_BATCH_COUNT,
            sibling_min_children: 2,
            sibling_max_children: 10,
            chatgpt_containers: to_strings(DEFAULT_CHATGPT_CONTAINERS),
            claude_containers: to_strings(DEFAULT_CLAUDE_CONTAINERS),
        }
    }
}

impl DetectorConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config = serde_json::from_str::<Self>(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.periodic_interval_ms == 0 {
            return Err(ConfigError::InvalidOption(
                "periodicIntervalMs must be greater than zero".to_string(),
            ));
        }
        if self.fingerprint_chars == 0 {
            return Err(ConfigError::InvalidOption(
                "fingerprintChars must be greater than zero".to_string(),
            ));
        }
        if self.min_batch_count == 0 {
            return Err(ConfigError::InvalidOption(
                "minBatchCount must be at least 1".to_string(),
            ));
        }
        if self.sibling_min_children < 2 {
            return Err(ConfigError::InvalidOption(
                "siblingMinChildren must be at least 2".to_string(),
            ));
        }
        if self.sibling_max_children < self.sibling_min_children {
            return Err(ConfigError::InvalidOption(format!(
                "siblingMaxChildren ({}) is smaller than siblingMinChildren ({})",
                self.sibling_max_children, self.sibling_min_children
            )));
        }

        parse_selectors(&self.chatgpt_containers)?;
        parse_selectors(&self.claude_containers)?;
        Ok(())
    }

    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub const fn periodic_interval(&self) -> Duration {
        Duration::from_millis(self.periodic_interval_ms)
    }
}

pub fn parse_selectors(raw: &[String]) -> Result<Vec<Selector>, ConfigError> {
    raw.iter()
        .map(|selector| {
            Selector::parse(selector).map_err(|error| ConfigError::InvalidSelector {
                selector: selector.clone(),
                message: format!("{error:?}"),
            })
        })
        .collect()
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}
