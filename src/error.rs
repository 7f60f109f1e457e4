use std::fmt::{Display, Formatter};

use thiserror::Error;
use worker::{Response, Result};

use crate::models::ErrorResponse;
use crate::routes::CONFIG_VAR;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("node does not exist in this document")]
    UnknownNode,

    #[error("node is not an element")]
    NotAnElement,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug)]
pub enum ApiError {
    MalformedBody(String),
    InvalidPageUrl(String),
    EmptyPage,
    MissingPageUrl,
    InvalidTableIndex(String),
    TableNotFound { index: usize, count: usize },
    DetectorMisconfigured(String),
    Runtime(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedBody(_) => "malformed_detect_request",
            Self::InvalidPageUrl(_) => "invalid_page_url",
            Self::EmptyPage => "empty_page_html",
            Self::MissingPageUrl => "missing_page_url",
            Self::InvalidTableIndex(_) => "invalid_table_index",
            Self::TableNotFound { .. } => "table_not_found",
            Self::DetectorMisconfigured(_) => "detector_misconfigured",
            Self::Runtime(_) => "worker_runtime_error",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::MalformedBody(reason) => format!("detect request body is not valid JSON: {reason}"),
            Self::InvalidPageUrl(reason) => format!("page url is not absolute: {reason}"),
            Self::EmptyPage => "page html is empty, nothing to scan".to_string(),
            Self::MissingPageUrl => "the url query parameter names the page to classify".to_string(),
            Self::InvalidTableIndex(reason) => format!("table index must be a number: {reason}"),
            Self::TableNotFound { index, count } => {
                format!("no table at index {index}, the page has {count} table(s)")
            }
            Self::DetectorMisconfigured(reason) => {
                format!("{CONFIG_VAR} is rejected by the detector: {reason}")
            }
            Self::Runtime(reason) => reason.clone(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedBody(_)
            | Self::InvalidPageUrl(_)
            | Self::MissingPageUrl
            | Self::InvalidTableIndex(_) => 400,
            Self::TableNotFound { .. } => 404,
            Self::EmptyPage => 422,
            Self::DetectorMisconfigured(_) | Self::Runtime(_) => 500,
        }
    }

    pub fn into_response(self) -> Result<Response> {
        let mut response = Response::from_json(&ErrorResponse {
            code: self.code().to_string(),
            message: self.message(),
        })?;
        response.headers_mut().set("Cache-Control", "no-store")?;
        Ok(response.with_status(self.status_code()))
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl From<worker::Error> for ApiError {
    fn from(error: worker::Error) -> Self {
        Self::Runtime(error.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::MalformedBody(error.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(error: url::ParseError) -> Self {
        Self::InvalidPageUrl(error.to_string())
    }
}

impl From<std::num::ParseIntError> for ApiError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::InvalidTableIndex(error.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(error: ConfigError) -> Self {
        Self::DetectorMisconfigured(error.to_string())
    }
}
