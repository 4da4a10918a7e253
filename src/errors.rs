use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Timed out after {timeout:?} waiting for {condition}")]
    Timeout { condition: String, timeout: Duration },

    #[error("Error kind {kind:?} did not subside within {timeout:?} during {operation}: {source}")]
    RetryExhausted {
        operation: String,
        kind: ErrorKind,
        timeout: Duration,
        #[source]
        source: Box<BrowserError>,
    },

    #[error("Expected to arrive at {expected} but arrived at {actual} instead")]
    PageMismatch { expected: String, actual: String },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Stale element reference: {0}")]
    StaleElement(String),

    #[error("Element is a <{tag}>, not a <select>")]
    NotASelect { tag: String },

    #[error("Option {value} is not present in existing options: {options:?}")]
    InvalidSelectOption { value: String, options: Vec<String> },

    #[error("Element with locator {locator} has no {attribute} attribute")]
    AttributeNotFound { attribute: String, locator: String },

    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error("Supported scroll directions are 'up' and 'down', got '{0}'")]
    InvalidDirection(String),

    #[error("'{0}' window cannot be declared")]
    ReservedWindowName(String),

    #[error("'{0}' is already in use, use another or close the old one")]
    DuplicateWindowName(String),

    #[error("Window '{0}' does not exist")]
    WindowNotFound(String),

    #[error("Cannot close the main window")]
    CloseMainWindow,

    #[error("There are no active windows")]
    NoActiveWindow,

    #[error("Context {required} does not match available contexts {available:?}")]
    ContextUnavailable {
        required: String,
        available: Vec<String>,
    },

    #[error("No webview for this page. Available contexts: {available:?}")]
    NoWebview { available: Vec<String> },

    #[error("Element has no tree locator")]
    MissingTreeLocator,

    #[error(
        "Tree locator strategy {strategy} not supported. Supported strategies are {supported:?}"
    )]
    UnsupportedTreeStrategy {
        strategy: String,
        supported: Vec<String>,
    },

    #[error("No matching tree node found using locator {locator}")]
    NoMatchingNode { locator: String },

    #[error("Expected one matching tree node for {locator}, found {count}: {matches:?}")]
    AmbiguousMatch {
        locator: String,
        count: usize,
        matches: Vec<String>,
    },

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid path expression: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Unsupported by this driver: {0}")]
    Unsupported(String),

    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Driver error: {0}")]
    DriverError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Anyhow error: {0}")]
    AnyhowError(String),
}

/// Coarse classification used to decide whether an error is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    Mismatch,
    Configuration,
    Ambiguity,
    NotFound,
    Stale,
    External,
}

pub type Result<T> = std::result::Result<T, BrowserError>;

// Convert anyhow::Error to BrowserError
impl From<anyhow::Error> for BrowserError {
    fn from(err: anyhow::Error) -> Self {
        BrowserError::AnyhowError(err.to_string())
    }
}

impl BrowserError {
    pub fn from_any_error<E: std::fmt::Display>(err: E) -> Self {
        BrowserError::DriverError(err.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BrowserError::Timeout { .. } | BrowserError::RetryExhausted { .. } => {
                ErrorKind::Timeout
            }
            BrowserError::PageMismatch { .. }
            | BrowserError::InvalidSelectOption { .. }
            | BrowserError::AttributeNotFound { .. }
            | BrowserError::NotASelect { .. } => ErrorKind::Mismatch,
            BrowserError::NoMatchingNode { .. } | BrowserError::AmbiguousMatch { .. } => {
                ErrorKind::Ambiguity
            }
            BrowserError::ElementNotFound(_) => ErrorKind::NotFound,
            BrowserError::StaleElement(_) => ErrorKind::Stale,
            BrowserError::InvalidLocator(_)
            | BrowserError::InvalidDirection(_)
            | BrowserError::ReservedWindowName(_)
            | BrowserError::DuplicateWindowName(_)
            | BrowserError::WindowNotFound(_)
            | BrowserError::CloseMainWindow
            | BrowserError::NoActiveWindow
            | BrowserError::ContextUnavailable { .. }
            | BrowserError::NoWebview { .. }
            | BrowserError::MissingTreeLocator
            | BrowserError::UnsupportedTreeStrategy { .. }
            | BrowserError::InvalidSelector(_)
            | BrowserError::InvalidPath(_)
            | BrowserError::ConfigurationError(_)
            | BrowserError::Unsupported(_) => ErrorKind::Configuration,
            BrowserError::LaunchFailed(_)
            | BrowserError::NavigationFailed(_)
            | BrowserError::JavaScriptFailed(_)
            | BrowserError::DriverError(_)
            | BrowserError::SerializationError(_)
            | BrowserError::IoError(_)
            | BrowserError::AnyhowError(_) => ErrorKind::External,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}
