use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("NetBox request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("NetBox returned HTTP {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode NetBox response from {endpoint}: {source} (body: {body})")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("NetBox returned an unusable next link for {endpoint}: {link} ({reason})")]
    Link {
        endpoint: String,
        link: String,
        reason: String,
    },

    #[error("NetBox pagination for {endpoint} exceeded {pages} pages")]
    Pagination { endpoint: String, pages: usize },

    #[error("Failed to persist snapshot to {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Fetch cycle aborted by unexpected fault: {0}")]
    RuntimeFault(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExporterError {
    /// True for failures talking to the inventory API. These abort the
    /// current fetch cycle only and are retried on the next tick.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Status { .. }
                | Self::Decode { .. }
                | Self::Link { .. }
                | Self::Pagination { .. }
        )
    }
}

/// A single exposition line that could not be understood.
///
/// Line numbers are 1-based, matching what an operator sees in the snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Exposition parse error on line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("invalid metric name")]
    InvalidName,
    #[error("invalid label name")]
    InvalidLabelName,
    #[error("duplicate label name '{0}'")]
    DuplicateLabelName(String),
    #[error("expected '=' after label name")]
    MissingEquals,
    #[error("label value must be a quoted string")]
    UnquotedLabelValue,
    #[error("unterminated label value")]
    UnterminatedLabelValue,
    #[error("invalid escape sequence in label value")]
    InvalidEscape,
    #[error("unterminated label clause")]
    UnterminatedLabels,
    #[error("missing sample value")]
    MissingValue,
    #[error("invalid sample value '{0}'")]
    InvalidValue(String),
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
    #[error("unexpected trailing text '{0}'")]
    TrailingText(String),
    #[error("label set does not match family '{family}' label names")]
    LabelMismatch { family: String },
    #[error("duplicate sample for family '{family}'")]
    DuplicateSample { family: String },
}

pub type Result<T> = std::result::Result<T, ExporterError>;
