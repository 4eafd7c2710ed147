//! Error types for the command-object model.
//!
//! Three families exist:
//!
//! - [`ConfigError`] - declaration mistakes found while building the model.
//!   Every builder returns them and the registry also accumulates them, so
//!   [`crate::Registry::check`] can refuse to parse a broken model.
//! - [`ValueError`] - a supplied value could not be turned into records
//!   (list segment mismatch, hook rejection, field format violation).
//! - [`CliError`] - everything a registry operation can surface, wrapping the
//!   two above plus engine and model-file failures.
//!
//! Lookup misses (unknown key or parameter) are not errors: getters return
//! `Ok(None)` for them.

use std::path::PathBuf;

use thiserror::Error;

/// Declaration error raised while building objects, actions, fields and lists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("object '{0}' is already declared")]
    DuplicateObject(String),

    #[error("action '{0}' is already declared")]
    DuplicateAction(String),

    #[error("unknown object '{0}'")]
    UnknownObject(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("object '{object}' has no key field; declare one before defining actions")]
    MissingKey { object: String },

    #[error("object '{object}' already has key field '{key}'")]
    DuplicateKey { object: String, key: String },

    #[error("object '{object}' already declares '{field}' as a non-key field")]
    FieldConflict { object: String, field: String },

    #[error("object '{object}' has no field '{field}'")]
    UnknownField { object: String, field: String },

    #[error("action '{action}' is not defined on object '{object}'")]
    ActionNotDefined { object: String, action: String },

    #[error("object '{object}': no actions selected; call on_actions() first")]
    NoActionSelected { object: String },

    #[error("action '{action}' has no parameter '{param}'")]
    UnknownParam { action: String, param: String },

    #[error("parameter '{param}' is already declared on '{owner}'")]
    DuplicateParam { owner: String, param: String },

    #[error("argument '{param}' needs a command to attach to")]
    ArgumentWithoutCommand { param: String },

    #[error("object '{object}' has no list '{list}'")]
    UnknownList { object: String, list: String },

    #[error("object '{object}' already has a list '{list}'")]
    DuplicateList { object: String, list: String },

    #[error("list '{object}/{list}': invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        object: String,
        list: String,
        pattern: String,
        reason: String,
    },

    #[error("field '{object}/{field}': invalid format '{format}': {reason}")]
    InvalidFormat {
        object: String,
        field: String,
        format: String,
        reason: String,
    },

    #[error(
        "list '{object}/{list}': capture index {index} is out of range (valid: 1..{max})",
        max = .max_groups - 1
    )]
    CaptureIndexOutOfRange {
        object: String,
        list: String,
        index: usize,
        max_groups: usize,
    },

    #[error(
        "list '{object}/{list}': no single action exposes all captured fields (last field: '{field}')"
    )]
    NoCommonAction {
        object: String,
        list: String,
        field: String,
    },

    #[error("list '{object}/{list}' is invalid and cannot accept actions")]
    InvalidList { object: String, list: String },

    #[error("list '{object}/{list}' cannot be used with action '{action}'")]
    ActionNotAccepted {
        object: String,
        list: String,
        action: String,
    },

    #[error("action '{action}' is internal and cannot be extended with object '{object}'")]
    InternalAction { action: String, object: String },

    #[error("object '{0}' is internal and cannot be extended")]
    InternalObject(String),
}

/// A value supplied on the command line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error(
        "list '{list}': segment {position} '{segment}' does not match pattern '{pattern}'"
    )]
    SegmentMismatch {
        list: String,
        position: usize,
        segment: String,
        pattern: String,
    },

    #[error("list '{list}': segment {position} '{segment}' rejected: {reason}")]
    RecordRejected {
        list: String,
        position: usize,
        segment: String,
        reason: String,
    },

    #[error("{object} '{key}': field '{field}' value '{value}' does not match '{format}'")]
    FieldFormat {
        object: String,
        key: String,
        field: String,
        value: String,
        format: String,
    },
}

/// What kind of outcome the engine reported instead of a parse result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// Malformed command line.
    Usage,
    /// The user asked for help; the message is the rendered help text.
    Help,
    /// The user asked for the version string.
    Version,
}

/// Any error a registry operation can surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{} configuration error(s): {}", .0.len(), join_errors(.0))]
    Configuration(Vec<ConfigError>),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("{message}")]
    Engine {
        kind: EngineErrorKind,
        message: String,
    },

    #[error("failed to read model file '{}': {reason}", .path.display())]
    ModelRead { path: PathBuf, reason: String },

    #[error("failed to parse model from {location}: {reason}")]
    ModelParse { location: String, reason: String },

    #[error("hook failed: {0}")]
    Hook(String),
}

impl CliError {
    /// Build an engine error of the given kind.
    pub fn engine(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        CliError::Engine {
            kind,
            message: message.into(),
        }
    }

    /// True for help/version requests, which callers usually print and exit 0.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            CliError::Engine {
                kind: EngineErrorKind::Help | EngineErrorKind::Version,
                ..
            }
        )
    }
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
