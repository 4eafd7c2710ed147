//! Object fields.

use serde::{Deserialize, Serialize};

use crate::options::Opts;

/// Value type of a field or parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Bool,
}

/// A named, typed attribute of an object. At most one field per object is the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub help: String,
    pub value_type: ValueType,
    pub key: bool,
    pub opts: Opts,
    /// Regex fragment (capture macros allowed) values must fully match.
    pub format: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, value_type: ValueType, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value_type,
            key: false,
            opts: Opts::default(),
            format: None,
        }
    }

    pub fn string(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self::new(name, ValueType::String, help)
    }

    pub fn bool(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self::new(name, ValueType::Bool, help)
    }

    pub fn with_opts(mut self, opts: Opts) -> Self {
        self.opts = opts;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}
