//! Options attached to parameters and fields.
//!
//! `Opts` is pure data handed to the engine when a clause is created. Fields
//! carry their own `Opts`; a flag declared from a field starts from the field
//! options and merges whatever the declaration adds on top.

use serde::Deserialize;

/// Clause options: required, default value, environment variable, short name
/// and visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Opts {
    /// The clause must be supplied (strict parse only)
    pub required: bool,

    /// Value used when the clause is absent
    pub default: Option<String>,

    /// Environment variable consulted when the clause is absent
    pub envar: Option<String>,

    /// Single-character alias (flags only)
    pub short: Option<char>,

    /// Hide the clause from help output
    pub hidden: bool,
}

impl Opts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn envar(mut self, name: impl Into<String>) -> Self {
        self.envar = Some(name.into());
        self
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Overlay `other` on top of `self`. Set values in `other` win; booleans
    /// are or-ed so a merge can never un-require a clause.
    pub fn merge(&mut self, other: &Opts) {
        self.required |= other.required;
        self.hidden |= other.hidden;
        if other.default.is_some() {
            self.default.clone_from(&other.default);
        }
        if other.envar.is_some() {
            self.envar.clone_from(&other.envar);
        }
        if other.short.is_some() {
            self.short = other.short;
        }
    }

    /// Return a merged copy, leaving `self` untouched.
    pub fn merged_with(&self, other: Option<&Opts>) -> Opts {
        let mut merged = self.clone();
        if let Some(other) = other {
            merged.merge(other);
        }
        merged
    }
}
