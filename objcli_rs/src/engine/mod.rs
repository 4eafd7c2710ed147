//! Boundary to the command-line engine.
//!
//! The model never tokenizes `argv` itself. It declares commands, flags and
//! arguments through [`CliEngine`] and later reads a [`ParseResult`] back:
//! the chain of selected commands plus every clause value the engine saw.
//!
//! Two engines ship with the crate:
//!
//! - [`ClapEngine`] - builds a `clap::Command` tree from the declarations.
//! - [`MockEngine`] - in-memory double; tests set the selected command chain
//!   and clause values directly.
//!
//! Handles ([`CommandId`], [`FlagId`], [`ArgId`]) are plain indexes into the
//! engine's declaration arena, so the model can store them without borrowing
//! the engine.

mod clap_engine;
mod mock;

use std::collections::HashMap;

use serde::Serialize;

use crate::error::CliError;
use crate::model::ValueType;
use crate::options::Opts;

pub use clap_engine::ClapEngine;
pub use mock::MockEngine;

/// Handle to a declared command clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(usize);

/// Handle to a declared flag clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlagId(usize);

/// Handle to a declared positional argument clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArgId(usize);

/// Where a clause value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    CommandLine,
    Envar,
    Default,
}

/// Everything the engine needs to create a flag or argument clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseSpec {
    pub name: String,
    pub help: String,
    pub value_type: ValueType,
    pub opts: Opts,
    /// Every occurrence is kept instead of the last one (list flags).
    pub cumulative: bool,
}

impl ClauseSpec {
    pub fn new(name: impl Into<String>, help: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value_type,
            opts: Opts::default(),
            cumulative: false,
        }
    }

    pub fn with_opts(mut self, opts: Opts) -> Self {
        self.opts = opts;
        self
    }

    pub fn cumulative(mut self) -> Self {
        self.cumulative = true;
        self
    }
}

/// Values observed for one clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseValue {
    pub values: Vec<String>,
    pub source: ValueSource,
}

impl ClauseValue {
    pub fn new(values: Vec<String>, source: ValueSource) -> Self {
        Self { values, source }
    }

    pub fn single(value: impl Into<String>, source: ValueSource) -> Self {
        Self {
            values: vec![value.into()],
            source,
        }
    }

    /// Last occurrence; the effective value of a non-cumulative clause.
    pub fn last(&self) -> Option<&str> {
        self.values.last().map(String::as_str)
    }

    /// Supplied by the user (command line or environment), not defaulted.
    pub fn is_explicit(&self) -> bool {
        self.source != ValueSource::Default
    }
}

/// Outcome of an engine pass over `argv`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    selected: Vec<CommandId>,
    command_name: String,
    flags: HashMap<FlagId, ClauseValue>,
    args: HashMap<ArgId, ClauseValue>,
}

impl ParseResult {
    pub fn new(selected: Vec<CommandId>, command_name: impl Into<String>) -> Self {
        Self {
            selected,
            command_name: command_name.into(),
            ..Default::default()
        }
    }

    pub fn set_flag(&mut self, id: FlagId, value: ClauseValue) {
        self.flags.insert(id, value);
    }

    pub fn set_arg(&mut self, id: ArgId, value: ClauseValue) {
        self.args.insert(id, value);
    }

    /// Selected commands, ordered root to leaf.
    pub fn selected_commands(&self) -> &[CommandId] {
        &self.selected
    }

    /// Space-joined names of the selected chain, e.g. `create repos`.
    pub fn command_name(&self) -> &str {
        &self.command_name
    }

    pub fn flag(&self, id: FlagId) -> Option<&ClauseValue> {
        self.flags.get(&id)
    }

    pub fn arg(&self, id: ArgId) -> Option<&ClauseValue> {
        self.args.get(&id)
    }
}

/// The capability the model needs from a command-line engine.
pub trait CliEngine {
    /// Create a top-level command.
    fn create_command(&mut self, name: &str, help: &str) -> CommandId;

    /// Create a command nested under `parent`.
    fn create_subcommand(&mut self, parent: CommandId, name: &str, help: &str) -> CommandId;

    /// Create a flag on `owner`, or an application-wide flag when `owner` is `None`.
    fn create_flag(&mut self, owner: Option<CommandId>, spec: &ClauseSpec) -> FlagId;

    /// Create a positional argument on `owner`.
    fn create_arg(&mut self, owner: CommandId, spec: &ClauseSpec) -> ArgId;

    /// Lenient pass used to identify the context: missing required clauses
    /// and unknown tokens are tolerated.
    fn resolve(&mut self, argv: &[String]) -> Result<ParseResult, CliError>;

    /// Strict pass producing the final values.
    fn parse(&mut self, argv: &[String]) -> Result<ParseResult, CliError>;
}

#[derive(Debug, Clone)]
pub(crate) struct CommandDecl {
    pub name: String,
    pub help: String,
    pub flags: Vec<FlagId>,
    pub args: Vec<ArgId>,
    pub children: Vec<CommandId>,
}

#[derive(Debug, Clone)]
pub(crate) struct ClauseDecl {
    pub spec: ClauseSpec,
}

/// Declaration arena shared by both engines.
#[derive(Debug, Clone, Default)]
pub(crate) struct Declarations {
    pub commands: Vec<CommandDecl>,
    pub flags: Vec<ClauseDecl>,
    pub args: Vec<ClauseDecl>,
    pub roots: Vec<CommandId>,
    pub app_flags: Vec<FlagId>,
}

impl Declarations {
    pub fn add_command(&mut self, parent: Option<CommandId>, name: &str, help: &str) -> CommandId {
        let id = CommandId(self.commands.len());
        self.commands.push(CommandDecl {
            name: name.to_string(),
            help: help.to_string(),
            flags: Vec::new(),
            args: Vec::new(),
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.commands[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn add_flag(&mut self, owner: Option<CommandId>, spec: &ClauseSpec) -> FlagId {
        let id = FlagId(self.flags.len());
        self.flags.push(ClauseDecl { spec: spec.clone() });
        match owner {
            Some(owner) => self.commands[owner.0].flags.push(id),
            None => self.app_flags.push(id),
        }
        id
    }

    pub fn add_arg(&mut self, owner: CommandId, spec: &ClauseSpec) -> ArgId {
        let id = ArgId(self.args.len());
        self.args.push(ClauseDecl { spec: spec.clone() });
        self.commands[owner.0].args.push(id);
        id
    }

    pub fn command(&self, id: CommandId) -> &CommandDecl {
        &self.commands[id.0]
    }

    pub fn flag(&self, id: FlagId) -> &ClauseDecl {
        &self.flags[id.0]
    }

    pub fn arg(&self, id: ArgId) -> &ClauseDecl {
        &self.args[id.0]
    }

    /// Find the command called `name` directly under `parent` (or at the top).
    pub fn child(&self, parent: Option<CommandId>, name: &str) -> Option<CommandId> {
        let candidates = match parent {
            Some(parent) => &self.commands[parent.0].children,
            None => &self.roots,
        };
        candidates
            .iter()
            .copied()
            .find(|id| self.commands[id.0].name == name)
    }

    pub fn chain_name(&self, chain: &[CommandId]) -> String {
        chain
            .iter()
            .map(|id| self.commands[id.0].name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
