//! The registry owns the whole model and drives a parse.
//!
//! # Lifecycle
//!
//! ```text
//! declare ──► bind ──► resolve ──► refresh hooks ──► parse ──► load ──► store
//!  new_action     (clauses are      lenient engine     strict engine   params,    RecordStore,
//!  new_object      created as        pass, Context      pass, final     lists      parse hooks
//!  create_list     you declare)      identified         Context
//! ```
//!
//! Every builder method returns a `Result` and also records failures in the
//! registry; [`Registry::check`] reports them all and [`Registry::parse`]
//! refuses to run while any are pending.
//!
//! # Module Structure
//!
//! - [`builder`] - object, list and action builders plus parameter copies
//! - [`parse`] - context resolution, loading and record storage
//! - [`lookup`] - value getters and layered context lookup

mod builder;
mod lookup;
mod parse;

use std::collections::BTreeMap;

use strsim::levenshtein;

use crate::context::Context;
use crate::engine::CliEngine;
use crate::error::{CliError, ConfigError};
use crate::model::{Action, Object, Param, ParamDef, ValueType};
use crate::options::Opts;
use crate::values::RecordStore;

pub use builder::{ActionBuilder, ListBuilder, ObjectBuilder};
pub use parse::ParseOutcome;

/// Capture macros available to every list pattern and field format.
pub const DEFAULT_CAPTURES: &[(&str, &str)] = &[("w", r"[\w.-]+")];

/// Hook run after context resolution for one `(action, object)` pair. It may
/// declare new objects and flags (late binding).
pub type ContextRefresh<E> = Box<dyn FnMut(&mut Registry<E>, &Context) -> Result<(), CliError>>;

/// Hook run after records were stored; may add or change attributes.
pub type ObjectParseHook = Box<dyn FnMut(&str, &Context, &mut RecordStore) -> Result<(), CliError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Build,
    LateBind,
}

/// Owner of actions, objects, application flags and parsed values.
pub struct Registry<E: CliEngine> {
    engine: E,
    app_flags: BTreeMap<String, Param>,
    actions: BTreeMap<String, Action>,
    objects: BTreeMap<String, Object>,
    captures: BTreeMap<String, String>,
    values: RecordStore,
    errors: Vec<ConfigError>,
    phase: Phase,
    refresh_hooks: BTreeMap<String, BTreeMap<String, ContextRefresh<E>>>,
    parse_hooks: BTreeMap<String, Vec<ObjectParseHook>>,
}

impl<E: CliEngine> Registry<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            app_flags: BTreeMap::new(),
            actions: BTreeMap::new(),
            objects: BTreeMap::new(),
            captures: DEFAULT_CAPTURES
                .iter()
                .map(|(name, pattern)| (name.to_string(), pattern.to_string()))
                .collect(),
            values: RecordStore::new(),
            errors: Vec::new(),
            phase: Phase::Build,
            refresh_hooks: BTreeMap::new(),
            parse_hooks: BTreeMap::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn get_action(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }

    pub fn get_object(&self, name: &str) -> Option<&Object> {
        self.objects.get(name)
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }

    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    pub fn app_flag(&self, name: &str) -> Option<&Param> {
        self.app_flags.get(name)
    }

    /// Records stored by every parse so far.
    pub fn values(&self) -> &RecordStore {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut RecordStore {
        &mut self.values
    }

    /// Configuration errors recorded so far.
    pub fn errors(&self) -> &[ConfigError] {
        &self.errors
    }

    /// Fail with every recorded configuration error.
    pub fn check(&self) -> Result<(), CliError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(CliError::Configuration(self.errors.clone()))
        }
    }

    /// Register a capture macro usable as `#name` in list patterns and formats.
    pub fn add_field_list_capture(&mut self, name: &str, pattern: &str) -> &mut Self {
        self.captures.insert(name.to_string(), pattern.to_string());
        self
    }

    pub fn captures(&self) -> &BTreeMap<String, String> {
        &self.captures
    }

    /// Declare an application-wide flag.
    pub fn add_app_flag(
        &mut self,
        name: &str,
        value_type: ValueType,
        help: &str,
        opts: Opts,
    ) -> Result<(), ConfigError> {
        let result = if self.all_params().any(|p| p.name() == name) {
            Err(ConfigError::DuplicateParam {
                owner: "application".to_string(),
                param: name.to_string(),
            })
        } else {
            let def = ParamDef::new(name, value_type, help).with_opts(opts);
            let param = Param::bind_flag(def, &mut self.engine, None);
            self.app_flags.insert(name.to_string(), param);
            Ok(())
        };
        self.record(result)
    }

    /// Declare an action. `help_template` describes `<action> <object>`
    /// commands; `{object}` is replaced by the object description.
    pub fn new_action(
        &mut self,
        name: &str,
        help: &str,
        help_template: &str,
        internal_only: bool,
    ) -> Result<ActionBuilder<'_, E>, ConfigError> {
        let result = if self.actions.contains_key(name) {
            Err(ConfigError::DuplicateAction(name.to_string()))
        } else {
            let command = self.engine.create_command(name, help);
            let action = Action::new(name, help, help_template, command, internal_only);
            self.actions.insert(name.to_string(), action);
            tracing::debug!(action = name, internal_only, "action declared");
            Ok(())
        };
        self.record(result)?;
        Ok(ActionBuilder::new(self, name))
    }

    /// Builder for an existing action.
    pub fn action(&mut self, name: &str) -> Result<ActionBuilder<'_, E>, ConfigError> {
        let result = if self.actions.contains_key(name) {
            Ok(())
        } else {
            Err(ConfigError::UnknownAction(name.to_string()))
        };
        self.record(result)?;
        Ok(ActionBuilder::new(self, name))
    }

    /// Declare an object.
    pub fn new_object(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<ObjectBuilder<'_, E>, ConfigError> {
        let result = if self.objects.contains_key(name) {
            Err(ConfigError::DuplicateObject(name.to_string()))
        } else {
            self.objects
                .insert(name.to_string(), Object::new(name, description, false));
            tracing::debug!(object = name, "object declared");
            Ok(())
        };
        self.record(result)?;
        Ok(ObjectBuilder::new(self, name))
    }

    /// Declare an object that late-bound declarations may not extend.
    pub fn new_internal_object(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<ObjectBuilder<'_, E>, ConfigError> {
        let result = if self.objects.contains_key(name) {
            Err(ConfigError::DuplicateObject(name.to_string()))
        } else {
            self.objects
                .insert(name.to_string(), Object::new(name, description, true));
            Ok(())
        };
        self.record(result)?;
        Ok(ObjectBuilder::new(self, name))
    }

    /// Builder for an existing object. While refresh hooks run, internal
    /// objects are off limits.
    pub fn object(&mut self, name: &str) -> Result<ObjectBuilder<'_, E>, ConfigError> {
        let result = match self.objects.get(name) {
            None => Err(ConfigError::UnknownObject(name.to_string())),
            Some(object) if object.is_internal() && self.phase == Phase::LateBind => {
                Err(ConfigError::InternalObject(name.to_string()))
            }
            Some(_) => Ok(()),
        };
        self.record(result)?;
        Ok(ObjectBuilder::new(self, name))
    }

    /// Run `hook` whenever the resolved context uses `action`.
    pub fn on_context_refresh(
        &mut self,
        action: &str,
        object: &str,
        hook: impl FnMut(&mut Registry<E>, &Context) -> Result<(), CliError> + 'static,
    ) -> Result<(), ConfigError> {
        let result = if self.actions.contains_key(action) {
            self.refresh_hooks
                .entry(action.to_string())
                .or_default()
                .insert(object.to_string(), Box::new(hook));
            Ok(())
        } else {
            Err(ConfigError::UnknownAction(action.to_string()))
        };
        self.record(result)
    }

    /// Run `hook` after every parse that stored records.
    pub fn on_object_parsed(
        &mut self,
        object: &str,
        hook: impl FnMut(&str, &Context, &mut RecordStore) -> Result<(), CliError> + 'static,
    ) -> Result<(), ConfigError> {
        let result = if self.objects.contains_key(object) {
            self.parse_hooks
                .entry(object.to_string())
                .or_default()
                .push(Box::new(hook));
            Ok(())
        } else {
            Err(ConfigError::UnknownObject(object.to_string()))
        };
        self.record(result)
    }

    /// Keep a copy of a failure so `check` can report it later.
    fn record<T>(&mut self, result: Result<T, ConfigError>) -> Result<T, ConfigError> {
        if let Err(err) = &result {
            tracing::warn!(error = %err, "configuration error");
            self.errors.push(err.clone());
        }
        result
    }

    /// Application flags are global, so no command may declare a clause
    /// with the same name.
    fn ensure_not_app_flag(&self, name: &str) -> Result<(), ConfigError> {
        if self.app_flags.contains_key(name) {
            return Err(ConfigError::DuplicateParam {
                owner: "application".to_string(),
                param: name.to_string(),
            });
        }
        Ok(())
    }

    fn is_late_bind(&self) -> bool {
        self.phase == Phase::LateBind
    }

    fn suggest_action(&self, input: &str) -> Option<&str> {
        suggest_similar(input, self.actions.keys().map(String::as_str))
    }
}

/// Closest candidate within an edit distance of 2.
pub(crate) fn suggest_similar<'a>(
    input: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<&'a str> {
    let input_lower = input.to_lowercase();
    let mut best_match: Option<(&str, usize)> = None;

    for candidate in candidates {
        let distance = levenshtein(&input_lower, candidate);
        if distance <= 2 && best_match.is_none_or(|(_, best)| distance < best) {
            best_match = Some((candidate, distance));
        }
    }
    best_match.map(|(candidate, _)| candidate)
}
