//! Actions: the verbs of the command line.

use std::collections::BTreeMap;

use crate::engine::CommandId;
use crate::error::ConfigError;

use super::param::Param;

/// Placeholder replaced by the object (or list) description in help templates.
pub const HELP_PLACEHOLDER: &str = "{object}";

/// A verb-level command, usable alone or combined with objects.
#[derive(Debug)]
pub struct Action {
    name: String,
    help: String,
    help_template: String,
    command: CommandId,
    params: BTreeMap<String, Param>,
    internal_only: bool,
}

impl Action {
    pub(crate) fn new(
        name: &str,
        help: &str,
        help_template: &str,
        command: CommandId,
        internal_only: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            help_template: help_template.to_string(),
            command,
            params: BTreeMap::new(),
            internal_only,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn help_template(&self) -> &str {
        &self.help_template
    }

    pub fn command(&self) -> CommandId {
        self.command
    }

    /// Internal actions cannot be attached to objects declared late.
    pub fn is_internal_only(&self) -> bool {
        self.internal_only
    }

    /// Help text for `<action> <subject>`.
    pub fn help_for(&self, subject: &str) -> String {
        if self.help_template.contains(HELP_PLACEHOLDER) {
            self.help_template.replace(HELP_PLACEHOLDER, subject)
        } else {
            format!("{} {}", self.help_template, subject)
        }
    }

    pub fn params(&self) -> &BTreeMap<String, Param> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.get(name)
    }

    pub(crate) fn params_mut(&mut self) -> impl Iterator<Item = &mut Param> {
        self.params.values_mut()
    }

    /// Parameter answering for `param` of `object` on this action.
    pub fn param_for(&self, object: &str, param: &str) -> Option<&Param> {
        self.params.values().find(|p| p.answers_for(object, param))
    }

    pub(crate) fn insert_param(&mut self, param: Param) -> Result<(), ConfigError> {
        if self.params.contains_key(param.name()) {
            return Err(ConfigError::DuplicateParam {
                owner: self.name.clone(),
                param: param.name().to_string(),
            });
        }
        self.params.insert(param.name().to_string(), param);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CliEngine, MockEngine};
    use crate::model::{ParamDef, ValueType};

    #[test]
    fn help_template_placeholder() {
        let mut engine = MockEngine::new();
        let command = engine.create_command("create", "Create");
        let action = Action::new("create", "Create things", "Create {object}", command, false);
        assert_eq!(action.help_for("a repository"), "Create a repository");

        let plain = Action::new("update", "Update", "Update", command, false);
        assert_eq!(plain.help_for("repos"), "Update repos");
    }

    #[test]
    fn duplicate_param_is_rejected() {
        let mut engine = MockEngine::new();
        let command = engine.create_command("create", "Create");
        let mut action = Action::new("create", "Create", "Create {object}", command, false);
        let def = ParamDef::new("debug", ValueType::Bool, "");
        action
            .insert_param(Param::bind_flag(def.clone(), &mut engine, Some(command)))
            .expect("first");
        let err = action
            .insert_param(Param::bind_flag(def, &mut engine, Some(command)))
            .expect_err("duplicate");
        assert!(matches!(err, ConfigError::DuplicateParam { .. }));
    }
}
