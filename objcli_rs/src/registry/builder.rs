//! Fluent declaration of objects, lists and action parameters.

use std::collections::BTreeSet;

use crate::engine::CliEngine;
use crate::error::ConfigError;
use crate::model::{
    Field, ListPattern, ListRef, ObjectAction, ObjectList, Param, ParamDef, ParamOrigin, Record,
    ValidateHook, ValueType, expand_captures,
};
use crate::options::Opts;

use super::Registry;

/// Builder over one declared object.
pub struct ObjectBuilder<'r, E: CliEngine> {
    reg: &'r mut Registry<E>,
    name: String,
}

impl<'r, E: CliEngine> ObjectBuilder<'r, E> {
    pub(super) fn new(reg: &'r mut Registry<E>, name: &str) -> Self {
        Self {
            reg,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a field. A `format` on the field must compile as a regex.
    pub fn add_field(&mut self, field: Field) -> Result<&mut Self, ConfigError> {
        let result = self.reg.add_object_field(&self.name, field, false);
        self.reg.record(result)?;
        Ok(self)
    }

    /// Declare the key field.
    pub fn add_key(&mut self, field: Field) -> Result<&mut Self, ConfigError> {
        let result = self.reg.add_object_field(&self.name, field, true);
        self.reg.record(result)?;
        Ok(self)
    }

    /// Attach actions, creating `<action> <object>` for each.
    pub fn define_actions(&mut self, actions: &[&str]) -> Result<&mut Self, ConfigError> {
        let result = self.reg.define_object_actions(&self.name, actions);
        self.reg.record(result)?;
        Ok(self)
    }

    /// Select which attached actions the next `add_flag`/`add_arg` target.
    /// An empty slice selects every attached action.
    pub fn on_actions(&mut self, actions: &[&str]) -> Result<&mut Self, ConfigError> {
        let result = match self.reg.objects.get_mut(&self.name) {
            Some(object) => object.select_actions(actions),
            None => Err(ConfigError::UnknownObject(self.name.clone())),
        };
        self.reg.record(result)?;
        Ok(self)
    }

    /// Expose `field` as a flag on every selected action.
    pub fn add_flag(&mut self, field: &str, opts: Opts) -> Result<&mut Self, ConfigError> {
        let result = self.reg.add_object_params(&self.name, field, opts, false);
        self.reg.record(result)?;
        Ok(self)
    }

    /// Expose `field` as a positional argument on every selected action.
    pub fn add_arg(&mut self, field: &str, opts: Opts) -> Result<&mut Self, ConfigError> {
        let result = self.reg.add_object_params(&self.name, field, opts, true);
        self.reg.record(result)?;
        Ok(self)
    }

    /// Declare a list. `pattern` may use capture macros such as `#w`.
    pub fn create_list(
        &mut self,
        name: &str,
        separator: char,
        pattern: &str,
        help: &str,
    ) -> Result<ListBuilder<'_, E>, ConfigError> {
        let result = self
            .reg
            .create_object_list(&self.name, name, separator, pattern, help);
        self.reg.record(result)?;
        Ok(ListBuilder::new(self.reg, &self.name, name))
    }

    /// Builder for an existing list.
    pub fn list(&mut self, name: &str) -> Result<ListBuilder<'_, E>, ConfigError> {
        let result = match self.reg.objects.get(&self.name) {
            Some(object) if object.list(name).is_some() => Ok(()),
            Some(_) => Err(ConfigError::UnknownList {
                object: self.name.clone(),
                list: name.to_string(),
            }),
            None => Err(ConfigError::UnknownObject(self.name.clone())),
        };
        self.reg.record(result)?;
        Ok(ListBuilder::new(self.reg, &self.name, name))
    }
}

/// Builder over one object list.
pub struct ListBuilder<'r, E: CliEngine> {
    reg: &'r mut Registry<E>,
    object: String,
    list: String,
}

impl<'r, E: CliEngine> ListBuilder<'r, E> {
    fn new(reg: &'r mut Registry<E>, object: &str, list: &str) -> Self {
        Self {
            reg,
            object: object.to_string(),
            list: list.to_string(),
        }
    }

    /// Map capture group `index` to `field`.
    pub fn field(&mut self, index: usize, field: &str) -> Result<&mut Self, ConfigError> {
        let result = self.reg.map_list_field(&self.object, &self.list, index, field);
        self.reg.record(result)?;
        Ok(self)
    }

    /// Create the plural `<action> <list>` command for each action.
    pub fn add_actions(&mut self, actions: &[&str]) -> Result<&mut Self, ConfigError> {
        let result = self.reg.add_list_actions(&self.object, &self.list, actions);
        self.reg.record(result)?;
        Ok(self)
    }

    /// Check or rewrite every extracted record.
    pub fn validate_with(
        &mut self,
        hook: impl Fn(&mut Record) -> Result<(), String> + 'static,
    ) -> &mut Self {
        if let Some(list) = self
            .reg
            .objects
            .get_mut(&self.object)
            .and_then(|o| o.list_mut(&self.list))
        {
            list.set_validate_hook(ValidateHook::new(hook));
        }
        self
    }
}

/// Builder over one action.
pub struct ActionBuilder<'r, E: CliEngine> {
    reg: &'r mut Registry<E>,
    name: String,
}

impl<'r, E: CliEngine> ActionBuilder<'r, E> {
    pub(super) fn new(reg: &'r mut Registry<E>, name: &str) -> Self {
        Self {
            reg,
            name: name.to_string(),
        }
    }

    /// Flag on the bare action command.
    pub fn add_flag(
        &mut self,
        name: &str,
        value_type: ValueType,
        help: &str,
        opts: Opts,
    ) -> Result<&mut Self, ConfigError> {
        let def = ParamDef::new(name, value_type, help).with_opts(opts);
        let result = self.reg.add_action_param(&self.name, def, false);
        self.reg.record(result)?;
        Ok(self)
    }

    /// Positional argument on the bare action command.
    pub fn add_arg(
        &mut self,
        name: &str,
        value_type: ValueType,
        help: &str,
        opts: Opts,
    ) -> Result<&mut Self, ConfigError> {
        let def = ParamDef::new(name, value_type, help).with_opts(opts);
        let result = self.reg.add_action_param(&self.name, def, true);
        self.reg.record(result)?;
        Ok(self)
    }
}

impl<E: CliEngine> Registry<E> {
    /// Copy one flag of `<object_action> <object>` onto the bare `action`,
    /// optionally renamed. Lookups through the copy still answer for the
    /// object's parameter.
    pub fn add_action_flag_from_object_action(
        &mut self,
        action: &str,
        object: &str,
        object_action: &str,
        param: &str,
        new_name: Option<&str>,
    ) -> Result<(), ConfigError> {
        let result = self.copy_object_param(action, object, object_action, param, new_name, false);
        self.record(result)
    }

    /// Same as [`Self::add_action_flag_from_object_action`], as a positional
    /// argument.
    pub fn add_action_arg_from_object_action(
        &mut self,
        action: &str,
        object: &str,
        object_action: &str,
        param: &str,
        new_name: Option<&str>,
    ) -> Result<(), ConfigError> {
        let result = self.copy_object_param(action, object, object_action, param, new_name, true);
        self.record(result)
    }

    /// Copy every flag of `<object_action> <object>` onto `action`. Positional
    /// arguments are left out.
    pub fn add_action_flags_from_object_action(
        &mut self,
        action: &str,
        object: &str,
        object_action: &str,
    ) -> Result<(), ConfigError> {
        let names: Result<Vec<String>, ConfigError> = self
            .objects
            .get(object)
            .ok_or_else(|| ConfigError::UnknownObject(object.to_string()))
            .and_then(|o| {
                o.action(object_action)
                    .ok_or_else(|| ConfigError::ActionNotDefined {
                        object: object.to_string(),
                        action: object_action.to_string(),
                    })
            })
            .map(|oa| {
                oa.params()
                    .values()
                    .filter(|p| !matches!(p, Param::Arg(_)))
                    .map(|p| p.name().to_string())
                    .collect()
            });
        let names = self.record(names)?;
        for name in names {
            self.add_action_flag_from_object_action(action, object, object_action, &name, None)?;
        }
        Ok(())
    }

    /// Expose an object list as a cumulative flag on the bare `action`.
    pub fn add_action_flag_from_object_list(
        &mut self,
        action: &str,
        object: &str,
        list: &str,
    ) -> Result<(), ConfigError> {
        let result = self.bind_action_list_flag(action, object, list);
        self.record(result)
    }

    fn add_object_field(&mut self, object: &str, field: Field, key: bool) -> Result<(), ConfigError> {
        if let Some(format) = &field.format {
            let expanded = expand_captures(format, &self.captures);
            regex::Regex::new(&format!("^(?:{expanded})$")).map_err(|e| {
                ConfigError::InvalidFormat {
                    object: object.to_string(),
                    field: field.name.clone(),
                    format: format.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        let target = self
            .objects
            .get_mut(object)
            .ok_or_else(|| ConfigError::UnknownObject(object.to_string()))?;
        if key {
            target.add_key(field)
        } else {
            target.add_field(field);
            Ok(())
        }
    }

    pub(super) fn define_object_actions(
        &mut self,
        object: &str,
        names: &[&str],
    ) -> Result<(), ConfigError> {
        let late = self.is_late_bind();
        let target = self
            .objects
            .get(object)
            .ok_or_else(|| ConfigError::UnknownObject(object.to_string()))?;
        if target.key().is_none() {
            return Err(ConfigError::MissingKey {
                object: object.to_string(),
            });
        }
        let description = target.description().to_string();

        for name in names {
            let Some(action) = self.actions.get(*name) else {
                match self.suggest_action(name) {
                    Some(hint) => tracing::warn!(
                        object,
                        action = name,
                        "unknown action ignored; did you mean '{hint}'?"
                    ),
                    None => tracing::warn!(object, action = name, "unknown action ignored"),
                }
                continue;
            };
            if late && action.is_internal_only() {
                return Err(ConfigError::InternalAction {
                    action: name.to_string(),
                    object: object.to_string(),
                });
            }
            let parent = action.command();
            let help = action.help_for(&description);

            let Some(target) = self.objects.get_mut(object) else {
                break;
            };
            if target.action(name).is_some() {
                tracing::debug!(object, action = name, "action already attached");
                continue;
            }
            let command = self.engine.create_subcommand(parent, object, &help);
            target.insert_action(ObjectAction::new(name, object, command, None));
            tracing::debug!(object, action = name, "object action attached");
        }
        Ok(())
    }

    fn add_object_params(
        &mut self,
        object: &str,
        field: &str,
        opts: Opts,
        positional: bool,
    ) -> Result<(), ConfigError> {
        self.ensure_not_app_flag(field)?;
        let Registry {
            objects, engine, ..
        } = self;
        let target = objects
            .get_mut(object)
            .ok_or_else(|| ConfigError::UnknownObject(object.to_string()))?;
        let field_def = target
            .field(field)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownField {
                object: object.to_string(),
                field: field.to_string(),
            })?;
        if target.selected().is_empty() {
            return Err(ConfigError::NoActionSelected {
                object: object.to_string(),
            });
        }

        for action in target.selected().to_vec() {
            let oa = target
                .action_mut(&action)
                .ok_or_else(|| ConfigError::ActionNotDefined {
                    object: object.to_string(),
                    action: action.clone(),
                })?;
            if oa.has_param(field) {
                tracing::debug!(object, action = %action, field, "parameter already declared");
                continue;
            }
            let def = ParamDef::from_field(&field_def, Some(&opts));
            let param = if positional {
                Param::bind_arg(def, engine, oa.command())
            } else {
                Param::bind_flag(def, engine, Some(oa.command()))
            };
            oa.insert_param(param)?;
        }
        Ok(())
    }

    fn create_object_list(
        &mut self,
        object: &str,
        name: &str,
        separator: char,
        pattern: &str,
        help: &str,
    ) -> Result<(), ConfigError> {
        let target = self
            .objects
            .get_mut(object)
            .ok_or_else(|| ConfigError::UnknownObject(object.to_string()))?;
        let key = target
            .key()
            .ok_or_else(|| ConfigError::MissingKey {
                object: object.to_string(),
            })?
            .to_string();
        if target.list(name).is_some() {
            return Err(ConfigError::DuplicateList {
                object: object.to_string(),
                list: name.to_string(),
            });
        }
        let compiled =
            ListPattern::compile(pattern, &self.captures).map_err(|reason| {
                ConfigError::InvalidPattern {
                    object: object.to_string(),
                    list: name.to_string(),
                    pattern: pattern.to_string(),
                    reason,
                }
            })?;
        let related: BTreeSet<String> = target.actions().keys().cloned().collect();
        tracing::debug!(object, list = name, regex = compiled.as_str(), "list declared");
        target.insert_list(ObjectList::new(
            object, name, separator, compiled, help, &key, related,
        ));
        Ok(())
    }

    fn map_list_field(
        &mut self,
        object: &str,
        list: &str,
        index: usize,
        field: &str,
    ) -> Result<(), ConfigError> {
        let target = self
            .objects
            .get_mut(object)
            .ok_or_else(|| ConfigError::UnknownObject(object.to_string()))?;
        let (fields, actions, lists) = target.split_for_lists();
        let target_list = lists.get_mut(list).ok_or_else(|| ConfigError::UnknownList {
            object: object.to_string(),
            list: list.to_string(),
        })?;
        target_list.field(index, field, fields, actions)
    }

    fn add_list_actions(
        &mut self,
        object: &str,
        list: &str,
        names: &[&str],
    ) -> Result<(), ConfigError> {
        self.ensure_not_app_flag(list)?;
        let Registry {
            objects,
            actions,
            engine,
            ..
        } = self;
        let target_list = objects
            .get_mut(object)
            .ok_or_else(|| ConfigError::UnknownObject(object.to_string()))?
            .list_mut(list)
            .ok_or_else(|| ConfigError::UnknownList {
                object: object.to_string(),
                list: list.to_string(),
            })?;

        for name in names {
            target_list.accepts(name)?;
            if target_list.actions_accepted().contains_key(*name) {
                continue;
            }
            let action = actions
                .get(*name)
                .ok_or_else(|| ConfigError::UnknownAction(name.to_string()))?;
            let command =
                engine.create_subcommand(action.command(), list, &action.help_for(target_list.help()));
            let mut oa = ObjectAction::new(name, object, command, Some(list));
            let def = ParamDef::new(list, ValueType::String, list_help(target_list));
            let list_ref = ListRef {
                object: object.to_string(),
                list: list.to_string(),
            };
            oa.insert_param(Param::bind_list(def, list_ref, engine, command, true))?;
            target_list.insert_accepted(oa);
            tracing::debug!(object, list, action = name, "list action attached");
        }
        Ok(())
    }

    fn add_action_param(
        &mut self,
        action: &str,
        def: ParamDef,
        positional: bool,
    ) -> Result<(), ConfigError> {
        self.ensure_not_app_flag(&def.name)?;
        let target = self
            .actions
            .get_mut(action)
            .ok_or_else(|| ConfigError::UnknownAction(action.to_string()))?;
        if target.param(&def.name).is_some() {
            return Err(ConfigError::DuplicateParam {
                owner: action.to_string(),
                param: def.name,
            });
        }
        let param = if positional {
            Param::bind_arg(def, &mut self.engine, target.command())
        } else {
            Param::bind_flag(def, &mut self.engine, Some(target.command()))
        };
        target.insert_param(param)
    }

    fn copy_object_param(
        &mut self,
        action: &str,
        object: &str,
        object_action: &str,
        param: &str,
        new_name: Option<&str>,
        positional: bool,
    ) -> Result<(), ConfigError> {
        self.ensure_not_app_flag(new_name.unwrap_or(param))?;
        let Registry {
            objects,
            actions,
            engine,
            ..
        } = self;
        let source_object = objects
            .get(object)
            .ok_or_else(|| ConfigError::UnknownObject(object.to_string()))?;
        let source = source_object
            .action(object_action)
            .ok_or_else(|| ConfigError::ActionNotDefined {
                object: object.to_string(),
                action: object_action.to_string(),
            })?
            .param(param)
            .ok_or_else(|| ConfigError::UnknownParam {
                action: format!("{object_action} {object}"),
                param: param.to_string(),
            })?;
        let target = actions
            .get_mut(action)
            .ok_or_else(|| ConfigError::UnknownAction(action.to_string()))?;

        let name = new_name.unwrap_or(param);
        if target.param(name).is_some() {
            return Err(ConfigError::DuplicateParam {
                owner: action.to_string(),
                param: name.to_string(),
            });
        }
        let origin = ParamOrigin {
            object: object.to_string(),
            param: param.to_string(),
        };
        let copy = if positional {
            source.copy_to_arg(name, Some(origin), engine, target.command())
        } else {
            source.copy_to_flag(name, Some(origin), engine, Some(target.command()))
        };
        tracing::debug!(action, object, param, name, "parameter copied to action");
        target.insert_param(copy)
    }

    fn bind_action_list_flag(
        &mut self,
        action: &str,
        object: &str,
        list: &str,
    ) -> Result<(), ConfigError> {
        self.ensure_not_app_flag(list)?;
        let Registry {
            objects,
            actions,
            engine,
            ..
        } = self;
        let source = objects
            .get(object)
            .ok_or_else(|| ConfigError::UnknownObject(object.to_string()))?
            .list(list)
            .ok_or_else(|| ConfigError::UnknownList {
                object: object.to_string(),
                list: list.to_string(),
            })?;
        let target = actions
            .get_mut(action)
            .ok_or_else(|| ConfigError::UnknownAction(action.to_string()))?;
        source.accepts(action)?;
        if target.param(list).is_some() {
            return Err(ConfigError::DuplicateParam {
                owner: action.to_string(),
                param: list.to_string(),
            });
        }
        let mut def = ParamDef::new(list, ValueType::String, list_help(source));
        def.origin = Some(ParamOrigin {
            object: object.to_string(),
            param: list.to_string(),
        });
        let list_ref = ListRef {
            object: object.to_string(),
            list: list.to_string(),
        };
        let command = target.command();
        target.insert_param(Param::bind_list(def, list_ref, engine, command, false))
    }
}

fn list_help(list: &ObjectList) -> String {
    format!(
        "{} ('{}' separated values of '{}')",
        list.help(),
        list.separator(),
        list.pattern().source()
    )
}
