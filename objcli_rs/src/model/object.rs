//! Objects (nouns) and their per-action bindings.

use std::collections::BTreeMap;

use crate::engine::CommandId;
use crate::error::ConfigError;

use super::field::Field;
use super::list::ObjectList;
use super::param::Param;

/// One action applied to one object: `<action> <object>`, or
/// `<action> <list>` for the plural form created by a list.
#[derive(Debug)]
pub struct ObjectAction {
    action: String,
    object: String,
    command: CommandId,
    params: BTreeMap<String, Param>,
    list: Option<String>,
}

impl ObjectAction {
    pub(crate) fn new(action: &str, object: &str, command: CommandId, list: Option<&str>) -> Self {
        Self {
            action: action.to_string(),
            object: object.to_string(),
            command,
            params: BTreeMap::new(),
            list: list.map(str::to_string),
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn command(&self) -> CommandId {
        self.command
    }

    /// Name of the list for plural object-actions.
    pub fn list(&self) -> Option<&str> {
        self.list.as_deref()
    }

    pub fn params(&self) -> &BTreeMap<String, Param> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.get(name)
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub(crate) fn params_mut(&mut self) -> impl Iterator<Item = &mut Param> {
        self.params.values_mut()
    }

    pub(crate) fn insert_param(&mut self, param: Param) -> Result<(), ConfigError> {
        if self.params.contains_key(param.name()) {
            return Err(ConfigError::DuplicateParam {
                owner: format!("{} {}", self.action, self.object),
                param: param.name().to_string(),
            });
        }
        self.params.insert(param.name().to_string(), param);
        Ok(())
    }
}

/// A noun the application manages.
#[derive(Debug)]
pub struct Object {
    name: String,
    description: String,
    fields: BTreeMap<String, Field>,
    key: Option<String>,
    actions: BTreeMap<String, ObjectAction>,
    lists: BTreeMap<String, ObjectList>,
    selected: Vec<String>,
    internal: bool,
}

impl Object {
    pub(crate) fn new(name: &str, description: &str, internal: bool) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            fields: BTreeMap::new(),
            key: None,
            actions: BTreeMap::new(),
            lists: BTreeMap::new(),
            selected: Vec::new(),
            internal,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn fields(&self) -> &BTreeMap<String, Field> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Name of the key field, once declared.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn actions(&self) -> &BTreeMap<String, ObjectAction> {
        &self.actions
    }

    pub fn action(&self, name: &str) -> Option<&ObjectAction> {
        self.actions.get(name)
    }

    pub fn lists(&self) -> &BTreeMap<String, ObjectList> {
        &self.lists
    }

    pub fn list(&self, name: &str) -> Option<&ObjectList> {
        self.lists.get(name)
    }

    /// Actions the next `add_flag`/`add_arg` apply to.
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Declare a field. Re-declaring an existing name is a no-op; returns
    /// whether the field was added.
    pub fn add_field(&mut self, mut field: Field) -> bool {
        if self.fields.contains_key(&field.name) {
            tracing::debug!(object = %self.name, field = %field.name, "field already declared");
            return false;
        }
        field.key = false;
        self.fields.insert(field.name.clone(), field);
        true
    }

    /// Declare the key field. Only one key per object.
    pub fn add_key(&mut self, mut field: Field) -> Result<(), ConfigError> {
        if let Some(key) = &self.key {
            return Err(ConfigError::DuplicateKey {
                object: self.name.clone(),
                key: key.clone(),
            });
        }
        if self.fields.contains_key(&field.name) {
            return Err(ConfigError::FieldConflict {
                object: self.name.clone(),
                field: field.name,
            });
        }
        field.key = true;
        self.key = Some(field.name.clone());
        self.fields.insert(field.name.clone(), field);
        Ok(())
    }

    /// Select the working subset of attached actions; empty selects all.
    pub fn select_actions(&mut self, names: &[&str]) -> Result<(), ConfigError> {
        if names.is_empty() {
            self.selected = self.actions.keys().cloned().collect();
            return Ok(());
        }
        if let Some(missing) = names.iter().find(|n| !self.actions.contains_key(**n)) {
            return Err(ConfigError::ActionNotDefined {
                object: self.name.clone(),
                action: missing.to_string(),
            });
        }
        self.selected = names.iter().map(|n| n.to_string()).collect();
        Ok(())
    }

    pub(crate) fn insert_action(&mut self, object_action: ObjectAction) {
        self.actions
            .insert(object_action.action().to_string(), object_action);
    }

    pub(crate) fn action_mut(&mut self, name: &str) -> Option<&mut ObjectAction> {
        self.actions.get_mut(name)
    }

    pub(crate) fn actions_mut(&mut self) -> impl Iterator<Item = &mut ObjectAction> {
        self.actions.values_mut()
    }

    pub(crate) fn insert_list(&mut self, list: ObjectList) {
        self.lists.insert(list.name().to_string(), list);
    }

    pub(crate) fn list_mut(&mut self, name: &str) -> Option<&mut ObjectList> {
        self.lists.get_mut(name)
    }

    pub(crate) fn lists_mut(&mut self) -> impl Iterator<Item = &mut ObjectList> {
        self.lists.values_mut()
    }

    /// Split borrow: declarations read-only, lists mutable.
    pub(crate) fn split_for_lists(
        &mut self,
    ) -> (
        &BTreeMap<String, Field>,
        &BTreeMap<String, ObjectAction>,
        &mut BTreeMap<String, ObjectList>,
    ) {
        (&self.fields, &self.actions, &mut self.lists)
    }
}
