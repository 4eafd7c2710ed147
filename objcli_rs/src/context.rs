//! Context identification.
//!
//! After the engine selected a chain of commands, the deepest one tells what
//! the invocation targets:
//!
//! ```text
//! NoContext ──► ActionOnly ──► ActionObject ──► ActionObjectList
//!  (no match)    create          create repo      create repos
//! ```
//!
//! Action commands are checked first, then object-actions; both return on
//! the first match. List commands are checked last and the scan does not
//! stop at a match, so the last matching list wins.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::engine::CommandId;
use crate::model::{Action, Object};

/// Which part of the model an invocation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContextState {
    NoContext,
    ActionOnly,
    ActionObject,
    ActionObjectList,
}

/// Resolved `(action, object?, list?)`. A list always comes with its object
/// and an object always with its action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Context {
    action: Option<String>,
    object: Option<String>,
    list: Option<String>,
}

impl Context {
    pub fn action_only(action: &str) -> Self {
        Self {
            action: Some(action.to_string()),
            ..Default::default()
        }
    }

    pub fn action_object(action: &str, object: &str) -> Self {
        Self {
            action: Some(action.to_string()),
            object: Some(object.to_string()),
            list: None,
        }
    }

    pub fn action_object_list(action: &str, object: &str, list: &str) -> Self {
        Self {
            action: Some(action.to_string()),
            object: Some(object.to_string()),
            list: Some(list.to_string()),
        }
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn object(&self) -> Option<&str> {
        self.object.as_deref()
    }

    pub fn list(&self) -> Option<&str> {
        self.list.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.action.is_none()
    }

    pub fn state(&self) -> ContextState {
        match (&self.action, &self.object, &self.list) {
            (None, _, _) => ContextState::NoContext,
            (Some(_), None, _) => ContextState::ActionOnly,
            (Some(_), Some(_), None) => ContextState::ActionObject,
            (Some(_), Some(_), Some(_)) => ContextState::ActionObjectList,
        }
    }
}

/// Map the selected command chain (root to leaf) to a [`Context`].
pub fn identify(
    selected: &[CommandId],
    actions: &BTreeMap<String, Action>,
    objects: &BTreeMap<String, Object>,
) -> Context {
    let Some(&command) = selected.last() else {
        return Context::default();
    };

    if let Some(action) = actions.values().find(|a| a.command() == command) {
        tracing::debug!(action = action.name(), "context: action");
        return Context::action_only(action.name());
    }

    for object in objects.values() {
        if let Some(oa) = object.actions().values().find(|oa| oa.command() == command) {
            tracing::debug!(action = oa.action(), object = object.name(), "context: object");
            return Context::action_object(oa.action(), object.name());
        }
    }

    let mut context = Context::default();
    for object in objects.values() {
        for list in object.lists().values() {
            for oa in list.actions_accepted().values() {
                if oa.command() == command {
                    context = Context::action_object_list(oa.action(), object.name(), list.name());
                }
            }
        }
    }
    if context.is_empty() {
        tracing::debug!(?command, "context: no match");
    } else {
        tracing::debug!(?context, "context: list");
    }
    context
}
