//! Model files.
//!
//! A whole model can be declared in TOML and applied to a [`Registry`]:
//!
//! ```toml
//! [captures]
//! ft = "[^,]*"
//!
//! [[app_flags]]
//! name = "debug"
//! type = "bool"
//!
//! [[actions]]
//! name = "create"
//! help = "Create things"
//! help_template = "Create {object}"
//!
//! [[objects]]
//! name = "repo"
//! description = "a repository"
//! key = { name = "name", help = "Repository name" }
//! actions = ["create"]
//! fields = [{ name = "title", help = "Title" }]
//! flags = [{ field = "name" }, { field = "title" }]
//!
//! [[objects.lists]]
//! name = "repos"
//! pattern = "#w(:#ft)?"
//! fields = [{ index = 1, field = "name" }, { index = 3, field = "title" }]
//! actions = ["create"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::engine::CliEngine;
use crate::error::CliError;
use crate::model::{DEFAULT_SEPARATOR, Field, ValueType};
use crate::options::Opts;
use crate::registry::Registry;

/// Root of a model file.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Application name shown in help output.
    pub name: Option<String>,
    pub about: String,
    /// Capture macros, usable as `#name` in patterns and formats.
    pub captures: BTreeMap<String, String>,
    pub app_flags: Vec<ParamConfig>,
    pub actions: Vec<ActionConfig>,
    pub objects: Vec<ObjectConfig>,
    /// Object parameters copied onto bare actions.
    pub copies: Vec<CopyConfig>,
    /// Object lists exposed as flags on bare actions.
    pub list_flags: Vec<ListFlagConfig>,
}

/// A named parameter not tied to a field.
#[derive(Debug, Clone, Deserialize)]
pub struct ParamConfig {
    pub name: String,
    #[serde(default)]
    pub help: String,
    #[serde(default, rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub positional: bool,
    #[serde(flatten)]
    pub opts: Opts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    pub name: String,
    #[serde(default)]
    pub help: String,
    /// Help for `<action> <object>`; `{object}` is the object description.
    #[serde(default)]
    pub help_template: Option<String>,
    #[serde(default)]
    pub internal_only: bool,
    #[serde(default)]
    pub params: Vec<ParamConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default)]
    pub help: String,
    #[serde(default, rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(flatten)]
    pub opts: Opts,
}

impl FieldConfig {
    fn to_field(&self) -> Field {
        let mut field =
            Field::new(self.name.clone(), self.value_type, self.help.clone()).with_opts(self.opts.clone());
        field.format = self.format.clone();
        field
    }
}

/// A field exposed on some of the object's actions.
#[derive(Debug, Clone, Deserialize)]
pub struct FlagConfig {
    pub field: String,
    /// Subset of attached actions; empty means all of them.
    #[serde(default)]
    pub on: Vec<String>,
    #[serde(default)]
    pub positional: bool,
    #[serde(flatten)]
    pub opts: Opts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListFieldConfig {
    pub index: usize,
    pub field: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListConfig {
    pub name: String,
    #[serde(default = "default_separator")]
    pub separator: char,
    pub pattern: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub fields: Vec<ListFieldConfig>,
    #[serde(default)]
    pub actions: Vec<String>,
}

fn default_separator() -> char {
    DEFAULT_SEPARATOR
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub internal: bool,
    pub key: Option<FieldConfig>,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub flags: Vec<FlagConfig>,
    #[serde(default)]
    pub lists: Vec<ListConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CopyConfig {
    pub action: String,
    pub object: String,
    /// Object-action to copy from; defaults to `action`.
    #[serde(default)]
    pub from: Option<String>,
    /// Single parameter to copy; every flag when absent.
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub rename: Option<String>,
    #[serde(default)]
    pub positional: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListFlagConfig {
    pub action: String,
    pub object: String,
    pub list: String,
}

impl ModelConfig {
    pub fn from_toml_str(content: &str, location: &str) -> Result<Self, CliError> {
        toml::from_str(content).map_err(|e| CliError::ModelParse {
            location: location.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load a model from a file. Unlike optional settings, a model is
    /// required: a missing or invalid file is an error.
    pub fn load_from_path(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::ModelRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Declare everything on `registry`, in file order: captures, app
    /// flags, actions, objects, then copies.
    ///
    /// Declaration errors are also recorded on the registry, so the first
    /// one is returned and the rest show up in [`Registry::check`].
    pub fn apply<E: CliEngine>(&self, registry: &mut Registry<E>) -> Result<(), CliError> {
        for (name, pattern) in &self.captures {
            registry.add_field_list_capture(name, pattern);
        }
        for flag in &self.app_flags {
            registry.add_app_flag(&flag.name, flag.value_type, &flag.help, flag.opts.clone())?;
        }
        for action in &self.actions {
            let template = action
                .help_template
                .clone()
                .unwrap_or_else(|| format!("{} {{object}}", action.name));
            let mut builder =
                registry.new_action(&action.name, &action.help, &template, action.internal_only)?;
            for param in &action.params {
                if param.positional {
                    builder.add_arg(&param.name, param.value_type, &param.help, param.opts.clone())?;
                } else {
                    builder.add_flag(&param.name, param.value_type, &param.help, param.opts.clone())?;
                }
            }
        }
        for object in &self.objects {
            apply_object(object, registry)?;
        }
        for copy in &self.copies {
            let from = copy.from.as_deref().unwrap_or(&copy.action);
            match (&copy.param, copy.positional) {
                (Some(param), true) => registry.add_action_arg_from_object_action(
                    &copy.action,
                    &copy.object,
                    from,
                    param,
                    copy.rename.as_deref(),
                )?,
                (Some(param), false) => registry.add_action_flag_from_object_action(
                    &copy.action,
                    &copy.object,
                    from,
                    param,
                    copy.rename.as_deref(),
                )?,
                (None, _) => {
                    registry.add_action_flags_from_object_action(&copy.action, &copy.object, from)?
                }
            }
        }
        for flag in &self.list_flags {
            registry.add_action_flag_from_object_list(&flag.action, &flag.object, &flag.list)?;
        }
        tracing::debug!(
            actions = self.actions.len(),
            objects = self.objects.len(),
            "model applied"
        );
        Ok(())
    }
}

fn apply_object<E: CliEngine>(
    config: &ObjectConfig,
    registry: &mut Registry<E>,
) -> Result<(), CliError> {
    let mut object = if config.internal {
        registry.new_internal_object(&config.name, &config.description)?
    } else {
        registry.new_object(&config.name, &config.description)?
    };
    if let Some(key) = &config.key {
        object.add_key(key.to_field())?;
    }
    for field in &config.fields {
        object.add_field(field.to_field())?;
    }
    if !config.actions.is_empty() {
        let actions: Vec<&str> = config.actions.iter().map(String::as_str).collect();
        object.define_actions(&actions)?;
    }

    for flag in &config.flags {
        let on: Vec<&str> = flag.on.iter().map(String::as_str).collect();
        object.on_actions(&on)?;
        if flag.positional {
            object.add_arg(&flag.field, flag.opts.clone())?;
        } else {
            object.add_flag(&flag.field, flag.opts.clone())?;
        }
    }

    for list in &config.lists {
        let mut builder = object.create_list(&list.name, list.separator, &list.pattern, &list.help)?;
        for mapping in &list.fields {
            builder.field(mapping.index, &mapping.field)?;
        }
        let actions: Vec<&str> = list.actions.iter().map(String::as_str).collect();
        builder.add_actions(&actions)?;
    }
    Ok(())
}
