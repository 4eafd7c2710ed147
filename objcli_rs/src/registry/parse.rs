//! Resolution and parsing.
//!
//! A parse runs the engine twice. The lenient pass only identifies the
//! [`Context`] so refresh hooks can declare more objects and flags for it;
//! the strict pass then validates the full command line against the final
//! declarations. Values are loaded after each pass and records are stored
//! after the strict one.

use std::collections::BTreeMap;
use std::mem;

use regex::Regex;
use serde::Serialize;

use crate::context::{self, Context, ContextState};
use crate::engine::{CliEngine, ParseResult};
use crate::error::{CliError, ValueError};
use crate::model::{ListRef, Object, Param, ValueSink, expand_captures};
use crate::values::{ACTION_ATTR, AttrValue, Attributes, Layer};

use super::{Phase, Registry};

/// What a successful parse selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseOutcome {
    /// Full selected command, e.g. `create repo`.
    pub command: String,
    pub context: Context,
}

/// A record waiting to be written to the store.
struct Pending {
    object: String,
    key: String,
    attributes: Attributes,
}

impl<E: CliEngine> Registry<E> {
    /// Identify the context from `argv` without enforcing required clauses,
    /// and load every parameter so layered lookups see the values.
    pub fn resolve_context(&mut self, argv: &[String]) -> Result<Context, CliError> {
        let result = self.engine.resolve(argv)?;
        let context = context::identify(result.selected_commands(), &self.actions, &self.objects);
        self.load_params(&result);
        Ok(context)
    }

    /// Parse `argv` and store the resulting records.
    ///
    /// Fails on pending configuration errors, engine errors and hook errors.
    /// List and format errors are reported after every other record was
    /// stored; the first one is returned.
    pub fn parse(&mut self, argv: &[String]) -> Result<ParseOutcome, CliError> {
        self.check()?;

        let early = self.resolve_context(argv)?;
        self.refresh_context(&early)?;
        self.check()?;

        let result = self.engine.parse(argv)?;
        let context = context::identify(result.selected_commands(), &self.actions, &self.objects);
        if context != early {
            tracing::debug!(?early, ?context, "context changed after late binding");
        }
        self.load_params(&result);

        let mut errors = self.load_lists();
        errors.extend(self.load_object_data(&context));
        if let Some(first) = errors.into_iter().next() {
            return Err(first.into());
        }

        self.run_parse_hooks(&context)?;
        tracing::info!(command = result.command_name(), ?context, "parsed");
        Ok(ParseOutcome {
            command: result.command_name().to_string(),
            context,
        })
    }

    fn load_params(&mut self, result: &ParseResult) {
        for param in self.app_flags.values_mut() {
            param.load_value(result);
        }
        for action in self.actions.values_mut() {
            for param in action.params_mut() {
                param.load_value(result);
            }
        }
        for object in self.objects.values_mut() {
            for oa in object.actions_mut() {
                for param in oa.params_mut() {
                    param.load_value(result);
                }
            }
            for list in object.lists_mut() {
                for oa in list.actions_accepted_mut() {
                    for param in oa.params_mut() {
                        param.load_value(result);
                    }
                }
            }
        }
    }

    /// Every parameter of the model, in no particular order.
    pub(super) fn all_params(&self) -> impl Iterator<Item = &Param> + '_ {
        let app = self.app_flags.values();
        let actions = self.actions.values().flat_map(|a| a.params().values());
        let objects = self.objects.values().flat_map(|o| {
            let direct = o.actions().values().flat_map(|oa| oa.params().values());
            let lists = o
                .lists()
                .values()
                .flat_map(|l| l.actions_accepted().values().flat_map(|oa| oa.params().values()));
            direct.chain(lists)
        });
        app.chain(actions).chain(objects)
    }

    /// Rebuild list records from the list parameters the user supplied.
    fn load_lists(&mut self) -> Vec<ValueError> {
        let feeds: Vec<(ListRef, Vec<String>)> = self
            .all_params()
            .filter(|p| p.is_found())
            .filter_map(|p| Some((p.list_ref()?.clone(), p.raw_values().to_vec())))
            .collect();

        for object in self.objects.values_mut() {
            for list in object.lists_mut() {
                list.clear_records();
            }
        }

        let mut errors = Vec::new();
        for (list_ref, raws) in feeds {
            let Some(list) = self
                .objects
                .get_mut(&list_ref.object)
                .and_then(|o| o.list_mut(&list_ref.list))
            else {
                continue;
            };
            for raw in raws {
                if let Err(err) = list.set(&raw) {
                    tracing::warn!(error = %err, "list value rejected");
                    errors.push(err);
                }
            }
        }
        errors
    }

    /// Turn loaded parameters and list records into [`crate::RecordStore`]
    /// entries.
    fn load_object_data(&mut self, context: &Context) -> Vec<ValueError> {
        let Some(action) = context.action() else {
            return Vec::new();
        };

        let mut pending = Vec::new();
        match context.state() {
            ContextState::ActionObject => {
                if let Some(record) = context
                    .object()
                    .and_then(|name| self.objects.get(name))
                    .and_then(|object| object_action_record(object, action))
                {
                    pending.push(record);
                }
            }
            ContextState::ActionOnly => {
                if let Some(target) = self.actions.get(action) {
                    pending.extend(
                        self.objects
                            .values()
                            .filter_map(|object| action_record(object, target.params(), action)),
                    );
                }
            }
            _ => {}
        }
        for object in self.objects.values() {
            pending.extend(list_records(object, action));
        }

        let mut errors = Vec::new();
        for record in pending {
            if let Err(err) = self.check_formats(&record) {
                tracing::warn!(error = %err, "record skipped");
                errors.push(err);
                continue;
            }
            tracing::debug!(object = %record.object, key = %record.key, "record stored");
            self.values
                .merge(&record.object, &record.key, record.attributes);
        }
        errors
    }

    fn check_formats(&self, record: &Pending) -> Result<(), ValueError> {
        let Some(object) = self.objects.get(&record.object) else {
            return Ok(());
        };
        for (name, attr) in &record.attributes {
            let Some(format) = object.field(name).and_then(|f| f.format.as_deref()) else {
                continue;
            };
            let expanded = expand_captures(format, &self.captures);
            let Ok(regex) = Regex::new(&format!("^(?:{expanded})$")) else {
                continue;
            };
            if !regex.is_match(&attr.value) {
                return Err(ValueError::FieldFormat {
                    object: record.object.clone(),
                    key: record.key.clone(),
                    field: name.clone(),
                    value: attr.value.clone(),
                    format: format.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Run the refresh hooks registered for the context's action with the
    /// registry in late-bind mode.
    fn refresh_context(&mut self, context: &Context) -> Result<(), CliError> {
        let Some(action) = context.action() else {
            return Ok(());
        };
        let Some(mut hooks) = self.refresh_hooks.remove(action) else {
            return Ok(());
        };

        self.phase = Phase::LateBind;
        let mut outcome = Ok(());
        for (object, hook) in hooks.iter_mut() {
            tracing::debug!(action, object = %object, "context refresh");
            if let Err(err) = hook(self, context) {
                outcome = Err(err);
                break;
            }
        }
        self.phase = Phase::Build;

        let registered = self.refresh_hooks.entry(action.to_string()).or_default();
        for (object, hook) in hooks {
            registered.entry(object).or_insert(hook);
        }
        outcome
    }

    fn run_parse_hooks(&mut self, context: &Context) -> Result<(), CliError> {
        let mut hooks = mem::take(&mut self.parse_hooks);
        let mut outcome = Ok(());
        'objects: for (object, object_hooks) in hooks.iter_mut() {
            for hook in object_hooks.iter_mut() {
                if let Err(err) = hook(object.as_str(), context, &mut self.values) {
                    outcome = Err(err);
                    break 'objects;
                }
            }
        }
        self.parse_hooks = hooks;
        outcome
    }
}

fn param_attr(param: &Param, layer: Layer) -> Option<AttrValue> {
    param
        .current_value()
        .map(|v| AttrValue::new(v.value, v.is_default, layer))
}

fn keyed(object: &Object, attributes: Attributes, action: &str, layer: Layer) -> Option<Pending> {
    let key_field = object.key()?;
    let Some(key) = attributes
        .get(key_field)
        .map(|a| a.value.clone())
        .filter(|k| !k.is_empty())
    else {
        tracing::debug!(object = object.name(), "no key value, nothing stored");
        return None;
    };
    let mut attributes = attributes;
    attributes.insert(ACTION_ATTR.to_string(), AttrValue::new(action, false, layer));
    Some(Pending {
        object: object.name().to_string(),
        key,
        attributes,
    })
}

/// Record from `<action> <object>` parameters.
fn object_action_record(object: &Object, action: &str) -> Option<Pending> {
    let oa = object.action(action)?;
    let attributes: Attributes = oa
        .params()
        .values()
        .filter(|p| p.list_ref().is_none())
        .filter_map(|p| Some((p.name().to_string(), param_attr(p, Layer::ObjectAction)?)))
        .collect();
    keyed(object, attributes, action, Layer::ObjectAction)
}

/// Record from parameters copied onto the bare action from `object`.
fn action_record(
    object: &Object,
    params: &BTreeMap<String, Param>,
    action: &str,
) -> Option<Pending> {
    let attributes: Attributes = params
        .values()
        .filter(|p| p.list_ref().is_none())
        .filter_map(|p| {
            let origin = p.origin().filter(|o| o.object == object.name())?;
            Some((origin.param.clone(), param_attr(p, Layer::Action)?))
        })
        .collect();
    if attributes.is_empty() {
        return None;
    }
    keyed(object, attributes, action, Layer::Action)
}

/// One record per extracted list entry.
fn list_records(object: &Object, action: &str) -> Vec<Pending> {
    let mut pending = Vec::new();
    for list in object.lists().values() {
        for record in list.records() {
            let Some(key) = record.get(list.key_field()).filter(|k| !k.is_empty()) else {
                tracing::warn!(
                    object = object.name(),
                    list = list.name(),
                    key = list.key_field(),
                    "list entry has no key value, skipped"
                );
                continue;
            };
            let mut attributes: Attributes = record
                .attributes
                .iter()
                .map(|(name, value)| {
                    (
                        name.clone(),
                        AttrValue::new(value.clone(), false, Layer::ObjectList),
                    )
                })
                .collect();
            attributes.insert(
                ACTION_ATTR.to_string(),
                AttrValue::new(action, false, Layer::ObjectList),
            );
            pending.push(Pending {
                object: object.name().to_string(),
                key: key.to_string(),
                attributes,
            });
        }
    }
    pending
}
