//! In-memory `CliEngine` for tests.
//!
//! No tokenizing happens: `argv` is ignored. Tests pick the selected command
//! chain with [`MockEngine::set_context`] and feed clause values by name.
//! Defaults, environment variables and required clauses behave like the clap
//! engine so the model sees the same shapes either way.

use std::collections::HashMap;

use super::{
    ArgId, ClauseDecl, ClauseSpec, ClauseValue, CliEngine, CommandId, Declarations, FlagId,
    ParseResult, ValueSource,
};
use crate::error::{CliError, EngineErrorKind};
use crate::model::ValueType;

#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    decls: Declarations,
    context: Vec<String>,
    context_values: HashMap<String, Vec<String>>,
    app_values: HashMap<String, Vec<String>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the command chain, root first (`["create", "repos"]`).
    pub fn set_context(&mut self, path: &[&str]) -> &mut Self {
        self.context = path.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Value for every flag/argument named `name` in the selected chain.
    pub fn set_context_value(&mut self, name: &str, value: &str) -> &mut Self {
        self.context_values
            .insert(name.to_string(), vec![value.to_string()]);
        self
    }

    /// Several occurrences of a cumulative clause.
    pub fn set_context_values(&mut self, name: &str, values: &[&str]) -> &mut Self {
        self.context_values.insert(
            name.to_string(),
            values.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Value for an application-wide flag.
    pub fn set_app_value(&mut self, name: &str, value: &str) -> &mut Self {
        self.app_values
            .insert(name.to_string(), vec![value.to_string()]);
        self
    }

    /// Forget the selected chain and every value.
    pub fn clear(&mut self) {
        self.context.clear();
        self.context_values.clear();
        self.app_values.clear();
    }

    /// The lenient pass stops at the first unknown name, like clap with
    /// `ignore_errors`; the strict pass rejects it.
    fn selected_chain(&self, strict: bool) -> Result<Vec<CommandId>, CliError> {
        let mut chain = Vec::new();
        let mut parent = None;
        for name in &self.context {
            let Some(id) = self.decls.child(parent, name) else {
                if !strict {
                    break;
                }
                return Err(CliError::engine(
                    EngineErrorKind::Usage,
                    format!("expected command but got '{}'", name),
                ));
            };
            chain.push(id);
            parent = Some(id);
        }
        Ok(chain)
    }

    fn run(&self, strict: bool) -> Result<ParseResult, CliError> {
        let chain = self.selected_chain(strict)?;
        let mut result = ParseResult::new(chain.clone(), self.decls.chain_name(&chain));

        for id in &self.decls.app_flags {
            if let Some(value) = clause_value(self.decls.flag(*id), &self.app_values, strict)? {
                result.set_flag(*id, value);
            }
        }

        for command in &chain {
            let decl = self.decls.command(*command);
            for flag in &decl.flags {
                let clause = self.decls.flag(*flag);
                if let Some(value) = clause_value(clause, &self.context_values, strict)? {
                    result.set_flag(*flag, value);
                }
            }
            for arg in &decl.args {
                let clause = self.decls.arg(*arg);
                if let Some(value) = clause_value(clause, &self.context_values, strict)? {
                    result.set_arg(*arg, value);
                }
            }
        }
        Ok(result)
    }
}

fn clause_value(
    decl: &ClauseDecl,
    supplied: &HashMap<String, Vec<String>>,
    strict: bool,
) -> Result<Option<ClauseValue>, CliError> {
    let spec: &ClauseSpec = &decl.spec;
    if let Some(values) = supplied.get(&spec.name) {
        let values = if spec.cumulative {
            values.clone()
        } else {
            values.last().cloned().into_iter().collect()
        };
        return Ok(Some(ClauseValue::new(values, ValueSource::CommandLine)));
    }
    if let Some(value) = spec
        .opts
        .envar
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Ok(Some(ClauseValue::single(value, ValueSource::Envar)));
    }
    if strict && spec.opts.required {
        return Err(CliError::engine(
            EngineErrorKind::Usage,
            format!("required argument '{}' not provided", spec.name),
        ));
    }
    if let Some(default) = &spec.opts.default {
        return Ok(Some(ClauseValue::single(default.clone(), ValueSource::Default)));
    }
    if spec.value_type == ValueType::Bool {
        return Ok(Some(ClauseValue::single("false", ValueSource::Default)));
    }
    Ok(None)
}

impl CliEngine for MockEngine {
    fn create_command(&mut self, name: &str, help: &str) -> CommandId {
        self.decls.add_command(None, name, help)
    }

    fn create_subcommand(&mut self, parent: CommandId, name: &str, help: &str) -> CommandId {
        self.decls.add_command(Some(parent), name, help)
    }

    fn create_flag(&mut self, owner: Option<CommandId>, spec: &ClauseSpec) -> FlagId {
        self.decls.add_flag(owner, spec)
    }

    fn create_arg(&mut self, owner: CommandId, spec: &ClauseSpec) -> ArgId {
        self.decls.add_arg(owner, spec)
    }

    fn resolve(&mut self, _argv: &[String]) -> Result<ParseResult, CliError> {
        self.run(false)
    }

    fn parse(&mut self, _argv: &[String]) -> Result<ParseResult, CliError> {
        self.run(true)
    }
}
