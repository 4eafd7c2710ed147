//! `CliEngine` backed by clap's builder API.
//!
//! Declarations are recorded in an arena; every `resolve`/`parse` call
//! builds a fresh `clap::Command` tree from them, runs clap over `argv` and
//! copies what it matched into a [`ParseResult`].

use clap::builder::BoolishValueParser;
use clap::error::ErrorKind;
use clap::parser::ValueSource as ClapSource;
use clap::{Arg, ArgAction, ArgMatches, Command};

use super::{
    ArgId, ClauseDecl, ClauseSpec, ClauseValue, CliEngine, CommandId, Declarations, FlagId,
    ParseResult, ValueSource,
};
use crate::error::{CliError, EngineErrorKind};
use crate::model::ValueType;

/// Engine translating the model's declarations into clap commands.
#[derive(Debug, Clone)]
pub struct ClapEngine {
    app_name: String,
    about: String,
    version: Option<String>,
    decls: Declarations,
}

impl ClapEngine {
    pub fn new(app_name: impl Into<String>, about: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            about: about.into(),
            version: None,
            decls: Declarations::default(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Build the clap tree. `lenient` turns off clap's validation so partial
    /// command lines can still be resolved.
    pub fn build_command(&self, lenient: bool) -> Command {
        let mut root = Command::new(self.app_name.clone()).about(self.about.clone());
        if let Some(version) = &self.version {
            root = root.version(version.clone());
        }
        if lenient {
            root = root.ignore_errors(true);
        }
        for id in &self.decls.app_flags {
            root = root.arg(build_flag(&self.decls.flag(*id).spec).global(true));
        }
        for id in &self.decls.roots {
            root = root.subcommand(self.build_subcommand(*id));
        }
        root
    }

    fn build_subcommand(&self, id: CommandId) -> Command {
        let decl = self.decls.command(id);
        let mut cmd = Command::new(decl.name.clone()).about(decl.help.clone());
        for flag in &decl.flags {
            cmd = cmd.arg(build_flag(&self.decls.flag(*flag).spec));
        }
        for (position, arg) in decl.args.iter().enumerate() {
            cmd = cmd.arg(build_positional(&self.decls.arg(*arg).spec, position + 1));
        }
        for child in &decl.children {
            cmd = cmd.subcommand(self.build_subcommand(*child));
        }
        cmd
    }

    fn run(&self, argv: &[String], lenient: bool) -> Result<ParseResult, CliError> {
        let cmd = self.build_command(lenient);
        let tokens = std::iter::once(self.app_name.clone()).chain(argv.iter().cloned());
        let matches = cmd.try_get_matches_from(tokens).map_err(map_clap_error)?;

        // levels[0] is the root; levels[i + 1] belongs to chain[i].
        let mut chain = Vec::new();
        let mut levels = vec![&matches];
        let mut current = &matches;
        let mut parent: Option<CommandId> = None;
        while let Some((name, sub)) = current.subcommand() {
            let Some(id) = self.decls.child(parent, name) else {
                break;
            };
            chain.push(id);
            levels.push(sub);
            current = sub;
            parent = Some(id);
        }

        let mut result = ParseResult::new(chain.clone(), self.decls.chain_name(&chain));

        // Global flags may be matched at any level; prefer an explicit value
        // from the deepest one.
        for id in &self.decls.app_flags {
            let decl = self.decls.flag(*id);
            let mut found: Option<ClauseValue> = None;
            for level in levels.iter().rev() {
                if let Some(value) = read_clause(level, decl) {
                    if value.is_explicit() {
                        found = Some(value);
                        break;
                    }
                    found.get_or_insert(value);
                }
            }
            if let Some(value) = found {
                result.set_flag(*id, value);
            }
        }

        for (id, level) in chain.iter().zip(levels.iter().skip(1)) {
            let decl = self.decls.command(*id);
            for flag in &decl.flags {
                if let Some(value) = read_clause(level, self.decls.flag(*flag)) {
                    result.set_flag(*flag, value);
                }
            }
            for arg in &decl.args {
                if let Some(value) = read_clause(level, self.decls.arg(*arg)) {
                    result.set_arg(*arg, value);
                }
            }
        }

        tracing::debug!(command = result.command_name(), lenient, "clap engine pass");
        Ok(result)
    }
}

impl CliEngine for ClapEngine {
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

    fn resolve(&mut self, argv: &[String]) -> Result<ParseResult, CliError> {
        self.run(argv, true)
    }

    fn parse(&mut self, argv: &[String]) -> Result<ParseResult, CliError> {
        self.run(argv, false)
    }
}

fn build_flag(spec: &ClauseSpec) -> Arg {
    let mut arg = Arg::new(spec.name.clone())
        .long(spec.name.clone())
        .help(spec.help.clone());

    arg = match (spec.value_type, spec.cumulative) {
        (ValueType::Bool, _) => arg.action(ArgAction::SetTrue),
        (ValueType::String, true) => arg.action(ArgAction::Append).value_name("LIST"),
        (ValueType::String, false) => arg.action(ArgAction::Set).value_name("VALUE"),
    };

    if let Some(short) = spec.opts.short {
        arg = arg.short(short);
    }
    apply_common(arg, spec)
}

fn build_positional(spec: &ClauseSpec, index: usize) -> Arg {
    let mut arg = Arg::new(spec.name.clone())
        .help(spec.help.clone())
        .index(index);
    if spec.value_type == ValueType::Bool {
        arg = arg.value_parser(BoolishValueParser::new()).value_name("BOOL");
    }
    if spec.cumulative {
        arg = arg.action(ArgAction::Append).num_args(1..);
    }
    apply_common(arg, spec)
}

fn apply_common(mut arg: Arg, spec: &ClauseSpec) -> Arg {
    if spec.opts.required {
        arg = arg.required(true);
    }
    if let Some(default) = &spec.opts.default {
        arg = arg.default_value(default.clone());
    }
    if let Some(envar) = &spec.opts.envar {
        arg = arg.env(envar.clone());
    }
    if spec.opts.hidden {
        arg = arg.hide(true);
    }
    arg
}

fn read_clause(matches: &ArgMatches, decl: &ClauseDecl) -> Option<ClauseValue> {
    let id = decl.spec.name.as_str();
    let source = match matches.value_source(id)? {
        ClapSource::CommandLine => ValueSource::CommandLine,
        ClapSource::EnvVariable => ValueSource::Envar,
        _ => ValueSource::Default,
    };

    let values = match decl.spec.value_type {
        ValueType::Bool => {
            let flag = matches.try_get_one::<bool>(id).ok().flatten()?;
            vec![flag.to_string()]
        }
        ValueType::String => matches
            .try_get_many::<String>(id)
            .ok()
            .flatten()?
            .cloned()
            .collect(),
    };
    Some(ClauseValue::new(values, source))
}

fn map_clap_error(err: clap::Error) -> CliError {
    let kind = match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            EngineErrorKind::Help
        }
        ErrorKind::DisplayVersion => EngineErrorKind::Version,
        _ => EngineErrorKind::Usage,
    };
    CliError::engine(kind, err.render().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Opts;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn engine() -> (ClapEngine, CommandId, CommandId, FlagId, FlagId) {
        let mut engine = ClapEngine::new("demo", "demo app");
        let create = engine.create_command("create", "Create things");
        let repo = engine.create_subcommand(create, "repo", "Create a repo");
        let name = engine.create_flag(
            Some(repo),
            &ClauseSpec::new("name", "Repo name", ValueType::String),
        );
        let debug = engine.create_flag(None, &ClauseSpec::new("debug", "Debug", ValueType::Bool));
        (engine, create, repo, name, debug)
    }

    #[test]
    fn walks_selected_chain() {
        let (mut engine, create, repo, name, debug) = engine();
        let result = engine
            .parse(&argv(&["create", "repo", "--name", "web", "--debug"]))
            .expect("parse");
        assert_eq!(result.selected_commands(), &[create, repo]);
        assert_eq!(result.command_name(), "create repo");
        assert_eq!(result.flag(name).and_then(ClauseValue::last), Some("web"));
        let debug = result.flag(debug).expect("debug flag");
        assert_eq!(debug.last(), Some("true"));
        assert!(debug.is_explicit());
    }

    #[test]
    fn unset_bool_flag_is_default_false() {
        let (mut engine, _, _, _, debug) = engine();
        let result = engine.parse(&argv(&["create"])).expect("parse");
        let debug = result.flag(debug).expect("debug flag");
        assert_eq!(debug.last(), Some("false"));
        assert_eq!(debug.source, ValueSource::Default);
    }

    #[test]
    fn cumulative_flag_keeps_every_occurrence() {
        let mut engine = ClapEngine::new("demo", "demo app");
        let create = engine.create_command("create", "Create things");
        let repos = engine.create_flag(
            Some(create),
            &ClauseSpec::new("repos", "Repos", ValueType::String).cumulative(),
        );
        let result = engine
            .parse(&argv(&["create", "--repos", "a,b", "--repos", "c"]))
            .expect("parse");
        assert_eq!(
            result.flag(repos).map(|v| v.values.clone()),
            Some(vec!["a,b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn strict_parse_rejects_missing_required_flag() {
        let mut engine = ClapEngine::new("demo", "demo app");
        let create = engine.create_command("create", "Create things");
        engine.create_flag(
            Some(create),
            &ClauseSpec::new("name", "Name", ValueType::String).with_opts(Opts::new().required()),
        );
        let err = engine.parse(&argv(&["create"])).expect_err("missing required");
        assert!(matches!(
            err,
            CliError::Engine {
                kind: EngineErrorKind::Usage,
                ..
            }
        ));
        let lenient = engine.resolve(&argv(&["create"])).expect("resolve");
        assert_eq!(lenient.selected_commands(), &[create]);
    }

    #[test]
    fn default_value_is_reported_as_default() {
        let mut engine = ClapEngine::new("demo", "demo app");
        let create = engine.create_command("create", "Create things");
        let upstream = engine.create_flag(
            Some(create),
            &ClauseSpec::new("upstream", "Upstream", ValueType::String)
                .with_opts(Opts::new().default_value("github")),
        );
        let result = engine.parse(&argv(&["create"])).expect("parse");
        let value = result.flag(upstream).expect("defaulted");
        assert_eq!(value.last(), Some("github"));
        assert_eq!(value.source, ValueSource::Default);
    }

    #[test]
    fn bool_positional_reads_as_bool() {
        let mut engine = ClapEngine::new("demo", "demo app");
        let create = engine.create_command("create", "Create things");
        let private = engine.create_arg(
            create,
            &ClauseSpec::new("private", "Private repo", ValueType::Bool),
        );
        let result = engine.parse(&argv(&["create", "yes"])).expect("parse");
        let value = result.arg(private).expect("private");
        assert_eq!(value.last(), Some("true"));
        assert!(value.is_explicit());

        let result = engine.parse(&argv(&["create", "false"])).expect("parse");
        assert_eq!(result.arg(private).and_then(ClauseValue::last), Some("false"));
        assert!(engine.parse(&argv(&["create", "maybe"])).is_err());
    }

    #[test]
    fn help_request_is_informational() {
        let (mut engine, ..) = engine();
        let err = engine.parse(&argv(&["--help"])).expect_err("help");
        assert!(err.is_informational());
        assert!(err.to_string().contains("create"));
    }
}
