//! Parameters: flags, positional arguments and list flags.
//!
//! [`Param`] is a closed set of variants sharing one operation surface:
//! bind to the engine (done at construction), load a value from a
//! [`ParseResult`], report whether the user supplied it, expose the current
//! value, and copy itself onto another command with a fresh binding.

use crate::engine::{ArgId, ClauseSpec, ClauseValue, CliEngine, CommandId, FlagId, ParseResult};
use crate::options::Opts;
use crate::values::ParamValue;

use super::field::{Field, ValueType};

/// Where a copied parameter came from: the object and parameter it answers for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamOrigin {
    pub object: String,
    pub param: String,
}

/// Declaration data shared by every parameter variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDef {
    pub name: String,
    pub help: String,
    pub value_type: ValueType,
    pub opts: Opts,
    pub origin: Option<ParamOrigin>,
}

impl ParamDef {
    pub fn new(name: impl Into<String>, value_type: ValueType, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value_type,
            opts: Opts::default(),
            origin: None,
        }
    }

    /// Definition of a parameter declared from an object field.
    pub fn from_field(field: &Field, extra: Option<&Opts>) -> Self {
        Self {
            name: field.name.clone(),
            help: field.help.clone(),
            value_type: field.value_type,
            opts: field.opts.merged_with(extra),
            origin: None,
        }
    }

    pub fn with_opts(mut self, opts: Opts) -> Self {
        self.opts = opts;
        self
    }

    fn clause(&self) -> ClauseSpec {
        ClauseSpec::new(self.name.clone(), self.help.clone(), self.value_type)
            .with_opts(self.opts.clone())
    }

    /// Same declaration under a new name; no binding is carried over.
    fn renamed(&self, name: &str, origin: Option<ParamOrigin>) -> Self {
        Self {
            name: name.to_string(),
            origin: origin.or_else(|| self.origin.clone()),
            ..self.clone()
        }
    }
}

/// Identifies an object list by its owning object and its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListRef {
    pub object: String,
    pub list: String,
}

/// Engine clause a list flag is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Flag(FlagId),
    Arg(ArgId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LoadState {
    value: Option<ClauseValue>,
}

impl LoadState {
    fn load(&mut self, value: Option<&ClauseValue>) {
        self.value = value.cloned();
    }

    fn found(&self) -> bool {
        self.value.as_ref().is_some_and(ClauseValue::is_explicit)
    }

    fn current(&self) -> Option<ParamValue> {
        let value = self.value.as_ref()?;
        Some(ParamValue {
            value: value.last()?.to_string(),
            is_default: !value.is_explicit(),
        })
    }

    fn raw(&self) -> &[String] {
        self.value
            .as_ref()
            .map(|v| v.values.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagParam {
    def: ParamDef,
    handle: FlagId,
    state: LoadState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgParam {
    def: ParamDef,
    handle: ArgId,
    state: LoadState,
}

/// Cumulative flag or argument whose occurrences feed an object list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParam {
    def: ParamDef,
    binding: Binding,
    list: ListRef,
    state: LoadState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Flag(FlagParam),
    Arg(ArgParam),
    List(ListParam),
}

impl Param {
    /// Create a flag clause on `owner` (application-wide when `None`).
    pub fn bind_flag<E: CliEngine>(def: ParamDef, engine: &mut E, owner: Option<CommandId>) -> Self {
        let handle = engine.create_flag(owner, &def.clause());
        Param::Flag(FlagParam {
            def,
            handle,
            state: LoadState::default(),
        })
    }

    /// Create a positional argument clause on `owner`.
    pub fn bind_arg<E: CliEngine>(def: ParamDef, engine: &mut E, owner: CommandId) -> Self {
        let handle = engine.create_arg(owner, &def.clause());
        Param::Arg(ArgParam {
            def,
            handle,
            state: LoadState::default(),
        })
    }

    /// Create a cumulative clause feeding `list`, positional or as a flag.
    pub fn bind_list<E: CliEngine>(
        def: ParamDef,
        list: ListRef,
        engine: &mut E,
        owner: CommandId,
        positional: bool,
    ) -> Self {
        let spec = def.clause().cumulative();
        let binding = if positional {
            Binding::Arg(engine.create_arg(owner, &spec))
        } else {
            Binding::Flag(engine.create_flag(Some(owner), &spec))
        };
        Param::List(ListParam {
            def,
            binding,
            list,
            state: LoadState::default(),
        })
    }

    pub fn def(&self) -> &ParamDef {
        match self {
            Param::Flag(p) => &p.def,
            Param::Arg(p) => &p.def,
            Param::List(p) => &p.def,
        }
    }

    pub fn name(&self) -> &str {
        &self.def().name
    }

    pub fn origin(&self) -> Option<&ParamOrigin> {
        self.def().origin.as_ref()
    }

    /// The object list fed by this parameter, for list flags.
    pub fn list_ref(&self) -> Option<&ListRef> {
        match self {
            Param::List(p) => Some(&p.list),
            _ => None,
        }
    }

    /// True when this parameter answers for `param` of `object` on an action
    /// (copied from that object, or declared with the same name).
    pub fn answers_for(&self, object: &str, param: &str) -> bool {
        match self.origin() {
            Some(origin) => origin.object == object && origin.param == param,
            None => self.name() == param,
        }
    }

    /// Copy the value the engine reported for this clause into live storage.
    pub fn load_value(&mut self, result: &ParseResult) {
        match self {
            Param::Flag(p) => p.state.load(result.flag(p.handle)),
            Param::Arg(p) => p.state.load(result.arg(p.handle)),
            Param::List(p) => {
                let value = match p.binding {
                    Binding::Flag(id) => result.flag(id),
                    Binding::Arg(id) => result.arg(id),
                };
                p.state.load(value);
            }
        }
    }

    fn state(&self) -> &LoadState {
        match self {
            Param::Flag(p) => &p.state,
            Param::Arg(p) => &p.state,
            Param::List(p) => &p.state,
        }
    }

    /// Supplied by the user during the last load (defaults do not count).
    pub fn is_found(&self) -> bool {
        self.state().found()
    }

    /// Effective value after the last load, explicit or defaulted.
    pub fn current_value(&self) -> Option<ParamValue> {
        self.state().current()
    }

    /// Every occurrence seen during the last load.
    pub fn raw_values(&self) -> &[String] {
        self.state().raw()
    }

    /// Deep-copy the declaration as a flag on `owner` with a brand-new binding.
    pub fn copy_to_flag<E: CliEngine>(
        &self,
        name: &str,
        origin: Option<ParamOrigin>,
        engine: &mut E,
        owner: Option<CommandId>,
    ) -> Param {
        let def = self.def().renamed(name, origin);
        match (self, owner) {
            (Param::List(p), Some(owner)) => {
                Param::bind_list(def, p.list.clone(), engine, owner, false)
            }
            _ => Param::bind_flag(def, engine, owner),
        }
    }

    /// Deep-copy the declaration as a positional argument on `owner`.
    pub fn copy_to_arg<E: CliEngine>(
        &self,
        name: &str,
        origin: Option<ParamOrigin>,
        engine: &mut E,
        owner: CommandId,
    ) -> Param {
        let def = self.def().renamed(name, origin);
        match self {
            Param::List(p) => Param::bind_list(def, p.list.clone(), engine, owner, true),
            _ => Param::bind_arg(def, engine, owner),
        }
    }
}
