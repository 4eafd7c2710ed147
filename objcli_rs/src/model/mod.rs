//! Declarative model: actions, objects, fields, parameters and lists.
//!
//! Entities only refer to each other by name; the [`crate::Registry`] owns
//! every action and object, objects own their fields, object-actions and
//! lists, and each action or object-action owns its parameters.

mod action;
mod field;
mod list;
mod object;
mod param;

pub use action::{Action, HELP_PLACEHOLDER};
pub use field::{Field, ValueType};
pub use list::{
    DEFAULT_SEPARATOR, ListPattern, ObjectList, Record, ValidateHook, ValueSink,
    count_capture_groups, expand_captures, split_escaped,
};
pub use object::{Object, ObjectAction};
pub use param::{Binding, ListRef, Param, ParamDef, ParamOrigin};
