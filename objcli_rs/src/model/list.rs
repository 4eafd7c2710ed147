//! Object lists: one cumulative flag value expanded into many records.
//!
//! A list owns a capture regex compiled from a user fragment. The fragment
//! may use capture macros (`#w` expands to a registered word pattern wrapped
//! in a capture group). Each capture group index can be mapped to a field of
//! the owning object with [`ObjectList::field`].
//!
//! At parse time the raw value is split on the separator (a backslash before
//! the separator keeps it literal), every segment must match the regex, and
//! the mapped groups become one [`Record`] per segment:
//!
//! ```text
//! pattern  #w(:#w)?   fields {1: instance, 3: name}
//! value    "myinstance:myname,otherinstance"
//! records  {instance: myinstance, name: myname}
//!          {instance: otherinstance}
//! ```
//!
//! The list also tracks which actions it stays legal for: an action qualifies
//! only while its object-action exposes a parameter for every mapped field.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::error::{ConfigError, ValueError};

use super::field::Field;
use super::object::ObjectAction;

/// Separator used when a list does not name one.
pub const DEFAULT_SEPARATOR: char = ',';

/// Anything the engine can hand a raw clause value to.
pub trait ValueSink {
    /// Consume one occurrence of the clause.
    fn set(&mut self, raw: &str) -> Result<(), ValueError>;
}

/// One instance extracted from a list value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    pub attributes: BTreeMap<String, String>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).map(String::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(field.into(), value.into());
    }
}

/// Validation hook run on every extracted record; may mutate or reject it.
pub struct ValidateHook(Box<dyn Fn(&mut Record) -> Result<(), String>>);

impl ValidateHook {
    pub fn new(hook: impl Fn(&mut Record) -> Result<(), String> + 'static) -> Self {
        Self(Box::new(hook))
    }
}

impl fmt::Debug for ValidateHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValidateHook")
    }
}

/// Compiled list pattern.
#[derive(Debug, Clone)]
pub struct ListPattern {
    source: String,
    regex: Regex,
    max_captured_groups: usize,
}

impl ListPattern {
    /// Expand capture macros, wrap in a group when none is present, anchor
    /// and compile.
    pub fn compile(fragment: &str, captures: &BTreeMap<String, String>) -> Result<Self, String> {
        let mut expanded = expand_captures(fragment, captures);
        if count_capture_groups(&expanded) == 0 {
            expanded = format!("({expanded})");
        }
        let max_captured_groups = 1 + count_capture_groups(&expanded);
        let regex = Regex::new(&format!("^{expanded}$")).map_err(|e| e.to_string())?;
        Ok(Self {
            source: fragment.to_string(),
            regex,
            max_captured_groups,
        })
    }

    /// The fragment as declared, before macro expansion.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The full anchored regex.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// One more than the number of capture groups; valid indexes are below it.
    pub fn max_captured_groups(&self) -> usize {
        self.max_captured_groups
    }
}

/// Replace `#name` macros with `(pattern)`, longest names first so `#wx`
/// is not eaten by `#w`.
pub fn expand_captures(fragment: &str, captures: &BTreeMap<String, String>) -> String {
    let mut names: Vec<&String> = captures.keys().collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut expanded = fragment.to_string();
    for name in names {
        let token = format!("#{name}");
        if expanded.contains(&token) {
            expanded = expanded.replace(&token, &format!("({})", captures[name]));
        }
    }
    expanded
}

/// Count `(` not preceded by an escaping backslash.
pub fn count_capture_groups(pattern: &str) -> usize {
    let mut count = 0;
    let mut escaped = false;
    for c in pattern.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' => count += 1,
            _ => {}
        }
    }
    count
}

/// Split `raw` on `separator`; `\<separator>` stays in the segment as a
/// literal separator. An empty input is one empty segment.
pub fn split_escaped(raw: &str, separator: char) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&separator) {
            current.push(separator);
            chars.next();
        } else if c == separator {
            segments.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    segments.push(current);
    segments
}

/// A list declaration on an object.
#[derive(Debug)]
pub struct ObjectList {
    name: String,
    object: String,
    help: String,
    separator: char,
    pattern: ListPattern,
    key_field: String,
    fields: BTreeMap<usize, String>,
    actions_related: BTreeSet<String>,
    actions_accepted: BTreeMap<String, ObjectAction>,
    records: Vec<Record>,
    validate: Option<ValidateHook>,
    invalid: bool,
}

impl ObjectList {
    /// Build a list for `object`. `related` starts as every action attached to
    /// the object and only shrinks afterwards.
    pub fn new(
        object: &str,
        name: &str,
        separator: char,
        pattern: ListPattern,
        help: &str,
        key_field: &str,
        related: BTreeSet<String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            object: object.to_string(),
            help: help.to_string(),
            separator,
            pattern,
            key_field: key_field.to_string(),
            fields: BTreeMap::new(),
            actions_related: related,
            actions_accepted: BTreeMap::new(),
            records: Vec::new(),
            validate: None,
            invalid: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn pattern(&self) -> &ListPattern {
        &self.pattern
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn is_valid(&self) -> bool {
        !self.invalid
    }

    /// Capture group index to field name.
    pub fn fields(&self) -> &BTreeMap<usize, String> {
        &self.fields
    }

    /// Actions for which every mapped field has a parameter.
    pub fn actions_related(&self) -> &BTreeSet<String> {
        &self.actions_related
    }

    pub fn actions_accepted(&self) -> &BTreeMap<String, ObjectAction> {
        &self.actions_accepted
    }

    pub fn actions_accepted_mut(&mut self) -> impl Iterator<Item = &mut ObjectAction> {
        self.actions_accepted.values_mut()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn clear_records(&mut self) {
        self.records.clear();
    }

    pub fn set_validate_hook(&mut self, hook: ValidateHook) {
        self.validate = Some(hook);
    }

    /// Map capture group `index` to field `name`.
    ///
    /// `fields` and `actions` are the owning object's declarations. The
    /// last mapping for an index wins. Fails when the index is out of range,
    /// the field is unknown, or no remaining action exposes the field; the
    /// last case invalidates the list.
    pub fn field(
        &mut self,
        index: usize,
        name: &str,
        fields: &BTreeMap<String, Field>,
        actions: &BTreeMap<String, ObjectAction>,
    ) -> Result<(), ConfigError> {
        let max_groups = self.pattern.max_captured_groups();
        if index < 1 || index >= max_groups {
            return Err(ConfigError::CaptureIndexOutOfRange {
                object: self.object.clone(),
                list: self.name.clone(),
                index,
                max_groups,
            });
        }
        if !fields.contains_key(name) {
            return Err(ConfigError::UnknownField {
                object: self.object.clone(),
                field: name.to_string(),
            });
        }

        let supporting: BTreeSet<String> = actions
            .values()
            .filter(|oa| oa.has_param(name))
            .map(|oa| oa.action().to_string())
            .collect();
        self.actions_related = self
            .actions_related
            .intersection(&supporting)
            .cloned()
            .collect();
        self.fields.insert(index, name.to_string());

        if self.actions_related.is_empty() {
            self.invalid = true;
            return Err(ConfigError::NoCommonAction {
                object: self.object.clone(),
                list: self.name.clone(),
                field: name.to_string(),
            });
        }
        tracing::debug!(
            object = %self.object,
            list = %self.name,
            index,
            field = name,
            related = ?self.actions_related,
            "list field mapped"
        );
        Ok(())
    }

    /// Check that `action` may carry this list.
    pub fn accepts(&self, action: &str) -> Result<(), ConfigError> {
        if self.invalid {
            return Err(ConfigError::InvalidList {
                object: self.object.clone(),
                list: self.name.clone(),
            });
        }
        if !self.actions_related.contains(action) {
            return Err(ConfigError::ActionNotAccepted {
                object: self.object.clone(),
                list: self.name.clone(),
                action: action.to_string(),
            });
        }
        Ok(())
    }

    /// Register the plural object-action (`<action> <list>`) built by the caller.
    pub fn insert_accepted(&mut self, object_action: ObjectAction) {
        self.actions_accepted
            .insert(object_action.action().to_string(), object_action);
    }

    /// Turn `raw` into records without storing them.
    pub fn extract(&self, raw: &str) -> Result<Vec<Record>, ValueError> {
        let mut records = Vec::new();
        for (i, segment) in split_escaped(raw, self.separator).into_iter().enumerate() {
            let position = i + 1;
            let Some(caps) = self.pattern.regex().captures(&segment) else {
                return Err(ValueError::SegmentMismatch {
                    list: self.name.clone(),
                    position,
                    segment,
                    pattern: self.pattern.as_str().to_string(),
                });
            };

            let mut record = Record::default();
            for (index, field) in &self.fields {
                if let Some(m) = caps.get(*index) {
                    record.set(field.clone(), m.as_str());
                }
            }

            if let Some(hook) = &self.validate {
                (hook.0)(&mut record).map_err(|reason| ValueError::RecordRejected {
                    list: self.name.clone(),
                    position,
                    segment: segment.clone(),
                    reason,
                })?;
            }
            records.push(record);
        }
        Ok(records)
    }
}

impl ValueSink for ObjectList {
    /// Append the records of `raw`. On error nothing is appended and records
    /// from earlier occurrences stay untouched.
    fn set(&mut self, raw: &str) -> Result<(), ValueError> {
        let records = self.extract(raw)?;
        tracing::debug!(list = %self.name, count = records.len(), "list records extracted");
        self.records.extend(records);
        Ok(())
    }
}
