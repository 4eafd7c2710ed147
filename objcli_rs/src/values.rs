//! Values produced by a parse.
//!
//! [`RecordStore`] maps object → key → attribute → [`AttrValue`]. It is
//! filled after the final parse and merges across repeated parses: writing
//! the same key again adds or overwrites single attributes, it never drops
//! the record. Every attribute remembers which [`Layer`] supplied it.

use std::collections::BTreeMap;

use serde::Serialize;

/// Attribute recording which action produced a record.
pub const ACTION_ATTR: &str = "action";

/// Effective value of a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamValue {
    pub value: String,
    /// Came from a declared default rather than from the user.
    pub is_default: bool,
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        parse_bool(&self.value)
    }
}

/// Binding layer a value was read from, most general first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layer {
    Application,
    Action,
    ObjectAction,
    ObjectList,
}

/// One stored attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttrValue {
    pub value: String,
    pub is_default: bool,
    pub layer: Layer,
}

impl AttrValue {
    pub fn new(value: impl Into<String>, is_default: bool, layer: Layer) -> Self {
        Self {
            value: value.into(),
            is_default,
            layer,
        }
    }

    pub fn to_param_value(&self) -> ParamValue {
        ParamValue {
            value: self.value.clone(),
            is_default: self.is_default,
        }
    }
}

pub type Attributes = BTreeMap<String, AttrValue>;

/// object → key → attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecordStore {
    objects: BTreeMap<String, BTreeMap<String, Attributes>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `attributes` into the record `object/key`, creating it if needed.
    pub fn merge(
        &mut self,
        object: &str,
        key: &str,
        attributes: impl IntoIterator<Item = (String, AttrValue)>,
    ) {
        let record = self
            .objects
            .entry(object.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default();
        record.extend(attributes);
    }

    pub fn set(&mut self, object: &str, key: &str, attr: &str, value: AttrValue) {
        self.merge(object, key, [(attr.to_string(), value)]);
    }

    pub fn get(&self, object: &str, key: &str, attr: &str) -> Option<&AttrValue> {
        self.objects.get(object)?.get(key)?.get(attr)
    }

    pub fn record(&self, object: &str, key: &str) -> Option<&Attributes> {
        self.objects.get(object)?.get(key)
    }

    /// Mutable access for parse hooks.
    pub fn record_mut(&mut self, object: &str, key: &str) -> Option<&mut Attributes> {
        self.objects.get_mut(object)?.get_mut(key)
    }

    /// Keys recorded for `object`, sorted.
    pub fn keys(&self, object: &str) -> Vec<&str> {
        self.objects
            .get(object)
            .map(|records| records.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn objects(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

/// Lenient boolean parsing for flag values.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_attributes_without_replacing_record() {
        let mut store = RecordStore::new();
        store.set(
            "repo",
            "web",
            "title",
            AttrValue::new("Web", false, Layer::ObjectAction),
        );
        store.set(
            "repo",
            "web",
            ACTION_ATTR,
            AttrValue::new("create", false, Layer::ObjectAction),
        );
        store.merge(
            "repo",
            "web",
            [(
                "title".to_string(),
                AttrValue::new("Website", false, Layer::ObjectList),
            )],
        );

        let record = store.record("repo", "web").expect("record");
        assert_eq!(record.len(), 2);
        assert_eq!(store.get("repo", "web", "title").map(|a| a.value.as_str()), Some("Website"));
        assert_eq!(store.get("repo", "web", "title").map(|a| a.layer), Some(Layer::ObjectList));
        assert_eq!(
            store.get("repo", "web", ACTION_ATTR).map(|a| a.value.as_str()),
            Some("create")
        );
    }

    #[test]
    fn misses_are_none() {
        let store = RecordStore::new();
        assert!(store.get("repo", "web", "title").is_none());
        assert!(store.keys("repo").is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn serializes_as_nested_maps() {
        let mut store = RecordStore::new();
        store.set("app", "ci", "driver", AttrValue::new("jenkins", true, Layer::Action));
        let json = serde_json::to_value(&store).expect("json");
        assert_eq!(json["app"]["ci"]["driver"]["value"], "jenkins");
        assert_eq!(json["app"]["ci"]["driver"]["is_default"], true);
        assert_eq!(json["app"]["ci"]["driver"]["layer"], "action");
    }

    #[test]
    fn bool_parsing() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("No"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(
            ParamValue {
                value: "1".into(),
                is_default: false
            }
            .as_bool(),
            Some(true)
        );
    }
}
