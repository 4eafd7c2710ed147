//! Value lookups.
//!
//! Stored values come from the [`crate::RecordStore`]. While a context is
//! being resolved nothing is stored yet, so [`Registry::get_context_value`]
//! falls back to the live parameter layers:
//!
//! ```text
//! object-action ──► action ──► application
//!  create repo      create     --debug
//! ```
//!
//! A value the user typed wins over any default, whatever its layer.

use crate::context::Context;
use crate::engine::CliEngine;
use crate::error::ConfigError;
use crate::model::Param;
use crate::values::{Layer, ParamValue};

use super::Registry;

impl<E: CliEngine> Registry<E> {
    /// Stored value of `param` for the record `object/key`.
    pub fn get_value(
        &self,
        object: &str,
        key: &str,
        param: &str,
    ) -> Result<Option<ParamValue>, ConfigError> {
        if !self.objects.contains_key(object) {
            return Err(ConfigError::UnknownObject(object.to_string()));
        }
        Ok(self
            .values
            .get(object, key, param)
            .map(|attr| attr.to_param_value()))
    }

    pub fn get_string_value(
        &self,
        object: &str,
        key: &str,
        param: &str,
    ) -> Result<Option<String>, ConfigError> {
        Ok(self.get_value(object, key, param)?.map(|v| v.value))
    }

    /// Stored value read as a boolean; unparsable values read as `None`.
    pub fn get_bool_value(
        &self,
        object: &str,
        key: &str,
        param: &str,
    ) -> Result<Option<bool>, ConfigError> {
        Ok(self
            .get_value(object, key, param)?
            .and_then(|v| v.as_bool()))
    }

    /// Value of `param` for the record `object/key` as seen from `context`.
    ///
    /// A stored value answers first. Otherwise the live layers are walked;
    /// the object-action and action layers only answer when their key
    /// parameter currently holds `key`. A list context only consults
    /// application flags.
    pub fn get_context_value(
        &self,
        context: &Context,
        object: &str,
        key: &str,
        param: &str,
    ) -> Result<Option<(Layer, ParamValue)>, ConfigError> {
        let target = self
            .objects
            .get(object)
            .ok_or_else(|| ConfigError::UnknownObject(object.to_string()))?;
        if let Some(attr) = self.values.get(object, key, param) {
            return Ok(Some((attr.layer, attr.to_param_value())));
        }

        let mut layers: Vec<(Layer, &Param)> = Vec::with_capacity(3);
        if let (None, Some(key_field)) = (context.list(), target.key()) {
            let object_action = context
                .action()
                .filter(|_| context.object() == Some(object))
                .and_then(|a| target.action(a))
                .filter(|oa| holds_key(oa.param(key_field), key))
                .and_then(|oa| oa.param(param));
            if let Some(p) = object_action {
                layers.push((Layer::ObjectAction, p));
            }
            if let Some(p) = context
                .action()
                .and_then(|a| self.actions.get(a))
                .filter(|a| holds_key(a.param_for(object, key_field), key))
                .and_then(|a| a.param_for(object, param))
            {
                layers.push((Layer::Action, p));
            }
        }
        if let Some(p) = self.app_flags.get(param) {
            layers.push((Layer::Application, p));
        }

        let explicit = layers.iter().find(|(_, p)| p.is_found());
        let chosen = explicit.or_else(|| layers.iter().find(|(_, p)| p.current_value().is_some()));
        Ok(chosen.and_then(|(layer, p)| Some((*layer, p.current_value()?))))
    }

    pub fn get_app_value(&self, param: &str) -> Option<ParamValue> {
        self.app_flags.get(param)?.current_value()
    }

    pub fn get_app_string_value(&self, param: &str) -> Option<String> {
        self.get_app_value(param).map(|v| v.value)
    }

    pub fn get_app_bool_value(&self, param: &str) -> Option<bool> {
        self.get_app_value(param)?.as_bool()
    }

    /// True when the user supplied the application flag.
    pub fn is_app_flag_found(&self, param: &str) -> bool {
        self.app_flags.get(param).is_some_and(Param::is_found)
    }
}

fn holds_key(param: Option<&Param>, key: &str) -> bool {
    param
        .and_then(Param::current_value)
        .is_some_and(|v| v.value == key)
}
