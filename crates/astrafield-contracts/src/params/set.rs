use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::fields::FIELD_SPECS;
use super::value::ParamValue;

/// Partial parameter object as served by the preset catalog.
pub type PartialParams = IndexMap<String, Value>;

/// The full set of generation parameters, in form order.
///
/// Updates never mutate in place: [`ParamSet::with_field`] and
/// [`ParamSet::merged`] return a new set so holders can compare old and new.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParamSet {
    fields: IndexMap<String, ParamValue>,
}

impl Default for ParamSet {
    fn default() -> Self {
        Self {
            fields: FIELD_SPECS
                .iter()
                .map(|spec| (spec.key.to_string(), spec.default.to_value()))
                .collect(),
        }
    }
}

impl ParamSet {
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Returns a copy with `key` replaced. Unknown keys are appended.
    pub fn with_field(&self, key: &str, value: ParamValue) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(key.to_string(), value);
        Self { fields }
    }

    /// Shallow merge: every key of `partial` overwrites (or appends), every
    /// other key keeps its current value.
    pub fn merged(&self, partial: &PartialParams) -> Self {
        let mut fields = self.fields.clone();
        for (key, value) in partial {
            fields.insert(key.clone(), ParamValue::from_json(value));
        }
        Self { fields }
    }

    /// Keys whose value differs between `self` and `other`, in `other`'s order.
    pub fn changed_keys(&self, other: &ParamSet) -> Vec<String> {
        other
            .fields
            .iter()
            .filter(|(key, value)| self.fields.get(key.as_str()) != Some(*value))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// One `(name, text)` pair per field, ready for a multipart form.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.clone(), value.form_text()))
            .collect()
    }
}
