//! Projection of a JSON request onto the feature schema.

use std::borrow::Cow;

use serde_json::Value;

use super::{FeatureSchema, PreprocessError};

/// A scalar request value.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
    /// JSON `null`.
    Missing,
}

impl FeatureValue {
    /// Convert a JSON scalar; arrays, objects and booleans are rejected.
    pub fn from_json(field: &str, value: &Value) -> Result<Self, PreprocessError> {
        match value {
            Value::Null => Ok(FeatureValue::Missing),
            Value::Number(n) => n
                .as_f64()
                .map(FeatureValue::Number)
                .ok_or_else(|| PreprocessError::InvalidNumber {
                    field: field.to_owned(),
                    value: n.to_string(),
                }),
            Value::String(s) => Ok(FeatureValue::Text(s.clone())),
            Value::Bool(_) => Err(unsupported(field, "boolean")),
            Value::Array(_) => Err(unsupported(field, "array")),
            Value::Object(_) => Err(unsupported(field, "object")),
        }
    }

    /// Numeric value; text is parsed, missing becomes NaN.
    pub fn to_number(&self, field: &str) -> Result<f64, PreprocessError> {
        match self {
            FeatureValue::Number(n) => Ok(*n),
            FeatureValue::Missing => Ok(f64::NAN),
            FeatureValue::Text(s) => {
                s.trim()
                    .parse::<f64>()
                    .map_err(|_| PreprocessError::InvalidNumber {
                        field: field.to_owned(),
                        value: s.clone(),
                    })
            }
        }
    }

    /// String form used to match one-hot categories.
    ///
    /// Integral numbers render without a fractional part (`2015`, not
    /// `2015.0`). Missing values have no canonical form.
    pub fn canonical(&self) -> Option<Cow<'_, str>> {
        match self {
            FeatureValue::Number(n) => Some(Cow::Owned(canonical_number(*n))),
            FeatureValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
            FeatureValue::Missing => None,
        }
    }
}

fn unsupported(field: &str, kind: &'static str) -> PreprocessError {
    PreprocessError::UnsupportedValue {
        field: field.to_owned(),
        kind,
    }
}

fn canonical_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Request values in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    fields: Vec<(String, FeatureValue)>,
}

impl FeatureRecord {
    /// Project a JSON object onto `schema`.
    ///
    /// Keys outside the schema are ignored. Every missing schema key is
    /// reported in a single [`PreprocessError::MissingField`].
    pub fn project(value: &Value, schema: &FeatureSchema) -> Result<Self, PreprocessError> {
        let object = value
            .as_object()
            .ok_or_else(|| PreprocessError::NotAnObject(json_kind(value)))?;

        let missing: Vec<String> = schema
            .names()
            .filter(|name| !object.contains_key(*name))
            .map(str::to_owned)
            .collect();
        if !missing.is_empty() {
            return Err(PreprocessError::MissingField(missing));
        }

        let fields = schema
            .names()
            .map(|name| {
                let value = FeatureValue::from_json(name, &object[name])?;
                Ok((name.to_owned(), value))
            })
            .collect::<Result<Vec<_>, PreprocessError>>()?;
        Ok(Self { fields })
    }

    /// Value at schema position `index`.
    pub fn value(&self, index: usize) -> Option<&FeatureValue> {
        self.fields.get(index).map(|(_, v)| v)
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
