//! Fitted column transformer.
//!
//! The on-disk format lists transformers in output order. Each one reads a
//! set of schema columns and writes one output column per input column
//! (`standard_scaler`, `passthrough`) or one per known category
//! (`one_hot`). Output names follow the `{transformer}__{column}` and
//! `{transformer}__{column}_{category}` convention.

use std::io::Read;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{FeatureRecord, FeatureSchema, FeatureValue, PreprocessError};

// =============================================================================
// Serialized form
// =============================================================================

/// Behaviour of the one-hot encoder for categories not seen during fitting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    /// Encode the column as all zeros.
    Ignore,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EncoderDef {
    StandardScaler {
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    OneHot {
        categories: Vec<Vec<Value>>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
    Passthrough,
}

#[derive(Debug, Clone, Deserialize)]
struct TransformerDef {
    name: String,
    columns: Vec<String>,
    #[serde(flatten)]
    encoder: EncoderDef,
}

#[derive(Debug, Clone, Deserialize)]
struct PreprocessorDef {
    transformers: Vec<TransformerDef>,
}

// =============================================================================
// Fitted form
// =============================================================================

#[derive(Debug, Clone)]
struct Column {
    name: String,
    /// Position in the feature schema.
    index: usize,
}

#[derive(Debug, Clone)]
enum Encoder {
    Scale { mean: Vec<f64>, scale: Vec<f64> },
    OneHot {
        categories: Vec<Vec<String>>,
        handle_unknown: HandleUnknown,
    },
    Passthrough,
}

#[derive(Debug, Clone)]
struct Step {
    columns: Vec<Column>,
    encoder: Encoder,
}

impl Step {
    fn n_outputs(&self) -> usize {
        match &self.encoder {
            Encoder::OneHot { categories, .. } => categories.iter().map(Vec::len).sum(),
            Encoder::Scale { .. } | Encoder::Passthrough => self.columns.len(),
        }
    }

    fn write(&self, record: &FeatureRecord, out: &mut Vec<f32>) -> Result<(), PreprocessError> {
        for (i, column) in self.columns.iter().enumerate() {
            let value = record.value(column.index).unwrap_or(&FeatureValue::Missing);
            match &self.encoder {
                Encoder::Scale { mean, scale } => {
                    let x = value.to_number(&column.name)?;
                    out.push(((x - mean[i]) / scale[i]) as f32);
                }
                Encoder::Passthrough => {
                    out.push(value.to_number(&column.name)? as f32);
                }
                Encoder::OneHot {
                    categories,
                    handle_unknown,
                } => {
                    let known = &categories[i];
                    let hit = value
                        .canonical()
                        .and_then(|c| known.iter().position(|k| *k == *c));
                    if hit.is_none() && *handle_unknown == HandleUnknown::Error {
                        return Err(PreprocessError::UnknownCategory {
                            column: column.name.clone(),
                            value: value
                                .canonical()
                                .map_or_else(|| "null".to_owned(), |c| c.into_owned()),
                        });
                    }
                    out.extend((0..known.len()).map(|k| if Some(k) == hit { 1.0 } else { 0.0 }));
                }
            }
        }
        Ok(())
    }
}

/// A fitted preprocessor bound to a feature schema.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    steps: Vec<Step>,
    feature_names: Vec<String>,
    n_fields: usize,
}

impl Preprocessor {
    /// Load a preprocessor from JSON and validate it against `schema`.
    pub fn from_reader<R: Read>(reader: R, schema: &FeatureSchema) -> Result<Self, PreprocessError> {
        let def: PreprocessorDef = serde_json::from_reader(reader)?;
        Self::build(def, schema)
    }

    /// Parse a preprocessor from a serde_json Value.
    pub fn from_value(value: &Value, schema: &FeatureSchema) -> Result<Self, PreprocessError> {
        let def: PreprocessorDef = serde_json::from_value(value.clone())?;
        Self::build(def, schema)
    }

    fn build(def: PreprocessorDef, schema: &FeatureSchema) -> Result<Self, PreprocessError> {
        let mut steps = Vec::with_capacity(def.transformers.len());
        let mut feature_names = Vec::new();

        for t in def.transformers {
            let columns = t
                .columns
                .iter()
                .map(|name| {
                    schema
                        .index_of(name)
                        .map(|index| Column {
                            name: name.clone(),
                            index,
                        })
                        .ok_or_else(|| PreprocessError::UnknownColumn {
                            transformer: t.name.clone(),
                            column: name.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let check_len = |what: &'static str, actual: usize| {
                if actual == columns.len() {
                    Ok(())
                } else {
                    Err(PreprocessError::ShapeMismatch {
                        transformer: t.name.clone(),
                        what,
                        expected: columns.len(),
                        actual,
                    })
                }
            };

            let encoder = match t.encoder {
                EncoderDef::StandardScaler { mean, scale } => {
                    check_len("means", mean.len())?;
                    check_len("scales", scale.len())?;
                    // A zero scale leaves the centred value unchanged
                    let scale = scale
                        .into_iter()
                        .map(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s })
                        .collect();
                    Encoder::Scale { mean, scale }
                }
                EncoderDef::OneHot {
                    categories,
                    handle_unknown,
                } => {
                    check_len("category lists", categories.len())?;
                    let categories = categories
                        .iter()
                        .zip(&columns)
                        .map(|(values, column)| {
                            values
                                .iter()
                                .map(|v| {
                                    FeatureValue::from_json(&column.name, v)
                                        .ok()
                                        .and_then(|fv| fv.canonical().map(|c| c.into_owned()))
                                        .ok_or_else(|| PreprocessError::InvalidCategory {
                                            transformer: t.name.clone(),
                                            column: column.name.clone(),
                                        })
                                })
                                .collect::<Result<Vec<_>, _>>()
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Encoder::OneHot {
                        categories,
                        handle_unknown,
                    }
                }
                EncoderDef::Passthrough => Encoder::Passthrough,
            };

            match &encoder {
                Encoder::OneHot { categories, .. } => {
                    for (column, cats) in columns.iter().zip(categories) {
                        feature_names.extend(
                            cats.iter()
                                .map(|c| format!("{}__{}_{}", t.name, column.name, c)),
                        );
                    }
                }
                Encoder::Scale { .. } | Encoder::Passthrough => {
                    feature_names.extend(
                        columns.iter().map(|c| format!("{}__{}", t.name, c.name)),
                    );
                }
            }

            steps.push(Step { columns, encoder });
        }

        Ok(Self {
            steps,
            feature_names,
            n_fields: schema.len(),
        })
    }

    /// Output column names, in column order.
    pub fn feature_names_out(&self) -> &[String] {
        &self.feature_names
    }

    /// Width of the transformed matrix.
    pub fn n_output_columns(&self) -> usize {
        self.steps.iter().map(Step::n_outputs).sum()
    }

    /// Transform one record into a `[1, n_output_columns]` matrix.
    pub fn transform(&self, record: &FeatureRecord) -> Result<Array2<f32>, PreprocessError> {
        if record.len() != self.n_fields {
            return Err(PreprocessError::RecordMismatch {
                expected: self.n_fields,
                actual: record.len(),
            });
        }

        let mut row = Vec::with_capacity(self.n_output_columns());
        for step in &self.steps {
            step.write(record, &mut row)?;
        }
        Ok(Array1::from(row).insert_axis(Axis(0)))
    }
}
