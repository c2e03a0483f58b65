//! Foreign types for XGBoost's JSON model layout.
//!
//! Only the fields needed to rebuild a single-output regressor are read;
//! everything else in the document (training parameters, attributes, loss
//! changes) is ignored by serde.

use std::io::Read;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr};

/// `base_score` as written by different XGBoost versions: a number, a
/// string (`"5E-1"`), a bracketed string (`"[5E-1]"`) or an array.
fn base_score<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_from_value(Value::deserialize(deserializer)?).map_err(D::Error::custom)
}

fn scalar_from_value(value: Value) -> Result<f32, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(|f| f as f32)
            .ok_or_else(|| format!("base_score {n} is not representable")),
        Value::String(s) => {
            let trimmed = s.trim();
            let inner = trimmed
                .strip_prefix('[')
                .and_then(|t| t.strip_suffix(']'))
                .unwrap_or(trimmed);
            inner
                .split(',')
                .next()
                .and_then(|first| first.trim().parse::<f32>().ok())
                .ok_or_else(|| format!("cannot parse base_score from {s:?}"))
        }
        Value::Array(items) => match items.into_iter().next() {
            Some(first) => scalar_from_value(first),
            None => Err("base_score array is empty".to_owned()),
        },
        other => Err(format!("base_score must be a number, string or array, got {other}")),
    }
}

fn half() -> f32 {
    0.5
}

fn one() -> i64 {
    1
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct TreeShape {
    #[serde_as(as = "DisplayFromStr")]
    pub num_nodes: i64,
}

/// One tree in XGBoost's array-of-fields layout.
#[derive(Debug, Clone, Deserialize)]
pub struct XgbTree {
    pub tree_param: TreeShape,
    pub sum_hessian: Vec<f64>,
    pub base_weights: Vec<f32>,
    pub left_children: Vec<i32>,
    pub right_children: Vec<i32>,
    pub split_indices: Vec<i32>,
    pub split_conditions: Vec<f32>,
    #[serde(default)]
    pub split_type: Vec<i32>,
    pub default_left: Vec<i32>,
    #[serde(default)]
    pub categories: Vec<i32>,
    #[serde(default)]
    pub categories_nodes: Vec<i32>,
    #[serde(default)]
    pub categories_segments: Vec<i32>,
    #[serde(default)]
    pub categories_sizes: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsemble {
    pub trees: Vec<XgbTree>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearWeights {
    pub weights: Vec<f32>,
}

/// The tree booster nested inside a `dart` booster.
#[derive(Debug, Clone, Deserialize)]
pub struct DartTrees {
    pub model: TreeEnsemble,
}

/// `learner.gradient_booster`, tagged by its `name` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum XgbBooster {
    Gbtree { model: TreeEnsemble },
    Gblinear { model: LinearWeights },
    Dart { gbtree: DartTrees, weight_drop: Vec<f32> },
}

/// Training objective; the name selects the base score link and the output
/// transform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Objective {
    pub name: String,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct LearnerParams {
    #[serde(default = "half", deserialize_with = "base_score")]
    pub base_score: f32,
    #[serde(rename = "num_class", default)]
    #[serde_as(as = "DisplayFromStr")]
    pub n_class: i64,
    #[serde(rename = "num_feature", default)]
    #[serde_as(as = "DisplayFromStr")]
    pub n_features: i64,
    #[serde(default = "one")]
    #[serde_as(as = "DisplayFromStr")]
    pub num_target: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XgbLearner {
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub gradient_booster: XgbBooster,
    pub objective: Objective,
    pub learner_model_param: LearnerParams,
}

/// A model saved with `Booster.save_model("*.json")`.
#[derive(Debug, Clone, Deserialize)]
pub struct XgbModel {
    pub learner: XgbLearner,
}

impl XgbModel {
    /// Parse from any reader producing XGBoost JSON.
    pub fn from_reader<R: Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }

    pub fn from_value(value: &Value) -> serde_json::Result<Self> {
        serde_json::from_value(value.clone())
    }
}
