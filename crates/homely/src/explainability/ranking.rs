//! Attribution ranking for presentation.

use std::collections::HashMap;

use ndarray::ArrayView2;
use serde::Serialize;

use super::{ExplainError, Explainer};

/// Number of attributions returned by [`rank_attributions`].
pub const TOP_K: usize = 10;

/// Transformer prefixes stripped from output column names.
const NAME_PREFIXES: [&str; 3] = ["num__", "cat__", "geo__"];

/// One entry of the ranked attribution list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAttribution {
    pub feature: String,
    pub shap_value: f64,
}

/// Strip one leading transformer prefix (`num__`, `cat__`, `geo__`).
///
/// Names without a known prefix are returned unchanged.
pub fn clean_feature_name(name: &str) -> &str {
    NAME_PREFIXES
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name)
}

/// Round to `decimals` places, ties to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Rank the attributions of a single transformed record.
///
/// Values are paired with cleaned column names (a later column whose
/// cleaned name repeats an earlier one overwrites its value in place),
/// rounded to two decimals, stably sorted by descending magnitude and
/// truncated to [`TOP_K`].
pub fn rank_attributions<E: Explainer + ?Sized>(
    input: ArrayView2<'_, f32>,
    explainer: &E,
) -> Result<Vec<RankedAttribution>, ExplainError> {
    if input.nrows() != 1 {
        return Err(ExplainError::NotSingleRecord {
            n_samples: input.nrows(),
        });
    }

    let shap = explainer.explain(input)?;
    let values = shap.feature_shap(0);
    let names = explainer.output_names();
    if names.len() != values.len() {
        return Err(ExplainError::NamesMismatch {
            names: names.len(),
            values: values.len(),
        });
    }

    let mut ranked: Vec<RankedAttribution> = Vec::with_capacity(values.len());
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(values.len());
    for (name, &value) in names.iter().zip(values) {
        let feature = clean_feature_name(name);
        let shap_value = round_to(value, 2);
        match positions.get(feature) {
            Some(&idx) => ranked[idx].shap_value = shap_value,
            None => {
                positions.insert(feature, ranked.len());
                ranked.push(RankedAttribution {
                    feature: feature.to_owned(),
                    shap_value,
                });
            }
        }
    }

    ranked.sort_by(|a, b| b.shap_value.abs().total_cmp(&a.shap_value.abs()));
    ranked.truncate(TOP_K);
    Ok(ranked)
}
