//! Inference pipeline: transform, predict and explain one record.
//!
//! The pipeline owns the three loaded artifacts. It holds only plain owned
//! data, so a single instance is shared across request handlers behind an
//! `Arc` without locking.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView2};
use serde_json::Value;
use tracing::{debug, enabled, warn, Level};

use crate::compat::xgboost::{ConversionError, XgbModel};
use crate::explainability::{
    rank_attributions, ExplainError, Explainer, ExplainerSpec, RankedAttribution, ShapExplainer,
};
use crate::model::Regressor;
use crate::preprocess::{FeatureRecord, FeatureSchema, PreprocessError, Preprocessor};

/// Locations of the artifacts loaded at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub preprocessor: PathBuf,
    /// Explainer descriptor; defaults are derived from the model when absent.
    pub explainer: Option<PathBuf>,
}

/// Relative tolerance of the attribution sum against the f32 margin.
const LOCAL_ACCURACY_RTOL: f64 = 1e-5;

/// Errors raised while loading artifacts.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid model {}: {source}", path.display())]
    Model {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid preprocessor {}: {source}", path.display())]
    Preprocessor {
        path: PathBuf,
        #[source]
        source: PreprocessError,
    },
    #[error("invalid explainer descriptor {}: {source}", path.display())]
    Explainer {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported model: {0}")]
    Conversion(#[from] ConversionError),
    #[error("cannot build explainer: {0}")]
    Explain(#[from] ExplainError),
    #[error("preprocessor produces {preprocessor} columns but the model expects {model}")]
    FeatureCountMismatch { preprocessor: usize, model: usize },
}

/// Errors raised while predicting a transformed record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("input has shape {rows}x{cols}, model expects 1x{expected}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        expected: usize,
    },
    #[error("model produced a non-finite prediction ({0})")]
    NonFinite(f32),
}

/// The loaded preprocessor, model and explainer.
#[derive(Debug, Clone)]
pub struct InferencePipeline {
    schema: FeatureSchema,
    preprocessor: Preprocessor,
    regressor: Regressor,
    explainer: ShapExplainer,
}

impl InferencePipeline {
    /// Load all artifacts for the default property schema.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, LoadError> {
        let schema = FeatureSchema::default();

        let model = XgbModel::from_reader(open(&paths.model)?).map_err(|source| {
            LoadError::Model {
                path: paths.model.clone(),
                source,
            }
        })?;
        let regressor = model.to_regressor()?;
        debug!(
            path = %paths.model.display(),
            booster = regressor.booster().kind(),
            n_trees = regressor.n_trees(),
            objective = regressor.objective(),
            "loaded model"
        );

        let preprocessor = Preprocessor::from_reader(open(&paths.preprocessor)?, &schema)
            .map_err(|source| LoadError::Preprocessor {
                path: paths.preprocessor.clone(),
                source,
            })?;
        debug!(
            path = %paths.preprocessor.display(),
            n_columns = preprocessor.n_output_columns(),
            "loaded preprocessor"
        );

        let model_names = &model.learner.feature_names;
        if !model_names.is_empty() && model_names.as_slice() != preprocessor.feature_names_out() {
            warn!(
                model = model_names.len(),
                preprocessor = preprocessor.n_output_columns(),
                "model feature names differ from preprocessor output names"
            );
        }

        let spec = match &paths.explainer {
            Some(path) => ExplainerSpec::from_reader(open(path)?).map_err(|source| {
                LoadError::Explainer {
                    path: path.clone(),
                    source,
                }
            })?,
            None => ExplainerSpec::default(),
        };

        Self::new(schema, preprocessor, regressor, &spec)
    }

    /// Assemble a pipeline from loaded parts.
    ///
    /// The preprocessor output width must match the model input width.
    pub fn new(
        schema: FeatureSchema,
        preprocessor: Preprocessor,
        regressor: Regressor,
        explainer_spec: &ExplainerSpec,
    ) -> Result<Self, LoadError> {
        if preprocessor.n_output_columns() != regressor.n_features() {
            return Err(LoadError::FeatureCountMismatch {
                preprocessor: preprocessor.n_output_columns(),
                model: regressor.n_features(),
            });
        }
        let explainer = ShapExplainer::from_spec(
            explainer_spec,
            regressor.booster(),
            preprocessor.feature_names_out().to_vec(),
        )?;

        Ok(Self {
            schema,
            preprocessor,
            regressor,
            explainer,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn regressor(&self) -> &Regressor {
        &self.regressor
    }

    pub fn explainer(&self) -> &ShapExplainer {
        &self.explainer
    }

    /// Project a request body onto the schema.
    pub fn project(&self, body: &Value) -> Result<FeatureRecord, PreprocessError> {
        FeatureRecord::project(body, &self.schema)
    }

    /// Transform a record into the model input matrix.
    pub fn transform(&self, record: &FeatureRecord) -> Result<Array2<f32>, PreprocessError> {
        self.preprocessor.transform(record)
    }

    /// Predict the value of a single transformed record.
    pub fn predict(&self, input: ArrayView2<'_, f32>) -> Result<f64, PipelineError> {
        let expected = self.regressor.n_features();
        let (rows, cols) = input.dim();
        if rows != 1 || cols != expected {
            return Err(PipelineError::ShapeMismatch {
                rows,
                cols,
                expected,
            });
        }

        let prediction = self.regressor.predict_row(&input.row(0));
        if !prediction.is_finite() {
            return Err(PipelineError::NonFinite(prediction));
        }
        Ok(prediction as f64)
    }

    /// Top attributions for a single transformed record.
    pub fn explain(&self, input: ArrayView2<'_, f32>) -> Result<Vec<RankedAttribution>, ExplainError> {
        if enabled!(Level::DEBUG) && !self.local_accuracy_holds(input)? {
            debug!("attributions plus base value do not add up to the model margin");
        }
        rank_attributions(input, &self.explainer)
    }

    /// Whether the attributions of each row plus the base value add up to
    /// the model margin.
    ///
    /// An `expected_value` override in the explainer descriptor shifts the
    /// base value, so this can be false for a correctly loaded pipeline.
    pub fn local_accuracy_holds(&self, input: ArrayView2<'_, f32>) -> Result<bool, ExplainError> {
        let shap = self.explainer.explain(input)?;
        let margins: Vec<f64> = input
            .rows()
            .into_iter()
            .map(|row| self.regressor.booster().predict_margin(&row) as f64)
            .collect();
        let scale = margins.iter().fold(1.0f64, |acc, m| acc.max(m.abs()));
        Ok(shap.verify(&margins, scale * LOCAL_ACCURACY_RTOL))
    }
}

fn open(path: &Path) -> Result<BufReader<File>, LoadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn pipeline_is_shareable() {
        assert_send_sync::<InferencePipeline>();
        assert_send_sync::<Arc<InferencePipeline>>();
    }

    #[test]
    fn predicts_and_explains_sample_request() {
        let pipeline = testing::sample_pipeline();
        let record = pipeline.project(&testing::sample_request()).unwrap();
        let x = pipeline.transform(&record).unwrap();

        let prediction = pipeline.predict(x.view()).unwrap();
        assert!(prediction.is_finite());

        // Attributions add up to the raw margin
        let shap = pipeline.explainer().explain(x.view()).unwrap();
        let total = shap.feature_shap(0).iter().sum::<f64>() + shap.base_value(0);
        let margin = pipeline.regressor().booster().predict_margin(&x.row(0));
        assert_abs_diff_eq!(total, margin as f64, epsilon = 1e-2);

        let top = pipeline.explain(x.view()).unwrap();
        assert_eq!(top.len(), 10);
    }

    #[test]
    fn sample_attributions_are_locally_accurate() {
        let pipeline = testing::sample_pipeline();
        let record = pipeline.project(&testing::sample_request()).unwrap();
        let x = pipeline.transform(&record).unwrap();
        assert!(pipeline.local_accuracy_holds(x.view()).unwrap());
    }

    #[test]
    fn shifted_base_value_breaks_local_accuracy() {
        let pipeline = testing::sample_pipeline();
        let spec = ExplainerSpec {
            expected_value: Some(pipeline.explainer().base_value() + 1000.0),
            ..Default::default()
        };
        let shifted = InferencePipeline::new(
            FeatureSchema::default(),
            pipeline.preprocessor().clone(),
            pipeline.regressor().clone(),
            &spec,
        )
        .unwrap();
        let record = shifted.project(&testing::sample_request()).unwrap();
        let x = shifted.transform(&record).unwrap();
        assert!(!shifted.local_accuracy_holds(x.view()).unwrap());
        // Ranking is unaffected by the base value
        assert_eq!(shifted.explain(x.view()).unwrap(), pipeline.explain(x.view()).unwrap());
    }

    #[test]
    fn predict_rejects_wrong_width() {
        let pipeline = testing::sample_pipeline();
        let err = pipeline.predict(Array2::zeros((1, 3)).view()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::ShapeMismatch {
                rows: 1,
                cols: 3,
                expected: 27
            }
        );
    }

    #[test]
    fn width_mismatch_fails_assembly() {
        let pipeline = testing::sample_pipeline();
        let narrow = testing::forest_regressor(5);
        let err = InferencePipeline::new(
            FeatureSchema::default(),
            pipeline.preprocessor().clone(),
            narrow,
            &ExplainerSpec::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LoadError::FeatureCountMismatch { preprocessor: 27, model: 5 }
        ));
    }

    #[test]
    fn load_reports_missing_files_with_path() {
        let paths = ArtifactPaths {
            model: PathBuf::from("/nonexistent/model.json"),
            preprocessor: PathBuf::from("/nonexistent/pre.json"),
            explainer: None,
        };
        let err = InferencePipeline::load(&paths).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/model.json"), "{err}");
    }
}
