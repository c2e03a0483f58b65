//! Property fixture loading.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::pipeline::{ArtifactPaths, InferencePipeline};

/// Base directory for test cases.
pub fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/test-cases/homely")
}

/// Load a JSON file and deserialize it.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> T {
    let file =
        File::open(path).unwrap_or_else(|e| panic!("Failed to open {}: {e}", path.display()));
    serde_json::from_reader(file)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()))
}

/// One expected `shap_summary` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExpectedAttribution {
    pub feature: String,
    pub shap_value: f64,
}

/// Expected `/predict` response body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExpectedResponse {
    pub what_if_value: f64,
    pub shap_summary: Vec<ExpectedAttribution>,
}

/// A request with its reference response.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleCase {
    pub request: Value,
    pub expected: ExpectedResponse,
}

/// Paths of the fixture model, preprocessor and explainer descriptor.
pub fn sample_artifact_paths() -> ArtifactPaths {
    let dir = test_cases_dir();
    ArtifactPaths {
        model: dir.join("model.json"),
        preprocessor: dir.join("preprocessor.json"),
        explainer: Some(dir.join("explainer.json")),
    }
}

/// Pipeline loaded from the fixture artifacts.
pub fn sample_pipeline() -> InferencePipeline {
    InferencePipeline::load(&sample_artifact_paths())
        .unwrap_or_else(|e| panic!("Failed to load fixture pipeline: {e}"))
}

pub fn sample_case() -> SampleCase {
    load_json(&test_cases_dir().join("sample_case.json"))
}

/// The 17-field sample request.
pub fn sample_request() -> Value {
    sample_case().request
}
