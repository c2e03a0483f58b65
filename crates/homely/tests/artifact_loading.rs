//! Artifact loading against the fixtures and malformed copies of them.

use std::fs;
use std::path::{Path, PathBuf};

use homely::explainability::ExplainAlgorithm;
use homely::testing::{sample_artifact_paths, test_cases_dir};
use homely::{ArtifactPaths, InferencePipeline, LoadError};

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn fixture_artifacts_load() {
    let pipeline = InferencePipeline::load(&sample_artifact_paths()).unwrap();
    assert_eq!(pipeline.regressor().n_trees(), 8);
    assert_eq!(pipeline.preprocessor().n_output_columns(), 27);
    assert_eq!(pipeline.explainer().algorithm(), ExplainAlgorithm::Tree);
    assert_eq!(pipeline.schema().len(), 17);
}

#[test]
fn explainer_descriptor_is_optional() {
    let paths = ArtifactPaths {
        explainer: None,
        ..sample_artifact_paths()
    };
    let with_default = InferencePipeline::load(&paths).unwrap();
    let with_file = InferencePipeline::load(&sample_artifact_paths()).unwrap();
    assert_eq!(with_default.explainer().algorithm(), ExplainAlgorithm::Tree);
    assert_eq!(with_default.explainer().base_value(), with_file.explainer().base_value());
}

#[test]
fn malformed_model_is_a_model_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "model.json", "{\"learner\": 3}");
    let paths = ArtifactPaths {
        model: path.clone(),
        ..sample_artifact_paths()
    };
    let err = InferencePipeline::load(&paths).unwrap_err();
    assert!(matches!(err, LoadError::Model { .. }), "{err}");
    let message = err.to_string();
    assert!(message.starts_with("invalid model"), "{message}");
    assert!(message.contains(&path.display().to_string()), "{message}");
}

#[test]
fn missing_model_file_is_an_io_error() {
    let paths = ArtifactPaths {
        model: test_cases_dir().join("no_such_model.json"),
        ..sample_artifact_paths()
    };
    let err = InferencePipeline::load(&paths).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }), "{err}");
}

#[test]
fn malformed_preprocessor_fails_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "pre.json", "{\"transformers\": [{\"name\": \"num\"}]}");
    let paths = ArtifactPaths {
        preprocessor: path.clone(),
        ..sample_artifact_paths()
    };
    let err = InferencePipeline::load(&paths).unwrap_err();
    assert!(matches!(err, LoadError::Preprocessor { .. }), "{err}");
    assert!(err.to_string().contains(&path.display().to_string()));
}

#[test]
fn preprocessor_width_must_match_model() {
    let dir = tempfile::tempdir().unwrap();
    let mut pre: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(test_cases_dir().join("preprocessor.json")).unwrap())
            .unwrap();
    // Drop one Roll Year category so the output is one column short
    pre["transformers"][1]["categories"][1] = serde_json::json!([2024]);
    let paths = ArtifactPaths {
        preprocessor: write(dir.path(), "pre.json", &pre.to_string()),
        ..sample_artifact_paths()
    };
    let err = InferencePipeline::load(&paths).unwrap_err();
    assert!(
        matches!(err, LoadError::FeatureCountMismatch { preprocessor: 26, model: 27 }),
        "{err}"
    );
}

#[test]
fn linear_descriptor_on_tree_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths {
        explainer: Some(write(dir.path(), "explainer.json", "{\"algorithm\": \"linear\"}")),
        ..sample_artifact_paths()
    };
    let err = InferencePipeline::load(&paths).unwrap_err();
    assert!(matches!(err, LoadError::Explain(_)), "{err}");
}

#[test]
fn malformed_explainer_descriptor_fails() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths {
        explainer: Some(write(dir.path(), "explainer.json", "[]")),
        ..sample_artifact_paths()
    };
    let err = InferencePipeline::load(&paths).unwrap_err();
    assert!(matches!(err, LoadError::Explainer { .. }), "{err}");
}
