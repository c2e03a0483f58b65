//! Preprocessing errors.

/// Errors raised while projecting or transforming a record, or while
/// loading a fitted preprocessor.
#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("missing required field(s): {}", quoted(.0))]
    MissingField(Vec<String>),
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("field '{field}' has unsupported value type {kind}")]
    UnsupportedValue { field: String, kind: &'static str },
    #[error("found unknown category '{value}' in column '{column}'")]
    UnknownCategory { column: String, value: String },
    #[error("could not convert value '{value}' of field '{field}' to a number")]
    InvalidNumber { field: String, value: String },
    #[error("record has {actual} fields, preprocessor expects {expected}")]
    RecordMismatch { expected: usize, actual: usize },

    #[error("transformer '{transformer}' references unknown column '{column}'")]
    UnknownColumn { transformer: String, column: String },
    #[error("transformer '{transformer}' has {actual} {what} for {expected} columns")]
    ShapeMismatch {
        transformer: String,
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("transformer '{transformer}' has an invalid category in column '{column}'")]
    InvalidCategory { transformer: String, column: String },
    #[error("invalid preprocessor JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_lists_every_key() {
        let err = PreprocessError::MissingField(vec!["Square Footage".into(), "Roll Year".into()]);
        assert_eq!(
            err.to_string(),
            "missing required field(s): 'Square Footage', 'Roll Year'"
        );
    }
}
