/// Errors raised while parsing execution-output content.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Execution output is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Execution output is missing field `{0}`")]
    MissingField(&'static str),

    #[error("Invalid timestamp in field `{field}`: {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Execution output has no output-file manifest")]
    MissingManifest,

    #[error("No output file matches the expected GeoJSON name")]
    NoMatchingOutput,
}
