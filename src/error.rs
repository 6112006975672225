use thiserror::Error;

/// Errors raised while registering or evaluating a schema. These denote a
/// malformed or unsupported schema, an unresolvable reference, or a document
/// which cannot be represented; an instance which merely fails to conform is
/// not an Error but an invalid [`crate::Output`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("value at '{location}' is not a representable JSON number")]
    InvalidJson { location: String },
    #[error("invalid schema at '{location}': expected {expected}")]
    InvalidSchema {
        location: String,
        expected: &'static str,
    },
    #[error("invalid pattern at '{location}': {source}")]
    InvalidPattern {
        location: String,
        #[source]
        source: Box<regex::Error>,
    },
    #[error("reference '{reference}' at '{location}' cannot be resolved")]
    InvalidReference {
        location: String,
        reference: String,
    },
    #[error("unsupported schema dialect '{dialect}'")]
    UnsupportedDialect { dialect: String },
    #[error("unsupported keyword '{keyword}' at '{location}'")]
    UnsupportedFeature { keyword: String, location: String },
}
