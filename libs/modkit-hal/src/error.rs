use thiserror::Error;

use crate::service::ServiceHandle;

/// Errors surfaced by the HAL registry and response assembler.
///
/// Per-link resolution failures are not represented here: an unresolvable
/// relation is logged and omitted from the document instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HalError {
    /// A route was declared with a verb the dispatch layer does not know
    #[error("'{verb}' is not a valid HTTP method")]
    InvalidVerb { verb: String },

    /// The handle was not issued by this registry
    #[error("unknown service handle {0}")]
    UnknownService(ServiceHandle),

    /// Resource bodies are merged into a HAL object and must be objects themselves
    #[error("resource body must serialize to a JSON object, got {kind}")]
    NonObjectBody { kind: &'static str },

    /// Resource body could not be serialized
    #[error("failed to serialize resource body: {0}")]
    Body(#[from] serde_json::Error),
}
