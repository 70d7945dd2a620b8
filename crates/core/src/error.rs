//! Source-level error taxonomy.
//!
//! Both variants are caught at the fetch boundary and folded into per-source
//! failure flags on the snapshot; they never propagate past the orchestrator.

use thiserror::Error;

/// Failure to obtain a usable JSON payload from one upstream endpoint.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Network-level failure reaching the source.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The source answered with a non-2xx status.
    #[error("unexpected status {0}")]
    Status(u16),
    /// The body was not the JSON we expected, or the service reported an
    /// application-level error inside a 200 response.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// The payload parsed as JSON but cannot be normalized into the target domain.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("expected a JSON array of rows, got {0}")]
    NotRows(&'static str),
    #[error("expected a JSON object, got {0}")]
    NotObject(&'static str),
    /// Every row lacked the identity field required for this domain.
    #[error("no row carried a usable `{0}` field")]
    MissingIdentity(&'static str),
    #[error("required metric key `{0}` is absent")]
    MissingMetric(&'static str),
}

/// Either failure mode for one source within a refresh cycle.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// The refresh task died before this source produced a result.
    #[error("refresh cycle aborted: {0}")]
    Aborted(String),
}
