use std::io;

use thiserror::Error;

use crate::window::DateTriple;

/// Error type for extraction, aggregation, and encoding failures.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A day's raw data could not be listed, opened, or decoded.
    #[error("raw data for {day} is unavailable: {reason}")]
    ResourceUnavailable {
        /// Day whose raw data is unavailable.
        day: DateTriple,
        /// Underlying failure.
        reason: String,
    },
    /// One or more parallel extraction tasks failed; the run is aborted.
    #[error("{failed} of {total} extraction tasks failed, first: {first}")]
    TasksFailed {
        /// Number of failed tasks.
        failed: usize,
        /// Number of tasks submitted.
        total: usize,
        /// Description of the first failure.
        first: String,
    },
    /// An individual raw object could not be fetched from its backend.
    #[error("object '{path}' is unavailable: {reason}")]
    ObjectUnavailable {
        /// Backend path of the object.
        path: String,
        /// Underlying failure.
        reason: String,
    },
    /// A raw collection could not be decoded into rows.
    #[error("cannot decode raw collection: {0}")]
    Decode(String),
    /// A feature was queried in a support table that holds no values for it.
    #[error("support table domain '{domain}' has no values for feature '{feature}'")]
    EmptyDomain {
        /// Domain the query targeted.
        domain: String,
        /// Feature with no registered values.
        feature: String,
    },
    /// A support-table operation was attempted in the wrong lifecycle state.
    #[error("support table state violation: {0}")]
    StateViolation(String),
    /// A record without an identity key reached aggregation.
    #[error("record without an identity key cannot be aggregated")]
    MissingIdentity,
    /// Filesystem error.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Invalid extraction configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
