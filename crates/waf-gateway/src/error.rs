//! Gateway process errors: environment configuration only. Everything past
//! startup (store, graph, metrics) already has its own crate-local error
//! type and is absorbed into a `default_action` rather than surfaced here
//! (spec §7 "Propagation").

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for {name}: '{value}' ({reason})")]
    InvalidEnv {
        name: &'static str,
        value: String,
        reason: String,
    },
}
