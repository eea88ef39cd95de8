//! Error taxonomy for the Redis-backed store client.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("redis connection error: {0}")]
    Connection(String),

    #[error("redis command error: {0}")]
    Command(String),

    #[error("failed to serialize entity '{kind}': {reason}")]
    Serialize { kind: &'static str, reason: String },

    #[error("failed to deserialize entity '{kind}' (key '{key}'): {reason}")]
    Deserialize {
        kind: &'static str,
        key: String,
        reason: String,
    },
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            Error::Connection(err.to_string())
        } else {
            Error::Command(err.to_string())
        }
    }
}

impl From<Error> for waf_core::Error {
    fn from(err: Error) -> Self {
        waf_core::Error::TransientStore(err.to_string())
    }
}
