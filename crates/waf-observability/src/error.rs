use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to register prometheus metric '{0}'")]
    Registration(String),

    #[error("failed to bind metrics server to {addr}: {reason}")]
    Bind { addr: String, reason: String },
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Registration(err.to_string())
    }
}
