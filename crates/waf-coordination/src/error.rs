//! Error taxonomy for the coordination layer — thin, since nearly every
//! failure surface here is already a [`waf_core::Error::TransientStore`]
//! bubbling up from the store client.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Store(#[from] waf_core::Error),

    #[error("instance id could not be resolved from the environment")]
    UnresolvableInstanceId,
}
